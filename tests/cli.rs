mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

use common::TestWorkspace;

const PEOPLE: &str = "name;born;score\n\
\"Doe, Jane\";1983-04-01;11.398,22\n\
# not a person\n\
\"Roe\nRichard\";1984-05-02;7,5\n";

const MAPPING: &str = r#"
separator: ';'
columns:
  - property: who
    name: name
    required: true
  - property: born
    name: born
    type: date
  - property: score
    name: score
    type: float
    decimal_separator: ','
    grouping_separator: '.'
"#;

fn bin() -> Command {
    Command::cargo_bin("csv-bind").expect("binary exists")
}

#[test]
fn rows_prints_header_and_fields() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE);
    bin()
        .args(["rows", "-i", input.to_str().unwrap(), "--separator", ";"])
        .assert()
        .success()
        .stdout(contains("name"))
        .stdout(contains("Doe, Jane"))
        .stdout(contains("Roe Richard"))
        .stdout(contains("not a person").not());
}

#[test]
fn rows_keeps_comments_when_asked() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE);
    bin()
        .args([
            "rows",
            "-i",
            input.to_str().unwrap(),
            "--separator",
            "semicolon",
            "--keep-comments",
        ])
        .assert()
        .success()
        .stdout(contains("# not a person"));
}

#[test]
fn rows_without_header_generates_column_names() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("plain.csv", "a,b\nc,d,e\n");
    bin()
        .args(["rows", "-i", input.to_str().unwrap(), "--no-header", "--limit", "1"])
        .assert()
        .success()
        .stdout(contains("column_1"))
        .stdout(contains("column_2"))
        .stdout(contains("d").not());
}

#[test]
fn rows_reads_stdin_and_skips_to_start_row() {
    bin()
        .args(["rows", "-i", "-", "--start-row", "2"])
        .write_stdin("junk\n\"more junk\nheader\nvalue\n")
        .assert()
        .success()
        .stdout(contains("header"))
        .stdout(contains("value"))
        .stdout(contains("junk").not());
}

#[test]
fn rows_strict_quotes_reports_line() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("open.csv", "h\n\"never closed\n");
    bin()
        .args(["rows", "-i", input.to_str().unwrap(), "--strict-quotes"])
        .assert()
        .failure()
        .stderr(contains("Unterminated quote in row starting at line 2"));
}

#[test]
fn rows_decodes_latin1_input() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_bytes("latin1.csv", b"city\nM\xfcnchen\n");
    bin()
        .args([
            "rows",
            "-i",
            input.to_str().unwrap(),
            "--input-encoding",
            "latin1",
        ])
        .assert()
        .success()
        .stdout(contains("München"));
}

#[test]
fn map_emits_json_records() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE);
    let mapping = workspace.write("people.yaml", MAPPING);
    bin()
        .args([
            "map",
            "-i",
            input.to_str().unwrap(),
            "-m",
            mapping.to_str().unwrap(),
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(contains(
            r#"{"born":"1983-04-01","score":11398.22,"who":"Doe, Jane"}"#,
        ))
        .stdout(contains(r#""score":7.5"#));
}

#[test]
fn map_prints_table_by_default() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE);
    let mapping = workspace.write("people.yaml", MAPPING);
    bin()
        .args([
            "map",
            "-i",
            input.to_str().unwrap(),
            "-m",
            mapping.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("who"))
        .stdout(contains("11398.22"));
}

#[test]
fn map_stops_at_required_field_unless_lenient() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("gaps.csv", "name;born;score\n;1990-01-01;1\nAnn;1991-02-03;2\n");
    let mapping = workspace.write("people.yaml", MAPPING);

    bin()
        .args([
            "map",
            "-i",
            input.to_str().unwrap(),
            "-m",
            mapping.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("Property \"who\" is required"))
        .stderr(contains("line 2"));

    bin()
        .args([
            "map",
            "-i",
            input.to_str().unwrap(),
            "-m",
            mapping.to_str().unwrap(),
            "--lenient",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(contains(r#""who":"Ann""#))
        .stderr(contains("line 2:"));
}

#[test]
fn map_reports_unknown_column() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", "label;born\nx;2000-01-01\n");
    let mapping = workspace.write("people.yaml", MAPPING);
    bin()
        .args([
            "map",
            "-i",
            input.to_str().unwrap(),
            "-m",
            mapping.to_str().unwrap(),
            "--lenient",
        ])
        .assert()
        .failure()
        .stderr(contains("Column with name \"name\" does not exist in header"));
}

#[test]
fn map_rejects_mapping_without_columns() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE);
    let mapping = workspace.write("empty.yaml", "separator: ';'\n");
    bin()
        .args([
            "map",
            "-i",
            input.to_str().unwrap(),
            "-m",
            mapping.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("does not define any columns"));
}
