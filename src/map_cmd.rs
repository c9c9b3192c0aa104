use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    cli::{MapArgs, OutputFormat},
    io_utils,
    mapping_file::{DynamicRecord, MappingFile},
    reader::RecordReader,
    table,
};

pub fn execute(args: &MapArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let mapping = MappingFile::load(&args.mapping)?;
    let config = args.symbols.apply(mapping.reader.clone());
    let table = mapping
        .build_table()
        .with_context(|| format!("Building mapping from {:?}", args.mapping))?;
    let input = io_utils::open_input(&args.input, encoding)?;
    let mut reader = RecordReader::new(input, config, table)
        .with_context(|| format!("Configuring reader for {:?}", args.input))?;

    let records = if args.lenient {
        let outcome = reader
            .read_records_lenient()
            .with_context(|| format!("Mapping {:?}", args.input))?;
        for failure in &outcome.failures {
            warn!("Skipping line {}: {}", failure.line, failure.error);
            eprintln!("line {}: {}", failure.line, failure.error);
        }
        outcome.records
    } else {
        reader
            .read_records()
            .with_context(|| format!("Mapping {:?}", args.input))?
    };

    emit(&mapping.properties(), &records, args.format)?;
    info!(
        "Mapped {} record(s) from {:?} ({} line(s) read)",
        records.len(),
        args.input,
        reader.lines_read()
    );
    Ok(())
}

fn emit(properties: &[String], records: &[DynamicRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let rows = records
                .iter()
                .map(|record| record.display_row(properties))
                .collect::<Vec<_>>();
            table::print_table(properties, &rows);
        }
        OutputFormat::Json => {
            for record in records {
                println!("{}", serde_json::to_string(&record.to_json())?);
            }
        }
    }
    Ok(())
}
