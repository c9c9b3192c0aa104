//! YAML mapping files for records whose shape is only known at runtime.
//!
//! A mapping file carries the reader settings and one entry per mapped
//! column:
//!
//! ```yaml
//! separator: ';'
//! use_header: true
//! columns:
//!   - property: amount
//!     name: money
//!     type: float
//!     decimal_separator: ','
//!     grouping_separator: '.'
//!     required: true
//!   - property: month
//!     index: 3
//!     type: date
//!     pattern: '%Y-%m'
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::ReaderConfig;
use crate::data::{ColumnType, Value, ValueFormat};
use crate::mapper::MapperKind;
use crate::mapping::{ColumnKey, MappingTable, PropertyMapping};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingFile {
    #[serde(flatten)]
    pub reader: ReaderConfig,
    pub mapper: Option<MapperKind>,
    pub columns: Vec<ColumnEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default = "default_column_type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub ignored: bool,
    #[serde(flatten)]
    pub format: ValueFormat,
}

fn default_column_type() -> ColumnType {
    ColumnType::String
}

impl ColumnEntry {
    pub fn key(&self) -> Result<ColumnKey> {
        match (&self.index, &self.name) {
            (Some(index), None) => Ok(ColumnKey::Index(*index)),
            (None, Some(name)) => Ok(ColumnKey::Name(name.clone())),
            (Some(_), Some(_)) => bail!(
                "Column '{}' sets both 'index' and 'name'; choose one",
                self.property
            ),
            (None, None) => bail!(
                "Column '{}' needs either an 'index' or a 'name'",
                self.property
            ),
        }
    }
}

/// Record produced from a [`MappingFile`]: property name to converted value.
/// Properties whose field was empty are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    values: BTreeMap<String, Value>,
}

impl DynamicRecord {
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }

    pub fn insert(&mut self, property: impl Into<String>, value: Value) {
        self.values.insert(property.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(property, value)| (property.clone(), value.to_json()))
                .collect(),
        )
    }

    /// Display strings in `properties` order; absent values are blank.
    pub fn display_row(&self, properties: &[String]) -> Vec<String> {
        properties
            .iter()
            .map(|property| {
                self.values
                    .get(property)
                    .map(Value::as_display)
                    .unwrap_or_default()
            })
            .collect()
    }
}

impl MappingFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening mapping file {path:?}"))?;
        Self::from_yaml_str(&raw).with_context(|| format!("Parsing mapping file {path:?}"))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let file: MappingFile = serde_yaml::from_str(raw)?;
        if file.columns.is_empty() {
            bail!("Mapping file does not define any columns");
        }
        Ok(file)
    }

    /// Names of the mapped, non-ignored properties in file order.
    pub fn properties(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| !column.ignored)
            .map(|column| column.property.clone())
            .collect()
    }

    pub fn build_table(&self) -> Result<MappingTable<DynamicRecord>> {
        let mut table = MappingTable::<DynamicRecord>::default().with_record_name("record");
        if let Some(mapper) = self.mapper {
            table = table.with_mapper(mapper);
        }
        for column in &self.columns {
            let property = column.property.clone();
            let mut mapping = PropertyMapping::new(
                column.property.clone(),
                column.key()?,
                column.column_type,
                move |record: &mut DynamicRecord, value| {
                    record.insert(property.clone(), value);
                    Ok(())
                },
            )
            .required(column.required)
            .ignored(column.ignored);
            if column.format != ValueFormat::default() {
                mapping = mapping.format(column.format.clone());
            }
            table.push(mapping);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
separator: ';'
start_row: 1
columns:
  - property: amount
    name: money
    type: float
    decimal_separator: ','
    grouping_separator: '.'
    required: true
  - property: label
    name: label
"#;

    #[test]
    fn parses_reader_settings_and_columns() {
        let file = MappingFile::from_yaml_str(SAMPLE).expect("parse mapping");
        assert_eq!(file.reader.symbols.separator, ';');
        assert_eq!(file.reader.start_row, 1);
        assert!(file.reader.use_header);
        assert_eq!(file.columns.len(), 2);
        assert_eq!(file.columns[0].column_type, ColumnType::Float);
        assert_eq!(file.columns[0].format.decimal_separator, Some(','));
        assert_eq!(file.columns[1].column_type, ColumnType::String);
        assert_eq!(file.properties(), vec!["amount", "label"]);
    }

    #[test]
    fn column_needs_exactly_one_key() {
        let both = "columns:\n  - property: x\n    index: 0\n    name: x\n";
        let file = MappingFile::from_yaml_str(both).unwrap();
        assert!(file.build_table().is_err());

        let neither = "columns:\n  - property: x\n";
        let file = MappingFile::from_yaml_str(neither).unwrap();
        assert!(file.build_table().is_err());
    }

    #[test]
    fn empty_column_list_is_rejected() {
        assert!(MappingFile::from_yaml_str("separator: ';'\n").is_err());
    }

    #[test]
    fn build_table_produces_name_mapper() {
        let table = MappingFile::from_yaml_str(SAMPLE)
            .unwrap()
            .build_table()
            .unwrap();
        assert_eq!(table.mapper_kind().unwrap(), MapperKind::ByName);
        assert!(table.find("amount").unwrap().is_required());
    }

    #[test]
    fn dynamic_record_renders_json_and_rows() {
        let mut record = DynamicRecord::default();
        record.insert("year", Value::Integer(1983));
        record.insert("name", Value::String("alpha".into()));
        assert_eq!(
            record.to_json(),
            serde_json::json!({"year": 1983, "name": "alpha"})
        );
        assert_eq!(
            record.display_row(&["name".into(), "missing".into(), "year".into()]),
            vec!["alpha", "", "1983"]
        );
    }
}
