use log::debug;

use crate::error::{CsvError, Result};
use crate::header::Header;
use crate::mapper::ColumnMapper;
use crate::mapping::{MappingTable, PropertyMapping};
use crate::row::Row;

pub struct MappingStrategy<'a, T> {
    bindings: Vec<(&'a PropertyMapping<T>, usize)>,
}

impl<'a, T> MappingStrategy<'a, T> {
    pub fn instruct(
        table: &'a MappingTable<T>,
        header: Option<&'a Header>,
        row: &Row,
    ) -> Result<Self> {
        let mapper = ColumnMapper::for_kind(table.mapper_kind()?, header);
        let bindings = table
            .active_properties()
            .map(|mapping| {
                mapper
                    .check_key(row, mapping.key(), mapping.property())
                    .map(|column| (mapping, column))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bindings })
    }

    /// Column each active property was bound to, in mapping order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, usize)> {
        self.bindings
            .iter()
            .map(|(mapping, column)| (mapping.property(), *column))
    }

    /// Populates `target` from `row`. On failure `target` keeps every
    /// property assigned before the failing one.
    pub fn convert(&self, target: &mut T, row: &Row, line: usize) -> Result<()> {
        for (mapping, column) in &self.bindings {
            let raw = row.get(*column).unwrap_or("");
            if raw.is_empty() {
                if mapping.is_required() {
                    return Err(CsvError::RequiredField {
                        property: mapping.property().to_string(),
                        line,
                    });
                }
                debug!(
                    "Line {line}: property \"{}\" left unset (empty column {column})",
                    mapping.property()
                );
                continue;
            }
            let conversion_error = |source: anyhow::Error| CsvError::Conversion {
                property: mapping.property().to_string(),
                line,
                value: raw.to_string(),
                source: source.into(),
            };
            let value = mapping.conversion().apply(raw).map_err(conversion_error)?;
            mapping.assign(target, value).map_err(conversion_error)?;
        }
        Ok(())
    }
}
