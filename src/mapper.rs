use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CsvError, Result};
use crate::header::Header;
use crate::mapping::{ColumnKey, MappingTable, PropertyMapping};
use crate::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapperKind {
    ByIndex,
    ByName,
}

impl fmt::Display for MapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapperKind::ByIndex => f.write_str("column index"),
            MapperKind::ByName => f.write_str("column name"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ColumnMapper<'h> {
    ByIndex,
    ByName(Option<&'h Header>),
}

impl<'h> ColumnMapper<'h> {
    pub fn by_index() -> Self {
        ColumnMapper::ByIndex
    }

    pub fn by_name(header: Option<&'h Header>) -> Self {
        ColumnMapper::ByName(header)
    }

    pub fn for_kind(kind: MapperKind, header: Option<&'h Header>) -> Self {
        match kind {
            MapperKind::ByIndex => Self::by_index(),
            MapperKind::ByName => Self::by_name(header),
        }
    }

    pub fn kind(&self) -> MapperKind {
        match self {
            ColumnMapper::ByIndex => MapperKind::ByIndex,
            ColumnMapper::ByName(_) => MapperKind::ByName,
        }
    }

    /// Validates `key` for `property` and returns the column it resolves to.
    /// By index the column must exist in `row`; by name the header must know
    /// the name exactly once.
    pub fn check_key(&self, row: &Row, key: &ColumnKey, property: &str) -> Result<usize> {
        match (self, key) {
            (ColumnMapper::ByIndex, ColumnKey::Index(index)) => {
                if *index < row.len() {
                    Ok(*index)
                } else {
                    Err(CsvError::ColumnIndexOutOfBounds {
                        index: *index,
                        columns: row.len(),
                        property: property.to_string(),
                    })
                }
            }
            (ColumnMapper::ByName(header), ColumnKey::Name(name)) => {
                let header = header.ok_or_else(|| CsvError::MissingHeader {
                    property: property.to_string(),
                })?;
                if header.is_ambiguous(name) {
                    return Err(CsvError::AmbiguousColumnName {
                        name: name.clone(),
                        property: property.to_string(),
                    });
                }
                header
                    .index(name)
                    .ok_or_else(|| CsvError::UnknownColumnName {
                        name: name.clone(),
                        property: property.to_string(),
                    })
            }
            (mapper, key) => Err(CsvError::invalid_config(format!(
                "property \"{property}\" is keyed by {key} but the session maps by {}",
                mapper.kind()
            ))),
        }
    }

    pub fn resolve<'t, T>(
        &self,
        table: &'t MappingTable<T>,
        row: &Row,
        column: usize,
    ) -> Option<&'t PropertyMapping<T>> {
        table.active_properties().find(|mapping| {
            self.check_key(row, mapping.key(), mapping.property())
                .is_ok_and(|resolved| resolved == column)
        })
    }
}
