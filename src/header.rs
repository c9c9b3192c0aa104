use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::row::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    names: Vec<String>,
    name_to_index: BTreeMap<String, usize>,
    duplicates: BTreeSet<String>,
    line: usize,
}

impl Header {
    /// The first occurrence of a repeated name keeps its index; the name is
    /// remembered as ambiguous so name-based mapping can refuse it.
    pub fn from_row(row: &Row) -> Self {
        let mut name_to_index = BTreeMap::new();
        let mut duplicates = BTreeSet::new();
        for (idx, name) in row.iter().enumerate() {
            if name_to_index.contains_key(name) {
                duplicates.insert(name.to_string());
            } else {
                name_to_index.insert(name.to_string(), idx);
            }
        }
        if !duplicates.is_empty() {
            warn!(
                "Header on line {} repeats column name(s): {}",
                row.line_number(),
                duplicates.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        Self {
            names: row.fields().to_vec(),
            name_to_index,
            duplicates,
            line: row.line_number(),
        }
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.duplicates.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn line_number(&self) -> usize {
        self.line
    }
}

#[derive(Debug, Default)]
pub struct HeaderRegistry {
    current: Option<Header>,
}

impl HeaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(&mut self, row: &Row) -> &Header {
        if self.current.is_some() {
            debug!(
                "Header already captured; ignoring row on line {}",
                row.line_number()
            );
        }
        self.current.get_or_insert_with(|| Header::from_row(row))
    }

    pub fn rebuild(&mut self, row: &Row) -> &Header {
        let header = Header::from_row(row);
        debug!("Rebuilding header from line {}", header.line_number());
        self.current.insert(header)
    }

    pub fn get(&self) -> Option<&Header> {
        self.current.as_ref()
    }

    pub fn is_built(&self) -> bool {
        self.current.is_some()
    }
}
