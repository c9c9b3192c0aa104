use thiserror::Error;

pub type Result<T> = std::result::Result<T, CsvError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Structural,
    RequiredField,
    Conversion,
    Instantiation,
    Io,
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error(
        "Column with index {index} does not exist in file with {columns} columns. Originally mapped to property \"{property}\""
    )]
    ColumnIndexOutOfBounds {
        index: usize,
        columns: usize,
        property: String,
    },

    #[error("Column with name \"{name}\" does not exist in header. Originally mapped to property \"{property}\"")]
    UnknownColumnName { name: String, property: String },

    #[error("Column name \"{name}\" appears more than once in header. Originally mapped to property \"{property}\"")]
    AmbiguousColumnName { name: String, property: String },

    #[error("Property \"{property}\" is mapped by column name but no header has been read")]
    MissingHeader { property: String },

    #[error("Unterminated quote in row starting at line {line}")]
    UnterminatedQuote { line: usize },

    #[error("Invalid reader configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Property \"{property}\" is required and may not be empty (line {line})")]
    RequiredField { property: String, line: usize },

    #[error("Failed to convert \"{value}\" for property \"{property}\" (line {line}): {source}")]
    Conversion {
        property: String,
        line: usize,
        value: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Unable to instantiate record {record}: {source}")]
    Instantiation {
        record: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CsvError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CsvError::ColumnIndexOutOfBounds { .. }
            | CsvError::UnknownColumnName { .. }
            | CsvError::AmbiguousColumnName { .. }
            | CsvError::MissingHeader { .. }
            | CsvError::UnterminatedQuote { .. }
            | CsvError::InvalidConfig { .. } => ErrorKind::Structural,
            CsvError::RequiredField { .. } => ErrorKind::RequiredField,
            CsvError::Conversion { .. } => ErrorKind::Conversion,
            CsvError::Instantiation { .. } => ErrorKind::Instantiation,
            CsvError::Io(_) => ErrorKind::Io,
        }
    }

    /// Structural and I/O failures abort the whole read; the rest only fail
    /// the current row.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Structural | ErrorKind::Io)
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            CsvError::UnterminatedQuote { line }
            | CsvError::RequiredField { line, .. }
            | CsvError::Conversion { line, .. } => Some(*line),
            _ => None,
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        CsvError::InvalidConfig {
            message: message.into(),
        }
    }
}
