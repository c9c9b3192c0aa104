use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{CsvError, Result};

pub const DEFAULT_SEPARATOR: char = ',';
pub const DEFAULT_QUOTE: char = '"';
pub const DEFAULT_COMMENT: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolMapping {
    pub separator: char,
    pub quote: char,
    pub escape: char,
    pub comment: char,
    pub skip_comment_lines: bool,
    pub end_of_line: Vec<char>,
    pub tolerate_unterminated_quote: bool,
    pub skip_empty_lines: bool,
}

impl Default for SymbolMapping {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            quote: DEFAULT_QUOTE,
            escape: DEFAULT_QUOTE,
            comment: DEFAULT_COMMENT,
            skip_comment_lines: true,
            end_of_line: vec!['\r', '\n'],
            tolerate_unterminated_quote: true,
            skip_empty_lines: true,
        }
    }
}

impl SymbolMapping {
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Sets the quote character. An escape that mirrored the old quote
    /// follows it, so doubled quotes keep working.
    pub fn with_quote(mut self, quote: char) -> Self {
        if self.escape == self.quote {
            self.escape = quote;
        }
        self.quote = quote;
        self
    }

    pub fn with_escape(mut self, escape: char) -> Self {
        self.escape = escape;
        self
    }

    pub fn with_comment(mut self, comment: char) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_skip_comment_lines(mut self, skip: bool) -> Self {
        self.skip_comment_lines = skip;
        self
    }

    pub fn with_end_of_line(mut self, markers: &[char]) -> Self {
        self.end_of_line = markers.to_vec();
        self
    }

    pub fn with_tolerate_unterminated_quote(mut self, tolerate: bool) -> Self {
        self.tolerate_unterminated_quote = tolerate;
        self
    }

    pub fn with_skip_empty_lines(mut self, skip: bool) -> Self {
        self.skip_empty_lines = skip;
        self
    }

    pub fn is_end_of_line(&self, ch: char) -> bool {
        self.end_of_line.contains(&ch)
    }

    pub fn is_crlf_pair(&self, first: char, second: Option<char>) -> bool {
        first == '\r' && second == Some('\n') && self.is_end_of_line('\n')
    }

    pub fn escape_differs_from_quote(&self) -> bool {
        self.escape != self.quote
    }

    pub fn validate(&self) -> Result<()> {
        if self.end_of_line.is_empty() {
            return Err(CsvError::invalid_config(
                "at least one end-of-line marker is required",
            ));
        }
        if self.separator == self.quote {
            return Err(CsvError::invalid_config(format!(
                "separator and quote are both '{}'",
                printable_symbol(self.separator)
            )));
        }
        for (label, symbol) in [
            ("separator", self.separator),
            ("quote", self.quote),
            ("escape", self.escape),
        ] {
            if self.is_end_of_line(symbol) {
                return Err(CsvError::invalid_config(format!(
                    "{label} '{}' is also an end-of-line marker",
                    printable_symbol(symbol)
                )));
            }
        }
        if self.escape_differs_from_quote() && self.escape == self.separator {
            return Err(CsvError::invalid_config(format!(
                "escape and separator are both '{}'",
                printable_symbol(self.separator)
            )));
        }
        if self.skip_comment_lines {
            for (label, symbol) in [
                ("separator", self.separator),
                ("quote", self.quote),
                ("escape", self.escape),
            ] {
                if self.comment == symbol {
                    return Err(CsvError::invalid_config(format!(
                        "comment trigger and {label} are both '{}'",
                        printable_symbol(symbol)
                    )));
                }
            }
            if self.is_end_of_line(self.comment) {
                return Err(CsvError::invalid_config(format!(
                    "comment trigger '{}' is also an end-of-line marker",
                    printable_symbol(self.comment)
                )));
            }
        }
        Ok(())
    }

    pub fn log_settings(&self) {
        info!("- CSV config / separator: {}", printable_symbol(self.separator));
        info!("- CSV config / quote: {}", printable_symbol(self.quote));
        info!("- CSV config / escape: {}", printable_symbol(self.escape));
        info!(
            "- CSV config / comment: {} (skipped: {})",
            printable_symbol(self.comment),
            self.skip_comment_lines
        );
        info!(
            "- CSV config / end of line: [{}]",
            self.end_of_line
                .iter()
                .map(|c| printable_symbol(*c))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    #[serde(flatten)]
    pub symbols: SymbolMapping,
    /// 0-based index of the first physical line considered by the reader.
    pub start_row: usize,
    pub use_header: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            symbols: SymbolMapping::default(),
            start_row: 0,
            use_header: true,
        }
    }
}

impl ReaderConfig {
    pub fn with_symbols(mut self, symbols: SymbolMapping) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_start_row(mut self, start_row: usize) -> Self {
        self.start_row = start_row;
        self
    }

    pub fn with_header(mut self, use_header: bool) -> Self {
        self.use_header = use_header;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.symbols.validate()
    }

    pub fn log_settings(&self) {
        self.symbols.log_settings();
        info!("- CSV config / start line: {}", self.start_row);
        info!(
            "- CSV config / has header line? {}",
            if self.use_header { "yes" } else { "no" }
        );
    }
}

pub(crate) fn printable_symbol(symbol: char) -> String {
    match symbol {
        '\t' => "\\t".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        other => other.to_string(),
    }
}
