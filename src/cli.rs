use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::ReaderConfig;

#[derive(Debug, Parser)]
#[command(author, version, about = "Read delimited text into rows and typed records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Tokenize a file and print its rows as a table
    Rows(RowsArgs),
    /// Map rows into records using a YAML mapping file
    Map(MapArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct SymbolArgs {
    /// Field separator (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_symbol)]
    pub separator: Option<char>,
    /// Quote character
    #[arg(long, value_parser = parse_symbol)]
    pub quote: Option<char>,
    /// Escape character (defaults to the quote character)
    #[arg(long, value_parser = parse_symbol)]
    pub escape: Option<char>,
    /// Comment trigger character
    #[arg(long, value_parser = parse_symbol)]
    pub comment: Option<char>,
    /// Treat comment lines as ordinary rows
    #[arg(long = "keep-comments")]
    pub keep_comments: bool,
    /// Emit rows for empty lines
    #[arg(long = "keep-empty-lines")]
    pub keep_empty_lines: bool,
    /// Fail on a quote left open at end of input
    #[arg(long = "strict-quotes")]
    pub strict_quotes: bool,
    /// 0-based index of the first line to read
    #[arg(long = "start-row")]
    pub start_row: Option<usize>,
    /// The first row is data, not a header
    #[arg(long = "no-header")]
    pub no_header: bool,
}

impl SymbolArgs {
    /// Overrides `base` with every option given on the command line.
    pub fn apply(&self, mut base: ReaderConfig) -> ReaderConfig {
        if let Some(separator) = self.separator {
            base.symbols = base.symbols.with_separator(separator);
        }
        if let Some(quote) = self.quote {
            base.symbols = base.symbols.with_quote(quote);
        }
        if let Some(escape) = self.escape {
            base.symbols = base.symbols.with_escape(escape);
        }
        if let Some(comment) = self.comment {
            base.symbols = base.symbols.with_comment(comment);
        }
        if self.keep_comments {
            base.symbols.skip_comment_lines = false;
        }
        if self.keep_empty_lines {
            base.symbols.skip_empty_lines = false;
        }
        if self.strict_quotes {
            base.symbols.tolerate_unterminated_quote = false;
        }
        if let Some(start_row) = self.start_row {
            base.start_row = start_row;
        }
        if self.no_header {
            base.use_header = false;
        }
        base
    }
}

#[derive(Debug, Args)]
pub struct RowsArgs {
    /// Input file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    #[command(flatten)]
    pub symbols: SymbolArgs,
    /// Maximum number of data rows to print
    #[arg(long)]
    pub limit: Option<usize>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    /// Input file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML mapping file describing reader settings and columns
    #[arg(short = 'm', long = "mapping")]
    pub mapping: PathBuf,
    #[command(flatten)]
    pub symbols: SymbolArgs,
    /// Output format for mapped records
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
    /// Report and skip rows that fail to map instead of stopping
    #[arg(long)]
    pub lenient: bool,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn parse_symbol(value: &str) -> Result<char, String> {
    match value {
        "tab" | "\\t" | "\t" => Ok('\t'),
        "comma" => Ok(','),
        "pipe" => Ok('|'),
        "semicolon" => Ok(';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Symbol cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Symbol must be a single character".to_string());
            }
            Ok(first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_symbol_accepts_names_and_single_characters() {
        assert_eq!(parse_symbol("tab"), Ok('\t'));
        assert_eq!(parse_symbol("semicolon"), Ok(';'));
        assert_eq!(parse_symbol("'"), Ok('\''));
        assert!(parse_symbol("").is_err());
        assert!(parse_symbol("ab").is_err());
    }

    #[test]
    fn apply_only_overrides_given_options() {
        let base = ReaderConfig::default().with_start_row(3);
        let args = SymbolArgs {
            separator: Some(';'),
            keep_comments: true,
            ..SymbolArgs::default()
        };
        let config = args.apply(base);
        assert_eq!(config.symbols.separator, ';');
        assert!(!config.symbols.skip_comment_lines);
        assert_eq!(config.start_row, 3);
        assert!(config.use_header);
    }
}
