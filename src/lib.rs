//! Quote-aware reading of delimited text into rows and typed records.
//!
//! The row layer ([`reader::RowReader`]) turns a character stream into
//! [`row::Row`]s, honoring quotes, escapes, comment lines, multi-line quoted
//! fields and configurable end-of-line markers. The mapping layer
//! ([`reader::RecordReader`]) binds rows onto records through an explicit
//! [`mapping::MappingTable`], resolving columns by index or by header name.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod header;
pub mod io_utils;
pub mod line;
pub mod map_cmd;
pub mod mapper;
pub mod mapping;
pub mod mapping_file;
pub mod reader;
pub mod row;
pub mod rows_cmd;
pub mod strategy;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

pub use crate::config::{ReaderConfig, SymbolMapping};
pub use crate::error::{CsvError, ErrorKind};
pub use crate::header::Header;
pub use crate::mapping::{ColumnKey, MappingTable, PropertyMapping};
pub use crate::reader::{RecordReader, RowReader};
pub use crate::row::Row;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_bind", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    debug!("Parsed command line: {:?}", cli.command);
    match cli.command {
        Commands::Rows(args) => rows_cmd::execute(&args),
        Commands::Map(args) => map_cmd::execute(&args),
    }
}
