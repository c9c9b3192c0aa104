use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::RowsArgs, config::ReaderConfig, io_utils, reader::RowReader, table,
};

pub fn execute(args: &RowsArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let config = args.symbols.apply(ReaderConfig::default());
    let input = io_utils::open_input(&args.input, encoding)?;
    let mut reader = RowReader::new(input, config)
        .with_context(|| format!("Configuring reader for {:?}", args.input))?;

    let header = reader
        .read_header()
        .with_context(|| format!("Reading header from {:?}", args.input))?
        .map(|h| h.names().to_vec());

    let mut rows = Vec::new();
    while args.limit.is_none_or(|limit| rows.len() < limit) {
        let Some(row) = reader
            .read_row()
            .with_context(|| format!("Reading row after line {}", reader.current_line()))?
        else {
            break;
        };
        rows.push(row.into_fields());
    }

    let headers = header.unwrap_or_else(|| {
        table::generated_headers(rows.iter().map(Vec::len).max().unwrap_or(0))
    });
    table::print_table(&headers, &rows);
    info!(
        "Displayed {} of {} row(s) read from {:?} ({} line(s) consumed)",
        rows.len(),
        reader.rows_read(),
        args.input,
        reader.lines_read()
    );
    Ok(())
}
