//! Pull-based readers.
//!
//! [`RowReader`] drives the line splitter, comment filter and tokenizer to
//! produce raw rows on demand, capturing the header row when configured.
//! [`RecordReader`] layers a [`MappingTable`] on top and yields typed
//! records.
//!
//! ## State machine
//!
//! `NotStarted → SkippingToStart → ReadingHeader (optional) → ReadingData → Finished`
//!
//! End of stream in any state moves to `Finished`; further reads return
//! `Ok(None)`.

use std::io::BufRead;

use log::{debug, info};

use crate::config::ReaderConfig;
use crate::error::{CsvError, Result};
use crate::header::{Header, HeaderRegistry};
use crate::line::LineSplitter;
use crate::mapping::MappingTable;
use crate::row::{Row, RowTokenizer};
use crate::strategy::MappingStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    NotStarted,
    SkippingToStart,
    ReadingHeader,
    ReadingData,
    Finished,
}

pub struct RowReader<R> {
    splitter: LineSplitter<R>,
    tokenizer: RowTokenizer,
    config: ReaderConfig,
    state: ReaderState,
    headers: HeaderRegistry,
    current_line: usize,
    rows_read: usize,
}

impl<R: BufRead> RowReader<R> {
    pub fn new(reader: R, config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        config.log_settings();
        Ok(Self {
            splitter: LineSplitter::new(reader, config.symbols.clone()),
            tokenizer: RowTokenizer::new(config.symbols.clone()),
            config,
            state: ReaderState::NotStarted,
            headers: HeaderRegistry::new(),
            current_line: 0,
            rows_read: 0,
        })
    }

    pub fn from_reader(reader: R) -> Result<Self> {
        Self::new(reader, ReaderConfig::default())
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == ReaderState::Finished
    }

    /// 1-based line on which the most recently produced row (or header)
    /// started; 0 before anything was read.
    pub fn current_line(&self) -> usize {
        self.current_line
    }

    /// Physical lines consumed so far, whether skipped, commented, header or
    /// data.
    pub fn lines_read(&self) -> usize {
        self.splitter.lines_read()
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    pub fn header(&self) -> Option<&Header> {
        self.headers.get()
    }

    /// Returns the header, reading it first if the session has not reached
    /// data yet. Repeated calls return the same header.
    pub fn read_header(&mut self) -> Result<Option<&Header>> {
        self.ensure_header()?;
        Ok(self.headers.get())
    }

    pub fn reread_header(&mut self) -> Result<Option<&Header>> {
        if !self.config.use_header {
            return Ok(None);
        }
        self.ensure_header()?;
        let Some(row) = self.next_row()? else {
            return Ok(None);
        };
        info!("Re-reading header from line {}", row.line_number());
        Ok(Some(self.headers.rebuild(&row)))
    }

    pub fn read_row(&mut self) -> Result<Option<Row>> {
        self.ensure_header()?;
        let row = self.next_row()?;
        if row.is_some() {
            self.rows_read += 1;
        }
        Ok(row)
    }

    pub fn read_rows(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.read_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    fn ensure_header(&mut self) -> Result<()> {
        self.skip_to_start()?;
        if self.state != ReaderState::ReadingHeader {
            return Ok(());
        }
        match self.next_row()? {
            Some(row) => {
                debug!(
                    "Captured header with {} column(s) on line {}",
                    row.len(),
                    row.line_number()
                );
                self.headers.build(&row);
                self.state = ReaderState::ReadingData;
            }
            None => debug!("Stream ended before a header row"),
        }
        Ok(())
    }

    fn skip_to_start(&mut self) -> Result<()> {
        if self.state != ReaderState::NotStarted {
            return Ok(());
        }
        self.state = ReaderState::SkippingToStart;
        while self.splitter.lines_read() < self.config.start_row {
            if !self.splitter.skip_physical_line()? {
                self.finish();
                return Ok(());
            }
            debug!("Skipped line {} before start row", self.splitter.lines_read());
        }
        self.state = if self.config.use_header {
            ReaderState::ReadingHeader
        } else {
            ReaderState::ReadingData
        };
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if self.is_finished() {
            return Ok(None);
        }
        loop {
            let line = match self.splitter.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.finish();
                    return Ok(None);
                }
                Err(err) => {
                    self.finish();
                    return Err(err);
                }
            };
            if line.comment {
                debug!("Skipping comment on line {}", line.start_line);
                continue;
            }
            if line.is_empty() && self.config.symbols.skip_empty_lines {
                debug!("Skipping empty line {}", line.start_line);
                continue;
            }
            let row = self.tokenizer.tokenize(&line);
            self.current_line = row.line_number();
            return Ok(Some(row));
        }
    }

    fn finish(&mut self) {
        if self.state != ReaderState::Finished {
            debug!(
                "Finished after {} line(s), {} data row(s)",
                self.splitter.lines_read(),
                self.rows_read
            );
            self.state = ReaderState::Finished;
        }
    }
}

impl<R: BufRead> Iterator for RowReader<R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_row().transpose()
    }
}

/// A row that could not be mapped. `partial` holds the record as far as it
/// was populated before the failure.
#[derive(Debug)]
pub struct RowFailure<T> {
    pub line: usize,
    pub error: CsvError,
    pub partial: Option<T>,
}

#[derive(Debug)]
pub struct LenientOutcome<T> {
    pub records: Vec<T>,
    pub failures: Vec<RowFailure<T>>,
}

pub struct RecordReader<R, T> {
    rows: RowReader<R>,
    table: MappingTable<T>,
}

impl<R: BufRead, T> RecordReader<R, T> {
    pub fn new(reader: R, config: ReaderConfig, table: MappingTable<T>) -> Result<Self> {
        let kind = table.mapper_kind()?;
        info!("- CSV config / mapping strategy: {kind}");
        Ok(Self {
            rows: RowReader::new(reader, config)?,
            table,
        })
    }

    pub fn read_header(&mut self) -> Result<Option<&Header>> {
        self.rows.read_header()
    }

    pub fn header(&self) -> Option<&Header> {
        self.rows.header()
    }

    pub fn read_row(&mut self) -> Result<Option<Row>> {
        self.rows.read_row()
    }

    pub fn read_rows(&mut self) -> Result<Vec<Row>> {
        self.rows.read_rows()
    }

    pub fn is_finished(&self) -> bool {
        self.rows.is_finished()
    }

    pub fn current_line(&self) -> usize {
        self.rows.current_line()
    }

    pub fn lines_read(&self) -> usize {
        self.rows.lines_read()
    }

    pub fn read_record(&mut self) -> Result<Option<T>> {
        match self.next_mapped()? {
            None => Ok(None),
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(failure)) => Err(failure.error),
        }
    }

    pub fn read_records(&mut self) -> Result<Vec<T>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Maps every remaining row, collecting row-level failures instead of
    /// stopping. Structural and I/O errors still abort.
    pub fn read_records_lenient(&mut self) -> Result<LenientOutcome<T>> {
        let mut outcome = LenientOutcome {
            records: Vec::new(),
            failures: Vec::new(),
        };
        while let Some(mapped) = self.next_mapped()? {
            match mapped {
                Ok(record) => outcome.records.push(record),
                Err(failure) if failure.error.is_fatal() => return Err(failure.error),
                Err(failure) => outcome.failures.push(failure),
            }
        }
        Ok(outcome)
    }

    fn next_mapped(&mut self) -> Result<Option<std::result::Result<T, RowFailure<T>>>> {
        let Some(row) = self.rows.read_row()? else {
            return Ok(None);
        };
        let line = row.line_number();
        let strategy = MappingStrategy::instruct(&self.table, self.rows.header(), &row)?;
        let mut record = match self.table.instantiate() {
            Ok(record) => record,
            Err(error) => {
                return Ok(Some(Err(RowFailure {
                    line,
                    error,
                    partial: None,
                })));
            }
        };
        Ok(Some(match strategy.convert(&mut record, &row, line) {
            Ok(()) => Ok(record),
            Err(error) => Err(RowFailure {
                line,
                error,
                partial: Some(record),
            }),
        }))
    }
}

impl<R: BufRead, T> Iterator for RecordReader<R, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::config::SymbolMapping;

    fn reader(input: &str, config: ReaderConfig) -> RowReader<Cursor<Vec<u8>>> {
        RowReader::new(Cursor::new(input.as_bytes().to_vec()), config).expect("reader")
    }

    #[test]
    fn walks_through_states() {
        let mut rows = reader("skip\nname\nvalue", ReaderConfig::default().with_start_row(1));
        assert_eq!(rows.state(), ReaderState::NotStarted);
        let header = rows.read_header().unwrap().cloned().expect("header");
        assert_eq!(header.names(), &["name".to_string()]);
        assert_eq!(rows.state(), ReaderState::ReadingData);
        assert_eq!(rows.read_row().unwrap().unwrap().fields(), &["value".to_string()]);
        assert!(rows.read_row().unwrap().is_none());
        assert_eq!(rows.state(), ReaderState::Finished);
        assert!(rows.read_row().unwrap().is_none());
        assert_eq!(rows.lines_read(), 3);
    }

    #[test]
    fn start_row_past_end_finishes() {
        let mut rows = reader("a\nb", ReaderConfig::default().with_start_row(10));
        assert!(rows.read_rows().unwrap().is_empty());
        assert!(rows.is_finished());
        assert_eq!(rows.lines_read(), 2);
        assert!(rows.header().is_none());
    }

    #[test]
    fn empty_lines_count_but_are_skipped() {
        let mut rows = reader("a\n\nb\n", ReaderConfig::default().with_header(false));
        assert_eq!(rows.read_rows().unwrap().len(), 2);
        assert_eq!(rows.lines_read(), 3);

        let symbols = SymbolMapping::default().with_skip_empty_lines(false);
        let mut keep = reader(
            "a\n\nb\n",
            ReaderConfig::default().with_header(false).with_symbols(symbols),
        );
        assert_eq!(keep.read_rows().unwrap().len(), 3);
    }

    #[test]
    fn iterator_yields_data_rows() {
        let rows = reader("h\n1\n2\n", ReaderConfig::default());
        let collected = rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(collected.len(), 2);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let symbols = SymbolMapping::default().with_separator('"');
        let result = RowReader::new(
            Cursor::new(Vec::new()),
            ReaderConfig::default().with_symbols(symbols),
        );
        assert!(matches!(result, Err(CsvError::InvalidConfig { .. })));
    }
}
