use std::collections::VecDeque;
use std::io::{self, BufRead};

use log::{debug, warn};

use crate::config::SymbolMapping;
use crate::error::{CsvError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
    pub comment: bool,
    /// Set when the stream ended inside an open quote.
    pub unterminated: bool,
}

impl LogicalLine {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn physical_lines(&self) -> usize {
        self.end_line + 1 - self.start_line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentFilter {
    trigger: char,
    enabled: bool,
}

impl CommentFilter {
    pub fn new(trigger: char, enabled: bool) -> Self {
        Self { trigger, enabled }
    }

    pub fn from_symbols(symbols: &SymbolMapping) -> Self {
        Self::new(symbols.comment, symbols.skip_comment_lines)
    }

    pub fn is_comment_start(&self, first: char) -> bool {
        self.enabled && first == self.trigger
    }

    pub fn is_comment(&self, raw: &str) -> bool {
        raw.chars()
            .find(|c| !c.is_whitespace())
            .is_some_and(|first| self.is_comment_start(first))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lexeme {
    Text(char),
    Separator,
    QuoteBoundary,
}

/// Quote-state machine shared by the line splitter and the row tokenizer.
///
/// Only a quote at the start of a field opens quoting, and a quote inside
/// quotes only closes it when followed by a separator, an end-of-line
/// marker or the end of input. Any other bare quote is literal content.
pub(crate) struct QuoteLexer<'a> {
    symbols: &'a SymbolMapping,
    in_quotes: bool,
    at_field_start: bool,
}

impl<'a> QuoteLexer<'a> {
    pub(crate) fn new(symbols: &'a SymbolMapping) -> Self {
        Self {
            symbols,
            in_quotes: false,
            at_field_start: true,
        }
    }

    pub(crate) fn in_quotes(&self) -> bool {
        self.in_quotes
    }

    pub(crate) fn feed(&mut self, ch: char, next: Option<char>) -> (Lexeme, bool) {
        let symbols = self.symbols;
        if symbols.escape_differs_from_quote()
            && ch == symbols.escape
            && let Some(escaped) = next
            && (escaped == symbols.quote
                || escaped == symbols.escape
                || escaped == symbols.separator)
        {
            self.at_field_start = false;
            return (Lexeme::Text(escaped), true);
        }

        if ch == symbols.quote {
            if !self.in_quotes {
                if self.at_field_start {
                    self.in_quotes = true;
                    self.at_field_start = false;
                    return (Lexeme::QuoteBoundary, false);
                }
                return (Lexeme::Text(ch), false);
            }
            if !symbols.escape_differs_from_quote() && next == Some(symbols.quote) {
                return (Lexeme::Text(ch), true);
            }
            let closes = match next {
                None => true,
                Some(following) => {
                    following == symbols.separator || symbols.is_end_of_line(following)
                }
            };
            if closes {
                self.in_quotes = false;
                return (Lexeme::QuoteBoundary, false);
            }
            return (Lexeme::Text(ch), false);
        }

        if !self.in_quotes && ch == symbols.separator {
            self.at_field_start = true;
            return (Lexeme::Separator, false);
        }

        self.at_field_start = false;
        (Lexeme::Text(ch), false)
    }
}

const CHUNK_BYTES: usize = 8 * 1024;

struct CharSource<R> {
    reader: R,
    pending: VecDeque<char>,
    partial: Vec<u8>,
    exhausted: bool,
}

impl<R: BufRead> CharSource<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
            partial: Vec::new(),
            exhausted: false,
        }
    }

    /// Decodes at most one chunk of bytes at a time; a multi-byte character
    /// split across chunks waits in `partial`.
    fn fill(&mut self) -> Result<bool> {
        while self.pending.is_empty() {
            if self.exhausted {
                return Ok(false);
            }
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                self.exhausted = true;
                if !self.partial.is_empty() {
                    return Err(invalid_utf8());
                }
                return Ok(false);
            }
            let take = available.len().min(CHUNK_BYTES);
            self.partial.extend_from_slice(&available[..take]);
            self.reader.consume(take);

            let valid = match std::str::from_utf8(&self.partial) {
                Ok(text) => text.len(),
                Err(err) if err.error_len().is_none() => err.valid_up_to(),
                Err(_) => return Err(invalid_utf8()),
            };
            let text = std::str::from_utf8(&self.partial[..valid]).map_err(|_| invalid_utf8())?;
            self.pending.extend(text.chars());
            self.partial.drain(..valid);
        }
        Ok(true)
    }

    fn next(&mut self) -> Result<Option<char>> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(self.pending.pop_front())
    }

    fn peek(&mut self) -> Result<Option<char>> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(self.pending.front().copied())
    }

    fn consume_crlf_tail(&mut self, symbols: &SymbolMapping, ch: char) -> Result<()> {
        let next = self.peek()?;
        if symbols.is_crlf_pair(ch, next) {
            self.next()?;
        }
        Ok(())
    }
}

fn invalid_utf8() -> CsvError {
    CsvError::Io(io::Error::new(
        io::ErrorKind::InvalidData,
        "stream did not contain valid UTF-8",
    ))
}

pub struct LineSplitter<R> {
    source: CharSource<R>,
    symbols: SymbolMapping,
    comments: CommentFilter,
    lines_read: usize,
}

impl<R: BufRead> LineSplitter<R> {
    pub fn new(reader: R, symbols: SymbolMapping) -> Self {
        let comments = CommentFilter::from_symbols(&symbols);
        Self {
            source: CharSource::new(reader),
            symbols,
            comments,
            lines_read: 0,
        }
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Consumes one physical line without any quote tracking. Returns
    /// `false` when the stream was already exhausted.
    pub fn skip_physical_line(&mut self) -> Result<bool> {
        let mut consumed = false;
        while let Some(ch) = self.source.next()? {
            consumed = true;
            if self.symbols.is_end_of_line(ch) {
                self.source.consume_crlf_tail(&self.symbols, ch)?;
                break;
            }
        }
        if consumed {
            self.lines_read += 1;
        }
        Ok(consumed)
    }

    pub fn next_line(&mut self) -> Result<Option<LogicalLine>> {
        let start_line = self.lines_read + 1;
        let mut text = String::new();
        let mut lexer = QuoteLexer::new(&self.symbols);
        let mut comment = false;
        let mut leading = true;
        let mut consumed_any = false;
        let mut mid_line = false;

        loop {
            let Some(ch) = self.source.next()? else {
                if !consumed_any {
                    return Ok(None);
                }
                if mid_line {
                    self.lines_read += 1;
                }
                let unterminated = !comment && lexer.in_quotes();
                if unterminated {
                    if !self.symbols.tolerate_unterminated_quote {
                        return Err(CsvError::UnterminatedQuote { line: start_line });
                    }
                    warn!("Unterminated quote in row starting at line {start_line}; keeping partial field");
                }
                return Ok(Some(LogicalLine {
                    text,
                    start_line,
                    end_line: self.lines_read,
                    comment,
                    unterminated,
                }));
            };
            consumed_any = true;

            if self.symbols.is_end_of_line(ch) {
                self.source.consume_crlf_tail(&self.symbols, ch)?;
                self.lines_read += 1;
                mid_line = false;
                if comment || !lexer.in_quotes() {
                    return Ok(Some(LogicalLine {
                        text,
                        start_line,
                        end_line: self.lines_read,
                        comment,
                        unterminated: false,
                    }));
                }
                text.push('\n');
                continue;
            }
            mid_line = true;

            if comment {
                text.push(ch);
                continue;
            }
            if leading && !ch.is_whitespace() {
                leading = false;
                if self.comments.is_comment_start(ch) {
                    debug!("Line {start_line} is a comment");
                    comment = true;
                    text.push(ch);
                    continue;
                }
            }

            let next = self.source.peek()?;
            let (_, consumed_next) = lexer.feed(ch, next);
            text.push(ch);
            if consumed_next && let Some(following) = self.source.next()? {
                text.push(following);
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn splitter(input: &str, symbols: SymbolMapping) -> LineSplitter<Cursor<Vec<u8>>> {
        LineSplitter::new(Cursor::new(input.as_bytes().to_vec()), symbols)
    }

    fn collect(input: &str, symbols: SymbolMapping) -> Vec<LogicalLine> {
        let mut lines = splitter(input, symbols);
        let mut out = Vec::new();
        while let Some(line) = lines.next_line().expect("split line") {
            out.push(line);
        }
        out
    }

    #[test]
    fn crlf_cr_and_lf_are_equivalent_terminators() {
        let lines = collect("a\r\nb\rc\nd", SymbolMapping::default());
        let texts = lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["a", "b", "c", "d"]);
        assert_eq!(lines[3].end_line, 4);
    }

    #[test]
    fn quoted_newline_joins_physical_lines() {
        let mut lines = splitter("\"line 1\r\nline 2\",x\nnext", SymbolMapping::default());
        let first = lines.next_line().unwrap().unwrap();
        assert_eq!(first.text, "\"line 1\nline 2\",x");
        assert_eq!(first.start_line, 1);
        assert_eq!(first.end_line, 2);
        assert_eq!(first.physical_lines(), 2);
        assert_eq!(lines.lines_read(), 2);

        let second = lines.next_line().unwrap().unwrap();
        assert_eq!(second.start_line, 3);
        assert!(lines.next_line().unwrap().is_none());
        assert_eq!(lines.lines_read(), 3);
    }

    #[test]
    fn trailing_terminator_does_not_add_a_line() {
        let lines = collect("a\nb\n", SymbolMapping::default());
        assert_eq!(lines.len(), 2);
        assert!(collect("", SymbolMapping::default()).is_empty());
    }

    #[test]
    fn unterminated_quote_is_kept_when_tolerated() {
        let lines = collect("a,\"open\nstill open", SymbolMapping::default());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].unterminated);
        assert_eq!(lines[0].text, "a,\"open\nstill open");
        assert_eq!(lines[0].end_line, 2);
    }

    #[test]
    fn open_quote_before_final_terminator_counts_each_line_once() {
        let mut lines = splitter("\"open\n", SymbolMapping::default());
        let line = lines.next_line().unwrap().unwrap();
        assert!(line.unterminated);
        assert_eq!(line.end_line, 1);
        assert_eq!(lines.lines_read(), 1);
    }

    #[test]
    fn unterminated_quote_fails_when_not_tolerated() {
        let symbols = SymbolMapping::default().with_tolerate_unterminated_quote(false);
        let mut lines = splitter("x\n\"open", symbols);
        assert!(lines.next_line().unwrap().is_some());
        let err = lines.next_line().expect_err("unterminated quote");
        assert!(matches!(err, CsvError::UnterminatedQuote { line: 2 }));
    }

    #[test]
    fn comment_lines_ignore_quotes() {
        let lines = collect("# a \"stray quote\nreal", SymbolMapping::default());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].comment);
        assert!(!lines[1].comment);
    }

    #[test]
    fn disabled_comments_are_plain_lines() {
        let symbols = SymbolMapping::default().with_skip_comment_lines(false);
        let lines = collect("#1;Bill\n", symbols);
        assert!(!lines[0].comment);
    }

    #[test]
    fn escaped_quote_does_not_toggle_quote_state() {
        let symbols = SymbolMapping::default().with_escape('\\');
        let lines = collect("\"a \\\" b\nc\",d\ne", symbols);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "\"a \\\" b\nc\",d");
    }

    #[test]
    fn skip_physical_line_ignores_quotes() {
        let mut lines = splitter("\"preamble\nreal\n", SymbolMapping::default());
        assert!(lines.skip_physical_line().unwrap());
        let line = lines.next_line().unwrap().unwrap();
        assert_eq!(line.text, "real");
        assert_eq!(line.start_line, 2);
        assert!(!lines.skip_physical_line().unwrap());
    }

    #[test]
    fn custom_end_of_line_set() {
        let symbols = SymbolMapping::default().with_end_of_line(&['\n']);
        let lines = collect("a\rb\nc", symbols);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "a\rb");
    }

    #[test]
    fn multibyte_characters_split_across_reads() {
        let reader = io::BufReader::with_capacity(1, Cursor::new("näme,ü\r€".as_bytes().to_vec()));
        let mut lines = LineSplitter::new(reader, SymbolMapping::default());
        assert_eq!(lines.next_line().unwrap().unwrap().text, "näme,ü");
        assert_eq!(lines.next_line().unwrap().unwrap().text, "€");
        assert!(lines.next_line().unwrap().is_none());
    }

    #[test]
    fn truncated_utf8_is_an_io_error() {
        let mut lines = LineSplitter::new(Cursor::new(vec![b'a', 0xC3]), SymbolMapping::default());
        assert!(matches!(lines.next_line(), Err(CsvError::Io(_))));
    }

    #[test]
    fn cr_only_input_is_split_per_line() {
        let input = (0..1000).map(|i| format!("row {i}")).collect::<Vec<_>>().join("\r");
        let lines = collect(&input, SymbolMapping::default());
        assert_eq!(lines.len(), 1000);
        assert_eq!(lines[999].text, "row 999");
        assert_eq!(lines[999].end_line, 1000);
    }

    #[test]
    fn comment_filter_checks_first_non_whitespace_character() {
        let filter = CommentFilter::new('%', true);
        assert!(filter.is_comment("  % note"));
        assert!(!filter.is_comment("value % not a comment"));
        assert!(!filter.is_comment(""));
        assert!(!CommentFilter::new('%', false).is_comment("% note"));
    }
}
