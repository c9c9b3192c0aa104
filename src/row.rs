use std::mem;

use crate::config::SymbolMapping;
use crate::line::{Lexeme, LogicalLine, QuoteLexer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    fields: Vec<String>,
    line: usize,
    end_line: usize,
}

impl Row {
    pub fn new(fields: Vec<String>, line: usize, end_line: usize) -> Self {
        Self {
            fields,
            line,
            end_line,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    pub fn line_number(&self) -> usize {
        self.line
    }

    pub fn end_line_number(&self) -> usize {
        self.end_line
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[derive(Debug, Clone)]
pub struct RowTokenizer {
    symbols: SymbolMapping,
}

impl RowTokenizer {
    pub fn new(symbols: SymbolMapping) -> Self {
        Self { symbols }
    }

    pub fn tokenize(&self, line: &LogicalLine) -> Row {
        Row::new(self.split(&line.text), line.start_line, line.end_line)
    }

    /// Splits one logical line on unquoted, unescaped separators. Enclosing
    /// quotes are stripped and escapes resolved; an empty line is a single
    /// empty field.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars = text.chars().collect::<Vec<_>>();
        let mut lexer = QuoteLexer::new(&self.symbols);
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut idx = 0;
        while idx < chars.len() {
            let next = chars.get(idx + 1).copied();
            let (lexeme, consumed_next) = lexer.feed(chars[idx], next);
            match lexeme {
                Lexeme::Text(ch) => current.push(ch),
                Lexeme::Separator => fields.push(mem::take(&mut current)),
                Lexeme::QuoteBoundary => {}
            }
            idx += if consumed_next { 2 } else { 1 };
        }
        fields.push(current);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<String> {
        RowTokenizer::new(SymbolMapping::default()).split(text)
    }

    #[test]
    fn quoted_separator_stays_in_field() {
        assert_eq!(split("\"a,b\",c"), vec!["a,b", "c"]);
    }

    #[test]
    fn doubled_quote_is_literal_quote() {
        assert_eq!(split("\"say \"\"hi\"\"\",x"), vec!["say \"hi\"", "x"]);
        assert_eq!(split("\"\",x"), vec!["", "x"]);
    }

    #[test]
    fn mid_field_quotes_are_preserved() {
        assert_eq!(split("5\" disk,12\"x"), vec!["5\" disk", "12\"x"]);
        assert_eq!(split("\"ab\"cd\",e"), vec!["ab\"cd", "e"]);
    }

    #[test]
    fn trailing_separator_yields_empty_field() {
        assert_eq!(split("a,b,"), vec!["a", "b", ""]);
        assert_eq!(split(""), vec![""]);
    }

    #[test]
    fn backslash_escape_outside_and_inside_quotes() {
        let symbols = SymbolMapping::default().with_escape('\\');
        let tokenizer = RowTokenizer::new(symbols);
        assert_eq!(tokenizer.split("a\\,b,c"), vec!["a,b", "c"]);
        assert_eq!(tokenizer.split("\"x \\\" y\",z"), vec!["x \" y", "z"]);
        assert_eq!(tokenizer.split("\"p\\\\\",q"), vec!["p\\", "q"]);
        assert_eq!(tokenizer.split("c:\\dir"), vec!["c:\\dir"]);
    }

    #[test]
    fn custom_quote_and_separator() {
        let symbols = SymbolMapping::default()
            .with_separator(';')
            .with_quote('\'');
        let tokenizer = RowTokenizer::new(symbols);
        assert_eq!(
            tokenizer.split("'a;b';'it''s'"),
            vec!["a;b".to_string(), "it's".to_string()]
        );
    }

    #[test]
    fn tokenize_keeps_line_span() {
        let line = LogicalLine {
            text: "\"line 1\nline 2\",x".to_string(),
            start_line: 3,
            end_line: 4,
            comment: false,
            unterminated: false,
        };
        let row = RowTokenizer::new(SymbolMapping::default()).tokenize(&line);
        assert_eq!(row.fields(), &["line 1\nline 2".to_string(), "x".to_string()]);
        assert_eq!(row.line_number(), 3);
        assert_eq!(row.end_line_number(), 4);
    }
}
