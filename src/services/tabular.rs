//! Minimal RFC 4180 reader shared by the question manifest and student roster imports.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnterminatedQuote {
    pub(crate) line: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Record {
    /// 1-based line the record starts on.
    pub(crate) line: usize,
    pub(crate) fields: Vec<String>,
}

impl Record {
    /// Trimmed field value, `None` when absent or blank.
    pub(crate) fn field(&self, col: usize) -> Option<&str> {
        self.fields.get(col).map(|value| value.trim()).filter(|value| !value.is_empty())
    }
}

/// Header positions keyed by normalized name (lowercase, no whitespace or `_`).
pub(crate) struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    pub(crate) fn from_header(header: &[String]) -> Self {
        let index = header
            .iter()
            .enumerate()
            .map(|(position, name)| (normalize_header(name), position))
            .collect();
        Self { index }
    }

    pub(crate) fn has(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn get(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }
}

pub(crate) fn normalize_header(name: &str) -> String {
    name.chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Splits CSV text into records. Quoted fields may hold commas, doubled
/// quotes and line breaks. Blank lines are skipped.
pub(crate) fn split_records(text: &str) -> Result<Vec<Record>, UnterminatedQuote> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut record_line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut buf)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut buf));
                push_record(&mut records, record_line, std::mem::take(&mut fields));
                line += 1;
                record_line = line;
            }
            '\n' => {
                buf.push('\n');
                line += 1;
            }
            other => buf.push(other),
        }
    }

    if in_quotes {
        return Err(UnterminatedQuote { line: record_line });
    }
    fields.push(buf);
    push_record(&mut records, record_line, fields);

    Ok(records)
}

fn push_record(records: &mut Vec<Record>, line: usize, fields: Vec<String>) {
    if fields.iter().all(|field| field.trim().is_empty()) {
        return;
    }
    records.push(Record { line, fields });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_and_quoted_fields() {
        let records = split_records("a,\"b,c\",\"d \"\"e\"\"\"\r\nf,g,h").expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields, vec!["a", "b,c", "d \"e\""]);
        assert_eq!(records[1].line, 2);
        assert_eq!(records[1].field(2), Some("h"));
    }

    #[test]
    fn strips_bom_and_skips_blank_lines() {
        let records = split_records("\u{feff}Full Name,IdNumber\n\n , \nAbebe,UGR/1\n").expect("ok");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields[0], "Full Name");
        assert_eq!(records[1].line, 4);
    }

    #[test]
    fn header_normalization() {
        let columns = Columns::from_header(&[" Full Name ".to_string(), "ID_Number".to_string()]);
        assert_eq!(columns.get("fullname"), Some(0));
        assert_eq!(columns.get("idnumber"), Some(1));
        assert!(!columns.has("gender"));
    }
}
