//! Reading and parsing the CSV input.

use csv::{ReaderBuilder, Trim};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::types::CsvRecord;
use crate::{Result, ScrobbleError};

/// Read the whole input as text.
///
/// A file path takes precedence; without one, standard input is read until
/// end of stream.
pub async fn read_source(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            log::debug!("Reading CSV from {}", path.display());
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ScrobbleError::Read {
                    source_name: path.display().to_string(),
                    source,
                })
        }
        None => {
            log::debug!("Reading CSV from stdin");
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .map_err(|source| ScrobbleError::Read {
                    source_name: "stdin".to_string(),
                    source,
                })?;
            Ok(text)
        }
    }
}

/// Parse CSV text into records.
///
/// With `has_header`, the first row names the columns and every following row
/// becomes a [`CsvRecord::Named`]; otherwise rows are [`CsvRecord::Positional`].
/// Fields are trimmed and blank lines skipped. A row that only holds
/// delimiters is kept, so the resolver reports it. Rows may have differing
/// lengths; short rows are left for the resolver to reject. Any malformed
/// input fails the whole parse.
pub fn parse_records(text: &str, delimiter: u8, has_header: bool) -> Result<Vec<CsvRecord>> {
    let text = strip_field_padding(text, delimiter)?;

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_header)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Option<Vec<String>> = if has_header {
        let headers = reader
            .headers()
            .map_err(|e| ScrobbleError::Parse(format!("Failed to read CSV header: {e}")))?;
        Some(headers.iter().map(str::to_string).collect())
    } else {
        None
    };

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| ScrobbleError::Parse(e.to_string()))?;

        let record = match &headers {
            Some(names) => CsvRecord::Named(
                names
                    .iter()
                    .cloned()
                    .zip(row.iter().map(str::to_string))
                    .collect(),
            ),
            None => CsvRecord::Positional(row.iter().map(str::to_string).collect()),
        };
        records.push(record);
    }

    log::debug!("Parsed {} CSV records", records.len());
    Ok(records)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Drop whitespace at the start of every unquoted field.
///
/// The `csv` reader only opens a quoted field on a quote in the first column
/// of the field, so `a, "b, c"` would otherwise keep its quotes and split on
/// the inner comma. Removing the padding also empties whitespace-only lines,
/// which the reader then skips. Quotes inside an unquoted field stay literal,
/// as the reader treats them.
///
/// The reader runs an unterminated quoted field silently to end of input, so
/// that case is rejected here.
fn strip_field_padding(text: &str, delimiter: u8) -> Result<String> {
    let delimiter = char::from(delimiter);
    let mut out = String::with_capacity(text.len());
    let mut state = Scan::FieldStart;
    let mut line = 1;
    let mut quote_line = 1;

    for c in text.chars() {
        let record_end = c == '\n' || c == '\r';
        if c == '\n' {
            line += 1;
        }

        state = match state {
            Scan::Quoted if c == '"' => Scan::QuoteInQuoted,
            Scan::Quoted => Scan::Quoted,
            Scan::QuoteInQuoted if c == '"' => Scan::Quoted,
            _ if c == delimiter || record_end => Scan::FieldStart,
            Scan::FieldStart if c == ' ' || c == '\t' => continue,
            Scan::FieldStart if c == '"' => {
                quote_line = line;
                Scan::Quoted
            }
            _ => Scan::Unquoted,
        };
        out.push(c);
    }

    if state == Scan::Quoted {
        return Err(ScrobbleError::Parse(format!(
            "unterminated quoted field starting on line {quote_line}"
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positional(fields: &[&str]) -> CsvRecord {
        CsvRecord::Positional(fields.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn test_positional_rows() {
        let records = parse_records("Radiohead,Paranoid Android\nLow,Lullaby\n", b',', false).unwrap();
        assert_eq!(
            records,
            vec![
                positional(&["Radiohead", "Paranoid Android"]),
                positional(&["Low", "Lullaby"]),
            ]
        );
    }

    #[test]
    fn test_header_rows_become_named_records() {
        let records =
            parse_records("Title,Artist\nParanoid Android,Radiohead\n", b',', true).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field("Artist"), Some("Radiohead"));
        assert_eq!(records[0].field("Title"), Some("Paranoid Android"));
    }

    #[test]
    fn test_header_only_input_has_no_records() {
        let records = parse_records("artist,track\n", b',', true).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_blank_lines_are_skipped_and_fields_trimmed() {
        let text = "\n  Radiohead ;  Creep \n\n   \nLow;Words\n";
        let records = parse_records(text, b';', false).unwrap();
        assert_eq!(
            records,
            vec![positional(&["Radiohead", "Creep"]), positional(&["Low", "Words"])]
        );
    }

    #[test]
    fn test_quoted_fields_keep_delimiters() {
        let records = parse_records("Wilco,\"Jesus, Etc.\"\n", b',', false).unwrap();
        assert_eq!(records, vec![positional(&["Wilco", "Jesus, Etc."])]);
    }

    #[test]
    fn test_escaped_quotes_are_balanced() {
        let records = parse_records("Band,\"The \"\"Hit\"\"\"\n", b',', false).unwrap();
        assert_eq!(records, vec![positional(&["Band", "The \"Hit\""])]);
    }

    #[test]
    fn test_short_rows_are_kept() {
        let records = parse_records("Radiohead\nLow,Lullaby\n", b',', false).unwrap();
        assert_eq!(records[0], positional(&["Radiohead"]));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_short_named_row_omits_missing_columns() {
        let records = parse_records("artist,track\nRadiohead\n", b',', true).unwrap();
        assert_eq!(records[0].field("artist"), Some("Radiohead"));
        assert_eq!(records[0].field("track"), None);
    }

    #[test]
    fn test_unterminated_quote_fails_whole_parse() {
        let err = parse_records("Radiohead,Creep\nLow,\"Lullaby\nPortishead,Roads\n", b',', false)
            .unwrap_err();
        match err {
            ScrobbleError::Parse(msg) => assert!(msg.contains("line 2"), "{msg}"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_space_before_quoted_field() {
        let records = parse_records("Radiohead, \"Creep\"\n", b',', false).unwrap();
        assert_eq!(records, vec![positional(&["Radiohead", "Creep"])]);
    }

    #[test]
    fn test_space_before_quoted_field_keeps_inner_delimiter() {
        let records = parse_records("Low, \"Words, Live\"\n", b',', false).unwrap();
        assert_eq!(records, vec![positional(&["Low", "Words, Live"])]);
    }

    #[test]
    fn test_padded_quoted_header() {
        let records =
            parse_records("artist, \"track\"\nLow,  \"Lullaby\" \n", b',', true).unwrap();
        assert_eq!(records[0].field("track"), Some("Lullaby"));
    }

    #[test]
    fn test_delimiter_only_row_is_kept() {
        let records = parse_records("Radiohead,Creep\n,\nLow,Lullaby\n", b',', false).unwrap();
        assert_eq!(
            records,
            vec![
                positional(&["Radiohead", "Creep"]),
                positional(&["", ""]),
                positional(&["Low", "Lullaby"]),
            ]
        );
    }

    #[test]
    fn test_quote_inside_unquoted_field_is_literal() {
        let records =
            parse_records("New Order,Blue Monday 12\" Mix\nLow,Lullaby\n", b',', false).unwrap();
        assert_eq!(
            records,
            vec![
                positional(&["New Order", "Blue Monday 12\" Mix"]),
                positional(&["Low", "Lullaby"]),
            ]
        );
    }

    #[test]
    fn test_quoted_field_may_span_lines() {
        let records = parse_records("Low,\"Words\nLive\"\nLow,Lullaby\n", b',', false).unwrap();
        assert_eq!(
            records,
            vec![positional(&["Low", "Words\nLive"]), positional(&["Low", "Lullaby"])]
        );
    }

    #[test]
    fn test_space_delimiter_is_not_stripped() {
        let records = parse_records("Low Lullaby\n", b' ', false).unwrap();
        assert_eq!(records, vec![positional(&["Low", "Lullaby"])]);
    }

    #[test]
    fn test_tab_delimiter() {
        let records = parse_records("Radiohead\tCreep\n", b'\t', false).unwrap();
        assert_eq!(records, vec![positional(&["Radiohead", "Creep"])]);
    }

    #[tokio::test]
    async fn test_read_source_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        std::fs::write(&path, "Radiohead,Creep\n").unwrap();

        let text = read_source(Some(&path)).await.unwrap();
        assert_eq!(text, "Radiohead,Creep\n");
    }

    #[tokio::test]
    async fn test_read_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");

        match read_source(Some(&path)).await {
            Err(ScrobbleError::Read { source_name, .. }) => {
                assert!(source_name.ends_with("missing.csv"))
            }
            other => panic!("expected read error, got {other:?}"),
        }
    }
}
