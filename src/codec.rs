//! CSV text to header and string rows, and back.
//!
//! The first record is the header. Blank lines are skipped, short lines are
//! padded with empty cells and lines carrying more cells than the header are
//! reported as parse errors.

use csv::{ReaderBuilder, Terminator, WriterBuilder};
use tracing::{debug, trace};

use crate::domain::BrowseError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCsv {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn parse(text: &str) -> Result<ParsedCsv, BrowseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(|e| BrowseError::ParseFailed(e.to_string()))?,
        None => return Err(BrowseError::ParseFailed("File contains no header row".into())),
    };
    let fields = unique_field_names(header.iter());
    let nfields = fields.len();

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| BrowseError::ParseFailed(e.to_string()))?;
        if record.len() > nfields {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(BrowseError::ParseFailed(format!(
                "Too many fields on line {line}: expected {nfields} fields but parsed {}",
                record.len()
            )));
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(nfields, String::new());
        rows.push(row);
    }

    debug!("Parsed {} rows with {} fields", rows.len(), nfields);
    Ok(ParsedCsv { fields, rows })
}

pub fn serialize<S: AsRef<str>>(fields: &[String], rows: &[Vec<S>]) -> Result<String, BrowseError> {
    let mut writer = writer();
    writer.write_record(fields)?;
    for row in rows {
        writer.write_record(row.iter().map(|c| c.as_ref()))?;
    }
    let text = finish(writer)?;
    trace!("Serialized {} rows into {} bytes", rows.len(), text.len());
    Ok(text)
}

/// A single record without line terminator, quoted like `serialize` does.
pub fn serialize_record<S: AsRef<str>>(cells: &[S]) -> Result<String, BrowseError> {
    let mut writer = writer();
    writer.write_record(cells.iter().map(|c| c.as_ref()))?;
    let mut text = finish(writer)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

fn writer() -> csv::Writer<Vec<u8>> {
    WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, BrowseError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| BrowseError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| BrowseError::ParseFailed(e.to_string()))
}

// Repeated header names get a numeric suffix so every field id stays unique.
fn unique_field_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for name in names {
        let mut candidate = name.to_string();
        let mut n = 1;
        while fields.contains(&candidate) {
            candidate = format!("{name}_{n}");
            n += 1;
        }
        fields.push(candidate);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_blank_lines_and_pads_short_rows() {
        let parsed = parse("name,age,city\nBob,30,Oslo\n\nAmy,9\n").unwrap();
        assert_eq!(parsed.fields, vec!["name", "age", "city"]);
        assert_eq!(
            parsed.rows,
            vec![
                vec!["Bob".to_string(), "30".into(), "Oslo".into()],
                vec!["Amy".to_string(), "9".into(), "".into()],
            ]
        );
    }

    #[test]
    fn parse_rejects_rows_with_extra_fields() {
        let err = parse("a,b\n1,2\n1,2,3\n").unwrap_err();
        match err {
            BrowseError::ParseFailed(msg) => {
                assert!(msg.contains("line 3"), "{msg}");
                assert!(msg.contains("expected 2 fields but parsed 3"), "{msg}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn record_is_quoted_like_an_export() {
        let cells = ["Dee, Jr.", " padded ", "say \"hi\"", "plain"];
        let record = serialize_record(&cells[..]).unwrap();
        assert_eq!(record, "\"Dee, Jr.\", padded ,\"say \"\"hi\"\"\",plain");

        let fields = vec!["a".to_string(), "b".into(), "c".into(), "d".into()];
        let export = serialize(&fields, &[cells.to_vec()]).unwrap();
        assert_eq!(export.lines().nth(1), Some(record.as_str()));
    }

    #[test]
    fn parse_empty_input_is_an_error() {
        assert!(matches!(parse(""), Err(BrowseError::ParseFailed(_))));
    }

    #[test]
    fn parse_handles_bom_quotes_and_duplicate_headers() {
        let parsed = parse("\u{feff}id,id,note\n1,2,\"hello, world\"\n").unwrap();
        assert_eq!(parsed.fields, vec!["id", "id_1", "note"]);
        assert_eq!(parsed.rows[0][2], "hello, world");
    }

    #[test]
    fn serialize_quotes_where_needed() {
        let fields = vec!["name".to_string(), "note".to_string()];
        let rows = vec![vec!["Bob", "likes \"tea\", mostly"], vec!["Amy", ""]];
        let text = serialize(&fields, &rows).unwrap();
        assert_eq!(text, "name,note\nBob,\"likes \"\"tea\"\", mostly\"\nAmy,\n");
        let back = parse(&text).unwrap();
        assert_eq!(back.rows[0][1], "likes \"tea\", mostly");
        assert_eq!(back.rows[1][1], "");
    }
}
