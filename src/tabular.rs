//! CSV front-end: turns delimited text into rows of [`Value::Text`] cells
//! that the value types can detect and parse in place.
//!
//! - **Delimiter resolution**: extension-based (`.tsv` → tab, otherwise
//!   comma) unless one is given explicitly.
//! - **Encoding**: fields are read as bytes and decoded via `encoding_rs`,
//!   defaulting to UTF-8.
//! - **Ragged input**: records may differ in length; short rows read as null
//!   cells through the accessors.
//! - **stdin**: the `-` path convention routes through standard input.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::data::Value;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// First record names the columns.
    pub header: bool,
    pub delimiter: Option<u8>,
    /// Record terminator; CRLF/LF when unset.
    pub newline: Option<u8>,
    /// Drop records whose every field is empty.
    pub skip_empty_lines: bool,
    pub encoding: &'static Encoding,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            header: true,
            delimiter: None,
            newline: None,
            skip_empty_lines: true,
            encoding: UTF_8,
        }
    }
}

impl CsvOptions {
    /// Options for reading `path`, resolving the delimiter from its extension
    /// when none is given.
    pub fn for_path(path: &Path, delimiter: Option<u8>, encoding: Option<&str>) -> Result<Self> {
        Ok(Self {
            delimiter: Some(resolve_input_delimiter(path, delimiter)),
            encoding: resolve_encoding(encoding)?,
            ..Self::default()
        })
    }

    fn delimiter(&self) -> u8 {
        self.delimiter.unwrap_or(DEFAULT_CSV_DELIMITER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMeta {
    pub fields: Vec<String>,
    pub delimiter: u8,
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub data: Vec<Vec<Value>>,
    pub meta: ParseMeta,
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

fn open_csv_reader<R: Read>(reader: R, options: &CsvOptions) -> csv::Reader<R> {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(options.delimiter())
        .double_quote(true)
        .flexible(true);
    if let Some(newline) = options.newline {
        builder.terminator(csv::Terminator::Any(newline));
    }
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

fn is_blank_record(record: &csv::ByteRecord) -> bool {
    record.iter().all(<[u8]>::is_empty)
}

fn generated_fields(width: usize) -> Vec<String> {
    (1..=width).map(|n| format!("field_{n}")).collect()
}

/// Pulls decoded records, resolving the header on first use.
struct RecordSource<R: Read> {
    reader: csv::Reader<R>,
    options: CsvOptions,
    fields: Option<Vec<String>>,
    line: usize,
}

impl<R: Read> RecordSource<R> {
    fn new(reader: R, options: &CsvOptions) -> Self {
        Self {
            reader: open_csv_reader(reader, options),
            options: options.clone(),
            fields: None,
            line: 0,
        }
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        let mut record = csv::ByteRecord::new();
        loop {
            let more = self
                .reader
                .read_byte_record(&mut record)
                .with_context(|| format!("Reading CSV record after line {}", self.line))?;
            if !more {
                return Ok(None);
            }
            self.line += 1;
            if self.options.skip_empty_lines && is_blank_record(&record) {
                continue;
            }
            let values = decode_record(&record, self.options.encoding)
                .with_context(|| format!("Decoding CSV record on line {}", self.line))?;
            if self.fields.is_none() {
                if self.options.header {
                    self.fields = Some(values);
                    continue;
                }
                self.fields = Some(generated_fields(values.len()));
            }
            return Ok(Some(values.into_iter().map(Value::Text).collect()));
        }
    }

    fn meta(&self, row_count: usize) -> ParseMeta {
        ParseMeta {
            fields: self.fields.clone().unwrap_or_default(),
            delimiter: self.options.delimiter(),
            row_count,
        }
    }
}

/// Reads the whole input into memory.
pub fn parse_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<ParseResult> {
    let mut source = RecordSource::new(reader, options);
    let mut data = Vec::new();
    while let Some(row) = source.next_row()? {
        data.push(row);
    }
    let mut meta = source.meta(data.len());
    if !options.header {
        // headerless input names columns after the widest record
        let width = data.iter().map(Vec::len).max().unwrap_or(0);
        if width > meta.fields.len() {
            meta.fields = generated_fields(width);
        }
    }
    debug!(
        "Parsed {} row(s) across {} column(s)",
        meta.row_count,
        meta.fields.len()
    );
    Ok(ParseResult { data, meta })
}

/// Delivers rows to `on_chunk` in batches of at most `chunk_size` and returns
/// the metadata of the complete input.
pub fn stream_csv<R, F>(
    reader: R,
    options: &CsvOptions,
    chunk_size: usize,
    mut on_chunk: F,
) -> Result<ParseMeta>
where
    R: Read,
    F: FnMut(Vec<Vec<Value>>, &ParseMeta) -> Result<()>,
{
    let chunk_size = chunk_size.max(1);
    let mut source = RecordSource::new(reader, options);
    let mut chunk = Vec::with_capacity(chunk_size);
    let mut row_count = 0usize;
    while let Some(row) = source.next_row()? {
        chunk.push(row);
        row_count += 1;
        if chunk.len() == chunk_size {
            let meta = source.meta(row_count);
            on_chunk(std::mem::take(&mut chunk), &meta)?;
        }
    }
    let meta = source.meta(row_count);
    if !chunk.is_empty() {
        on_chunk(chunk, &meta)?;
    }
    Ok(meta)
}

/// Parses a file, or stdin for `-`.
pub fn read_table(path: &Path, options: &CsvOptions) -> Result<ParseResult> {
    if is_dash(path) {
        return parse_csv(std::io::stdin().lock(), options).context("Reading CSV from stdin");
    }
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    parse_csv(BufReader::new(file), options)
        .with_context(|| format!("Reading CSV from {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_columns_and_rows_are_text() {
        let input = "name,score\nann,1\nbob,2\n";
        let parsed = parse_csv(input.as_bytes(), &CsvOptions::default()).expect("parse");
        assert_eq!(parsed.meta.fields, vec!["name", "score"]);
        assert_eq!(parsed.meta.row_count, 2);
        assert_eq!(parsed.data[1], vec![Value::from("bob"), Value::from("2")]);
    }

    #[test]
    fn headerless_input_generates_field_names_from_widest_row() {
        let options = CsvOptions {
            header: false,
            ..CsvOptions::default()
        };
        let parsed = parse_csv("1,2\n3,4,5\n".as_bytes(), &options).expect("parse");
        assert_eq!(parsed.meta.fields, vec!["field_1", "field_2", "field_3"]);
        assert_eq!(parsed.data.len(), 2);
    }

    #[test]
    fn blank_records_are_skipped_unless_requested() {
        let input = "a,b\n1,2\n,\n3,4\n";
        let parsed = parse_csv(input.as_bytes(), &CsvOptions::default()).expect("parse");
        assert_eq!(parsed.meta.row_count, 2);

        let keep = CsvOptions {
            skip_empty_lines: false,
            ..CsvOptions::default()
        };
        let parsed = parse_csv(input.as_bytes(), &keep).expect("parse");
        assert_eq!(parsed.meta.row_count, 3);
    }

    #[test]
    fn custom_delimiter_and_newline() {
        let options = CsvOptions {
            delimiter: Some(b';'),
            newline: Some(b'|'),
            ..CsvOptions::default()
        };
        let parsed = parse_csv("a;b|1;2|".as_bytes(), &options).expect("parse");
        assert_eq!(parsed.meta.delimiter, b';');
        assert_eq!(parsed.data, vec![vec![Value::from("1"), Value::from("2")]]);
    }

    #[test]
    fn latin1_input_is_decoded() {
        let options = CsvOptions {
            encoding: resolve_encoding(Some("windows-1252")).expect("encoding"),
            ..CsvOptions::default()
        };
        let bytes = b"city\nM\xfcnchen\n";
        let parsed = parse_csv(&bytes[..], &options).expect("parse");
        assert_eq!(parsed.data[0][0], Value::from("München"));
    }

    #[test]
    fn streaming_delivers_bounded_chunks() {
        let input = "v\n1\n2\n3\n4\n5\n";
        let mut sizes = Vec::new();
        let meta = stream_csv(input.as_bytes(), &CsvOptions::default(), 2, |chunk, meta| {
            assert_eq!(meta.fields, vec!["v"]);
            sizes.push(chunk.len());
            Ok(())
        })
        .expect("stream");
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(meta.row_count, 5);
    }

    #[test]
    fn delimiter_follows_extension() {
        assert_eq!(resolve_input_delimiter(Path::new("x.TSV"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("x.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("x.tsv"), Some(b'|')), b'|');
        assert!(resolve_encoding(Some("klingon")).is_err());
    }
}
