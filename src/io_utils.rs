//! Upload reading: delimiter resolution, input decoding and CSV readers.
//!
//! The upload path `-` reads from stdin. Delimiters default from the file
//! extension (`.tsv` is tab, anything else comma) unless overridden, and
//! cells are decoded with the requested `encoding_rs` label (UTF-8 when
//! unspecified).

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Decodes delimited upload bytes into string records.
///
/// Headers lose a leading byte-order mark. Every decoding or shape error
/// names the 1-based file line it came from (the header is line 1).
pub struct UploadReader<R: Read> {
    reader: csv::Reader<R>,
    encoding: &'static Encoding,
}

impl UploadReader<Box<dyn Read>> {
    /// Opens `path`, or stdin for `-`.
    pub fn open(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let source: Box<dyn Read> = if is_dash(path) {
            Box::new(std::io::stdin().lock())
        } else {
            Box::new(BufReader::new(
                File::open(path).with_context(|| format!("Opening upload {path:?}"))?,
            ))
        };
        Ok(Self::new(source, delimiter, encoding))
    }
}

impl<R: Read> UploadReader<R> {
    pub fn new(source: R, delimiter: u8, encoding: &'static Encoding) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .double_quote(true)
            .flexible(false)
            .from_reader(source);
        Self { reader, encoding }
    }

    pub fn headers(&mut self) -> Result<Vec<String>> {
        let raw = self
            .reader
            .byte_headers()
            .context("Reading header line")?
            .clone();
        let mut headers = decode_record(&raw, self.encoding, 1)?;
        if let Some(first) = headers.first_mut()
            && let Some(stripped) = first.strip_prefix('\u{feff}')
        {
            *first = stripped.to_string();
        }
        Ok(headers)
    }

    /// Reads the remaining data rows. Ragged rows are rejected.
    pub fn rows(&mut self) -> Result<Vec<Vec<String>>> {
        let encoding = self.encoding;
        self.reader
            .byte_records()
            .enumerate()
            .map(|(idx, record)| {
                let line = idx + 2;
                let record = record.with_context(|| format!("Reading line {line}"))?;
                decode_record(&record, encoding, line)
            })
            .collect()
    }
}

fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
    line: usize,
) -> Result<Vec<String>> {
    record
        .iter()
        .enumerate()
        .map(|(column, bytes)| {
            let (text, _, had_errors) = encoding.decode(bytes);
            if had_errors {
                Err(anyhow!(
                    "Line {line}, column {}: bytes are not valid {}",
                    column + 1,
                    encoding.name()
                ))
            } else {
                Ok(text.into_owned())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn delimiter_defaults_from_extension() {
        assert_eq!(
            resolve_input_delimiter(&PathBuf::from("ops.tsv"), None),
            b'\t'
        );
        assert_eq!(resolve_input_delimiter(&PathBuf::from("ops.csv"), None), b',');
        assert_eq!(
            resolve_input_delimiter(&PathBuf::from("ops.tsv"), Some(b';')),
            b';'
        );
    }

    #[test]
    fn resolve_encoding_accepts_labels() {
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(
            resolve_encoding(Some("latin1")).unwrap().name(),
            "windows-1252"
        );
        assert!(resolve_encoding(Some("klingon")).is_err());
    }

    #[test]
    fn upload_reader_strips_byte_order_mark() {
        let data = "\u{feff}Sales,Date\n1,2023-01-01\n";
        let mut reader = UploadReader::new(data.as_bytes(), b',', UTF_8);
        assert_eq!(reader.headers().unwrap(), vec!["Sales", "Date"]);
        assert_eq!(reader.rows().unwrap(), vec![vec!["1", "2023-01-01"]]);
    }

    #[test]
    fn upload_reader_names_the_failing_line() {
        let data = "Sales,Date\n1,2023-01-01\n2\n";
        let mut reader = UploadReader::new(data.as_bytes(), b',', UTF_8);
        reader.headers().unwrap();
        let err = reader.rows().unwrap_err();
        assert!(format!("{err:#}").contains("line 3"));
    }

    #[test]
    fn upload_reader_decodes_legacy_encodings() {
        let data: &[u8] = b"Supplier\nCaf\xe9\n";
        let latin1 = resolve_encoding(Some("latin1")).unwrap();
        let mut reader = UploadReader::new(data, b',', latin1);
        reader.headers().unwrap();
        assert_eq!(reader.rows().unwrap(), vec![vec!["Café"]]);

        let mut strict = UploadReader::new(data, b',', UTF_8);
        strict.headers().unwrap();
        let err = strict.rows().unwrap_err();
        assert!(err.to_string().contains("Line 2, column 1"));
    }
}
