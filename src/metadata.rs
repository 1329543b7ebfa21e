//! arffdata - `%@key=value` metadata lines
//!
//! ARFF has no place for free-form attributes of a relation, so they are
//! stored as comment lines of the form `%@key=value` ahead of `@DATA`.
//! Plain ARFF readers skip them as comments; [`scan`] reads them back.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{ArffError, Result};

/// Prefix that marks a comment line as metadata.
pub const METADATA_PREFIX: &str = "%@";

struct MetadataLine {
    pattern: Regex,
}

impl MetadataLine {
    fn new() -> Self {
        Self {
            pattern: Regex::new(r"^%@([^=]*)=(.*)$").expect("valid regex: metadata line"),
        }
    }

    fn parse(&self, line: usize, text: &str) -> Result<(String, String)> {
        let caps = self
            .pattern
            .captures(text)
            .ok_or_else(|| ArffError::MalformedMetadata {
                line,
                text: text.to_string(),
            })?;
        Ok((caps[1].to_string(), caps[2].to_string()))
    }
}

/// Collect the metadata lines of the header at `path`.
///
/// Reading stops at the first line whose trimmed text starts with `@DATA`,
/// in any case. Later keys overwrite earlier ones but keep their position.
pub fn scan(path: &Path) -> Result<IndexMap<String, String>> {
    let mut reader = BufReader::new(File::open(path)?);
    scan_reader(&mut reader)
}

pub(crate) fn scan_reader<R: BufRead>(reader: &mut R) -> Result<IndexMap<String, String>> {
    let matcher = MetadataLine::new();
    let mut metadata = IndexMap::new();
    let mut raw = Vec::new();
    let mut line = 0;

    while read_line(reader, &mut raw)? {
        line += 1;
        let text: String = raw.iter().map(|&b| b as char).collect();

        if text.trim_start().to_uppercase().starts_with("@DATA") {
            break;
        }
        if text.starts_with(METADATA_PREFIX) {
            let (key, value) = matcher.parse(line, &text)?;
            metadata.insert(key, value);
        }
    }
    Ok(metadata)
}

/// Read the next line into `raw` without its terminator.
///
/// `\n`, `\r\n` and a lone `\r` each end one line, as in the tokenizer.
/// Returns `false` at end of input.
fn read_line<R: BufRead>(reader: &mut R, raw: &mut Vec<u8>) -> Result<bool> {
    raw.clear();
    let mut read_any = false;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(read_any);
        }
        read_any = true;
        match available.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(end) => {
                let terminator = available[end];
                raw.extend_from_slice(&available[..end]);
                reader.consume(end + 1);
                if terminator == b'\r' && reader.fill_buf()?.first() == Some(&b'\n') {
                    reader.consume(1);
                }
                return Ok(true);
            }
            None => {
                let len = available.len();
                raw.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
}

/// A metadata line as written by the writer.
pub fn format_line(key: &str, value: &str) -> String {
    format!("{METADATA_PREFIX}{key}={value}")
}
