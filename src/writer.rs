//! arffdata - ARFF writer
//!
//! Serialises a [`Table`] as ARFF. [`save`] never leaves a half-written
//! file behind: output goes to `<path>.tmp` and is renamed into place only
//! after everything was written.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ArffError, Result};
use crate::metadata;
use crate::parser::{DATA_KEYWORD, RELATION_KEYWORD};
use crate::table::Table;

pub struct ArffWriter<W: Write> {
    out: W,
    /// Reused Latin-1 encoding buffer.
    line: Vec<u8>,
}

impl<W: Write> ArffWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            line: Vec::with_capacity(256),
        }
    }

    /// Write `table` in full and flush.
    ///
    /// Nothing is written if the table fails [`check_writable`].
    pub fn write_table(&mut self, table: &Table) -> Result<()> {
        let rows = check_writable(table)?;

        for (key, value) in table.metadata() {
            self.write_line(&metadata::format_line(key, value))?;
        }
        self.write_line("")?;
        self.write_line(&format!("{RELATION_KEYWORD} {}", relation_name(table.name())))?;
        for attribute in table.attributes() {
            self.write_line(&attribute.header_line())?;
        }
        self.write_line("")?;
        self.write_line(DATA_KEYWORD)?;

        let mut fields = Vec::with_capacity(table.attribute_count());
        for row in 0..rows {
            fields.clear();
            for attribute in table.attributes() {
                fields.push(attribute.formatted_value_at(row)?);
            }
            self.write_line(&fields.join(","))?;
        }

        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        self.line.clear();
        for ch in text.chars() {
            let code = ch as u32;
            if code > 0xFF {
                return Err(ArffError::Unencodable { character: ch });
            }
            self.line.push(code as u8);
        }
        self.line.push(b'\n');
        self.out.write_all(&self.line)?;
        Ok(())
    }
}

/// Write `table` to `path`.
///
/// Refuses to overwrite the file the table was loaded from. On any failure
/// the temporary file is removed and `path` is left untouched.
pub fn save(table: &Table, path: &Path) -> Result<()> {
    let rows = check_writable(table)?;

    if let Some(source) = table.source() {
        if path.exists() && path.canonicalize()? == source {
            return Err(ArffError::SameFileConflict(path.to_path_buf()));
        }
    }

    let temp = temp_path(path);
    debug!("Writing {} to {}", table.name(), temp.display());
    let result = write_file(table, &temp).and_then(|()| fs::rename(&temp, path).map_err(ArffError::from));
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result?;

    info!(
        "Wrote {} rows x {} attributes to {}",
        rows,
        table.attribute_count(),
        path.display()
    );
    Ok(())
}

/// Row count of `table`, if it can be written as ARFF at all.
///
/// Fails with [`ArffError::IncompleteTable`] when the attributes disagree on
/// their row count, and with [`ArffError::UnwritableMetadata`] when a
/// metadata entry would not read back as the same key and value.
pub fn check_writable(table: &Table) -> Result<usize> {
    let rows = table
        .value_count()
        .ok_or_else(|| ArffError::IncompleteTable(table.name().to_string()))?;

    let breaks_line = |text: &str| text.contains(['\n', '\r']);
    for (key, value) in table.metadata() {
        if key.contains('=') || breaks_line(key) || breaks_line(value) {
            return Err(ArffError::UnwritableMetadata { key: key.clone() });
        }
    }
    Ok(rows)
}

fn write_file(table: &Table, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = ArffWriter::new(BufWriter::new(file));
    writer.write_table(table)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Relation name as written after `@RELATION`; double-quoted when the lexer
/// would otherwise split or reinterpret it.
fn relation_name(name: &str) -> String {
    let needs_quotes = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || (c as u32) < 0x20 || ",%'\"{}\\".contains(c));
    if !needs_quotes {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for ch in name.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, Value};
    use tempfile::tempdir;

    fn sample() -> Table {
        let mut table = Table::new("songs");
        table
            .add_attributes([
                Attribute::numeric("x", [1.0, 2.5]),
                Attribute::nominal_with_labels("y", ["a", "b"], ["a", "b"]).unwrap(),
            ])
            .unwrap();
        table
    }

    fn render(table: &Table) -> Result<String> {
        let mut writer = ArffWriter::new(Vec::new());
        writer.write_table(table)?;
        Ok(String::from_utf8(writer.into_inner()).unwrap())
    }

    #[test]
    fn test_layout_without_metadata() -> Result<()> {
        let mut table = sample();
        table.attribute_mut("y")?.set_value_at(1, Value::Missing)?;
        assert_eq!(
            render(&table)?,
            "\n\
             @RELATION songs\n\
             @ATTRIBUTE 'x' NUMERIC\n\
             @ATTRIBUTE 'y' {'a','b'}\n\n\
             @DATA\n\
             1,'a'\n\
             2.5,?\n"
        );
        Ok(())
    }

    #[test]
    fn test_layout_with_metadata() -> Result<()> {
        let mut table = sample();
        table.set_metadata("source", "/music/track.mp3");
        table.set_metadata("window", "512");
        let text = render(&table)?;
        assert!(text.starts_with(
            "%@source=/music/track.mp3\n%@window=512\n\n@RELATION songs\n@ATTRIBUTE 'x' NUMERIC\n"
        ));
        Ok(())
    }

    #[test]
    fn test_relation_name_quoting() {
        assert_eq!(relation_name("plain_name"), "plain_name");
        assert_eq!(relation_name("two words"), "\"two words\"");
        assert_eq!(relation_name("a,b"), "\"a,b\"");
        assert_eq!(relation_name("say \"x\""), "\"say \\\"x\\\"\"");
        assert_eq!(relation_name(""), "\"\"");
    }

    #[test]
    fn test_incomplete_table_writes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.arff");
        let mut table = Table::new("t");
        table.add_attribute(Attribute::numeric("x", [1.0, 2.0]))?;
        table.add_attribute(Attribute::numeric("y", [3.0, 4.0]))?;
        table.attribute_mut("x")?.append_value(5.0)?;

        assert!(matches!(table.to_arff(&path), Err(ArffError::IncompleteTable(_))));
        assert!(!path.exists());
        assert!(!temp_path(&path).exists());

        assert!(matches!(
            Table::new("empty").to_arff(&path),
            Err(ArffError::IncompleteTable(_))
        ));
        Ok(())
    }

    #[test]
    fn test_unencodable_leaves_no_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.arff");
        let mut table = Table::new("t");
        table.add_attribute(Attribute::string("s", ["price in \u{20ac}"]))?;

        assert!(matches!(
            table.to_arff(&path),
            Err(ArffError::Unencodable { character: '\u{20ac}' })
        ));
        assert!(!path.exists());
        assert!(!temp_path(&path).exists());
        Ok(())
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("songs.arff");

        let mut table = Table::new("my songs");
        table.set_metadata("creator", "unit test");
        table.add_attributes([
            Attribute::numeric("tempo", [120.0, 0.1 + 0.2, f64::NAN, -3.5e-12]),
            Attribute::nominal("mood", ["happy", "sad", "happy", "it's complicated"]),
            Attribute::string("path", ["/a/b.mp3", "C:\\music\\c.mp3", "caf\u{e9}", "x"]),
            Attribute::nominal_from_bools("liked", [true, false, false, true]),
        ])?;
        table.attribute_mut("path")?.set_value_at(3, Value::Missing)?;
        table.to_arff(&path)?;

        let loaded = Table::from_arff(&path)?;
        assert_eq!(loaded.name(), "my songs");
        assert_eq!(loaded.metadata_value("creator"), Some("unit test"));
        assert_eq!(loaded.attribute_names(), ["tempo", "mood", "path", "liked"]);
        assert_eq!(loaded.value_count(), Some(4));
        for original in table.attributes() {
            let copy = loaded.attribute(original.name())?;
            assert_eq!(copy.kind(), original.kind());
            assert_eq!(copy.labels(), original.labels());
            assert_eq!(copy.values(), original.values());
        }
        assert_eq!(
            loaded.attribute("tempo")?.value_at(1)?,
            Value::Number(0.1 + 0.2)
        );
        Ok(())
    }

    #[test]
    fn test_rewrite_is_byte_identical() -> Result<()> {
        let dir = tempdir()?;
        let first = dir.path().join("first.arff");
        let second = dir.path().join("second.arff");

        let mut table = Table::new("r");
        table.add_attributes([
            Attribute::numeric("n", [f64::NAN, 1.0]),
            Attribute::nominal("c", ["a", "b"]),
            Attribute::string("s", ["x", "y"]),
        ])?;
        table.attribute_mut("c")?.set_value_at(0, Value::Missing)?;
        table.attribute_mut("s")?.set_value_at(1, Value::Missing)?;
        table.to_arff(&first)?;

        Table::from_arff(&first)?.to_arff(&second)?;
        assert_eq!(fs::read(&first)?, fs::read(&second)?);
        Ok(())
    }

    #[test]
    fn test_latin1_bytes_on_disk() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("latin.arff");
        let mut table = Table::new("r");
        table.add_attribute(Attribute::string("s", ["\u{e9}"]))?;
        table.to_arff(&path)?;

        let bytes = fs::read(&path)?;
        assert!(bytes.windows(3).any(|w| w == [b'\'', 0xE9, b'\'']));
        Ok(())
    }

    #[test]
    fn test_refuses_to_overwrite_source() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("src.arff");
        sample().to_arff(&path)?;

        let loaded = Table::from_arff(&path)?;
        assert!(matches!(
            loaded.to_arff(&path),
            Err(ArffError::SameFileConflict(_))
        ));
        loaded.to_arff(dir.path().join("copy.arff"))?;
        Ok(())
    }

    #[test]
    fn test_overwrites_existing_target() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.arff");
        fs::write(&path, "old contents")?;
        sample().to_arff(&path)?;
        assert!(fs::read_to_string(&path)?.starts_with("\n@RELATION songs\n"));
        assert!(!temp_path(&path).exists());
        Ok(())
    }

    #[test]
    fn test_metadata_that_would_not_read_back_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.arff");
        let cases = [
            ("note", "line one\nline two"),
            ("note", "carriage\rreturn"),
            ("a=b", "c"),
            ("multi\nline", "v"),
            ("cr\rkey", "v"),
        ];
        for (key, value) in cases {
            let mut table = sample();
            table.set_metadata(key, value);
            match table.to_arff(&path) {
                Err(ArffError::UnwritableMetadata { key: rejected }) => assert_eq!(rejected, key),
                other => panic!("{key:?}={value:?} gave {other:?}"),
            }
            assert!(!path.exists());
            assert!(!temp_path(&path).exists());
            assert!(render(&table).is_err());
        }
        Ok(())
    }

    #[test]
    fn test_metadata_round_trips_verbatim() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("meta.arff");
        let mut table = sample();
        table.set_metadata("formula", "a=b+c");
        table.set_metadata("", "");
        table.set_metadata("spaced key", "  padded value ");
        table.to_arff(&path)?;

        let loaded = Table::from_arff(&path)?;
        let pairs: Vec<(&str, &str)> = loaded
            .metadata()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [("formula", "a=b+c"), ("", ""), ("spaced key", "  padded value ")]
        );
        Ok(())
    }
}
