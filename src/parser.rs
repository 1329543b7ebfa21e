//! arffdata - Lazy ARFF reader
//!
//! [`ArffParser::open`] reads a file in three phases, each with its own
//! file handle that is closed when the phase ends:
//!
//! 1. metadata pre-pass over raw lines ([`crate::metadata::scan`])
//! 2. header parse: relation name and attribute declarations up to `@DATA`
//! 3. validation pass: every data line is checked and decoded once, which
//!    counts the rows and fills the string catalogues
//!
//! After that, rows are served from a [`RowWindow`] of at most
//! `buffer_rows` rows. Asking for a row outside the window reopens the file
//! and decodes the window that starts at that row, so memory stays bounded
//! no matter how large the file is.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Range;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::attribute::{Attribute, Rejection, Value, ATTRIBUTE_KEYWORD, MISSING_TOKEN};
use crate::error::{ArffError, ArffWarning, Result};
use crate::metadata;
use crate::table::{AttributeKey, Table};
use crate::tokenizer::{Token, Tokenizer};
use crate::window::RowWindow;

pub const RELATION_KEYWORD: &str = "@RELATION";
pub const DATA_KEYWORD: &str = "@DATA";

/// Rows decoded per window unless configured otherwise.
pub const DEFAULT_BUFFER_ROWS: usize = 8192;

/// Types that are recognised but not supported; declarations of these are
/// skipped with a warning.
const UNSUPPORTED_TYPES: [&str; 4] = ["INTEGER", "REAL", "DATE", "RELATIONAL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Rows held in memory at once. Zero is treated as one.
    pub buffer_rows: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            buffer_rows: DEFAULT_BUFFER_ROWS,
        }
    }
}

impl ReadOptions {
    pub fn with_buffer_rows(mut self, rows: usize) -> Self {
        self.buffer_rows = rows;
        self
    }
}

/// What the header parse hands to the later phases.
struct Header {
    relation: String,
    attributes: Vec<Attribute>,
    warnings: Vec<ArffWarning>,
    data_offset: usize,
}

/// A validated ARFF file with windowed access to its rows.
#[derive(Debug)]
pub struct ArffParser {
    path: PathBuf,
    relation: String,
    /// Declarations only; they hold catalogues but no rows.
    attributes: Vec<Attribute>,
    metadata: IndexMap<String, String>,
    warnings: Vec<ArffWarning>,
    row_count: usize,
    window: RowWindow,
}

impl ArffParser {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, ReadOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ArffError::NotFound(path.to_path_buf()));
        }
        let path = path.canonicalize()?;

        let metadata = metadata::scan(&path)?;

        let header = {
            let mut tokens = Tokenizer::new(BufReader::new(File::open(&path)?));
            parse_header(&mut tokens)?
        };
        debug!(
            "Parsed header of {}: {} attributes, data at line {}",
            path.display(),
            header.attributes.len(),
            header.data_offset + 1
        );

        let window = RowWindow::new(header.data_offset, header.attributes.len(), options.buffer_rows);
        let mut parser = Self {
            path,
            relation: header.relation,
            attributes: header.attributes,
            metadata,
            warnings: header.warnings,
            row_count: 0,
            window,
        };
        parser.validate()?;
        debug!("Validated {} rows of {}", parser.row_count, parser.path.display());
        Ok(parser)
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Declared attributes, in file order.
    ///
    /// These are header declarations only: names, kinds and nominal labels.
    /// They hold no rows, so their `value_count()` is 0. Read row values
    /// with [`value_for`](Self::value_for) or load them all with
    /// [`into_table`](Self::into_table).
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Declaration of one attribute by index or name. Like
    /// [`attributes`](Self::attributes), it carries no row values.
    pub fn attribute<K: AttributeKey>(&self, key: K) -> Result<&Attribute> {
        let index = self.column(&key)?;
        Ok(&self.attributes[index])
    }

    pub fn metadata(&self) -> &IndexMap<String, String> {
        &self.metadata
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn warnings(&self) -> &[ArffWarning] {
        &self.warnings
    }

    /// Canonical path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn buffer_rows(&self) -> usize {
        self.window.capacity()
    }

    /// Rows currently held in memory.
    pub fn buffered_rows(&self) -> Range<usize> {
        self.window.range()
    }

    /// Value of attribute `key` in data row `row` (0-based).
    pub fn value_for<K: AttributeKey>(&mut self, row: usize, key: K) -> Result<Value> {
        let col = self.column(&key)?;
        let cell = self.cell(row, col)?;
        Ok(self.attributes[col].decode_cell(cell))
    }

    /// Read every row into an in-memory [`Table`].
    pub fn into_table(mut self) -> Result<Table> {
        Table::from_parser(&mut self)
    }

    pub(crate) fn cell(&mut self, row: usize, col: usize) -> Result<f64> {
        if row >= self.row_count {
            return Err(ArffError::OutOfRange {
                index: row,
                len: self.row_count,
            });
        }
        if !self.window.contains(row) {
            self.refill(row)?;
        }
        self.window.cell(row, col).ok_or(ArffError::OutOfRange {
            index: row,
            len: self.window.range().end,
        })
    }

    fn column<K: AttributeKey + ?Sized>(&self, key: &K) -> Result<usize> {
        key.position(&self.attributes)
            .ok_or_else(|| ArffError::NoSuchAttribute(key.describe()))
    }

    /// Tokenizer positioned at the first line after `@DATA`.
    fn open_data(&self) -> Result<Tokenizer<BufReader<File>>> {
        let mut tokens = Tokenizer::new(BufReader::new(File::open(&self.path)?));
        tokens.skip_lines(self.window.data_offset())?;
        Ok(tokens)
    }

    /// Check and decode every data line once. The first window is kept.
    fn validate(&mut self) -> Result<()> {
        let mut tokens = self.open_data()?;
        let mut cells = Vec::with_capacity(self.attributes.len());
        let mut row = 0;
        self.window.reset(0);
        while read_row(&mut tokens, &mut self.attributes, row, true, &mut cells)? {
            if !self.window.is_full() {
                self.window.push_row(&cells);
            }
            row += 1;
        }
        self.row_count = row;
        Ok(())
    }

    /// Replace the window with the rows starting at `start`.
    fn refill(&mut self, start: usize) -> Result<()> {
        let mut tokens = self.open_data()?;
        for _ in 0..start {
            let token = tokens.first_token()?;
            if token == Token::Eof {
                break;
            }
            tokens.push_back(token);
            tokens.skip_rest_of_line()?;
        }

        self.window.reset(start);
        let mut cells = Vec::with_capacity(self.attributes.len());
        let mut row = start;
        while row < self.row_count
            && !self.window.is_full()
            && read_row(&mut tokens, &mut self.attributes, row, false, &mut cells)?
        {
            self.window.push_row(&cells);
            row += 1;
        }
        debug!(
            "Window refilled: rows {}..{} of {}",
            start, row, self.row_count
        );
        Ok(())
    }
}

// ─── Header ─────────────────────────────────────────────────────────────────

fn parse_header<R: BufRead>(tokens: &mut Tokenizer<R>) -> Result<Header> {
    match tokens.first_token()? {
        Token::Word(w) if w.eq_ignore_ascii_case(RELATION_KEYWORD) => {}
        Token::Eof => return Err(ArffError::PrematureEof { line: tokens.line() }),
        other => {
            return Err(ArffError::ExpectedRelationKeyword {
                line: tokens.line(),
                found: other.describe(),
            })
        }
    }
    let relation = name_token(tokens, "relation name")?;
    expect_line_end(tokens)?;

    let mut attributes = Vec::new();
    let mut warnings = Vec::new();
    let data_offset = loop {
        match tokens.first_token()? {
            Token::Word(w) if w.eq_ignore_ascii_case(ATTRIBUTE_KEYWORD) => {
                if let Some(attribute) = parse_attribute(tokens, &mut warnings)? {
                    attributes.push(attribute);
                }
            }
            Token::Word(w) if w.eq_ignore_ascii_case(DATA_KEYWORD) => break tokens.line(),
            Token::Eof => return Err(ArffError::PrematureEof { line: tokens.line() }),
            other => {
                return Err(ArffError::ExpectedDataTag {
                    line: tokens.line(),
                    found: other.describe(),
                })
            }
        }
    };

    if attributes.is_empty() {
        return Err(ArffError::NoAttributesDeclared);
    }
    Ok(Header {
        relation,
        attributes,
        warnings,
        data_offset,
    })
}

/// One `@ATTRIBUTE` line after its keyword. `None` for skipped types.
fn parse_attribute<R: BufRead>(
    tokens: &mut Tokenizer<R>,
    warnings: &mut Vec<ArffWarning>,
) -> Result<Option<Attribute>> {
    let name = name_token(tokens, "attribute name")?;
    let line = tokens.line();

    match tokens.next_required()? {
        Token::Word(type_name) => {
            let upper = type_name.to_uppercase();
            let attribute = match upper.as_str() {
                "NUMERIC" => Some(Attribute::numeric(name, Vec::new())),
                "STRING" => Some(Attribute::string(name, Vec::<String>::new())),
                t if UNSUPPORTED_TYPES.contains(&t) => {
                    let warning = ArffWarning::UnsupportedAttributeType {
                        line,
                        attribute: name,
                        type_name,
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    None
                }
                _ => {
                    return Err(ArffError::UnknownAttributeType {
                        line,
                        attribute: name,
                        type_name,
                    })
                }
            };
            tokens.skip_rest_of_line()?;
            Ok(attribute)
        }
        Token::Punct('{') => {
            let labels = parse_labels(tokens, &name)?;
            expect_line_end(tokens)?;
            Ok(Some(Attribute::declared_nominal(name, labels)))
        }
        _ => Err(ArffError::MalformedEnumeration {
            line,
            attribute: name,
            reason: "'{' expected",
        }),
    }
}

fn parse_labels<R: BufRead>(tokens: &mut Tokenizer<R>, attribute: &str) -> Result<Vec<String>> {
    let mut labels = Vec::new();
    loop {
        match tokens.next_token()? {
            Token::Punct('}') => return Ok(labels),
            Token::Word(label) => labels.push(label),
            Token::Missing => labels.push(MISSING_TOKEN.to_string()),
            Token::Punct(_) => {
                return Err(ArffError::MalformedEnumeration {
                    line: tokens.line(),
                    attribute: attribute.to_string(),
                    reason: "nested '{'",
                })
            }
            // The line counter has already moved past the line end.
            Token::Eol => {
                return Err(ArffError::MalformedEnumeration {
                    line: tokens.line() - 1,
                    attribute: attribute.to_string(),
                    reason: "end of line before '}'",
                })
            }
            Token::Eof => return Err(ArffError::PrematureEof { line: tokens.line() }),
        }
    }
}

fn name_token<R: BufRead>(tokens: &mut Tokenizer<R>, expected: &'static str) -> Result<String> {
    match tokens.next_required()? {
        Token::Word(name) => Ok(name),
        Token::Missing => Ok(MISSING_TOKEN.to_string()),
        other => Err(ArffError::UnexpectedToken {
            line: tokens.line(),
            expected,
            found: other.describe(),
        }),
    }
}

fn expect_line_end<R: BufRead>(tokens: &mut Tokenizer<R>) -> Result<()> {
    match tokens.next_token()? {
        Token::Eol => Ok(()),
        Token::Eof => Err(ArffError::PrematureEof { line: tokens.line() }),
        other => Err(ArffError::ExpectedEndOfLine {
            line: tokens.line(),
            found: other.describe(),
        }),
    }
}

// ─── Data lines ─────────────────────────────────────────────────────────────

/// Decode the next data line into `cells`. `false` at end of file.
///
/// With `validate` set, each token is also checked against
/// [`Attribute::is_valid`] before it is decoded.
fn read_row<R: BufRead>(
    tokens: &mut Tokenizer<R>,
    attributes: &mut [Attribute],
    row: usize,
    validate: bool,
    cells: &mut Vec<f64>,
) -> Result<bool> {
    cells.clear();
    let first = tokens.first_token()?;
    if first == Token::Eof {
        return Ok(false);
    }
    tokens.push_back(first);
    let line = tokens.line();
    let width = attributes.len();

    for (index, attribute) in attributes.iter_mut().enumerate() {
        let cell = match tokens.next_token()? {
            Token::Missing => f64::NAN,
            Token::Word(token) => {
                if validate && !attribute.is_valid(&token) {
                    return Err(ArffError::InvalidValue {
                        line,
                        row,
                        attribute: attribute.name().to_string(),
                        token,
                    });
                }
                match attribute.encode_token(&token) {
                    Ok(cell) => cell,
                    Err(Rejection::NotANumber) => {
                        return Err(ArffError::NotANumber {
                            line,
                            row,
                            attribute: attribute.name().to_string(),
                            token,
                        })
                    }
                    Err(Rejection::UnknownLabel) => {
                        return Err(ArffError::UnknownNominalValue {
                            line,
                            row,
                            attribute: attribute.name().to_string(),
                            token,
                        })
                    }
                }
            }
            Token::Punct(c) => {
                return Err(ArffError::InvalidValue {
                    line,
                    row,
                    attribute: attribute.name().to_string(),
                    token: c.to_string(),
                })
            }
            Token::Eol | Token::Eof => {
                return Err(ArffError::MissingValues {
                    line,
                    row,
                    expected: width,
                    found: index,
                })
            }
        };
        cells.push(cell);
    }

    match tokens.next_token()? {
        Token::Eol | Token::Eof => Ok(true),
        _ => Err(ArffError::TrailingValues {
            line,
            row,
            expected: width,
        }),
    }
}
