//! arffdata - Error taxonomy
//!
//! Every parse-time error is fatal to the call that raised it and carries
//! the line, row, token or attribute needed to act on it. Non-fatal
//! findings travel as [`ArffWarning`] instead.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::attribute::AttributeKind;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArffError>;

#[derive(Debug, Error)]
pub enum ArffError {
    #[error("not a regular file: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ─── Header grammar ────────────────────────────────────────────────────
    #[error("line {line}: missing \"=\" in metadata line: {text}")]
    MalformedMetadata { line: usize, text: String },

    #[error("line {line}: keyword @RELATION expected, read '{found}'")]
    ExpectedRelationKeyword { line: usize, found: String },

    #[error("line {line}: keyword @DATA expected, read '{found}'")]
    ExpectedDataTag { line: usize, found: String },

    #[error("line {line}: premature end of file")]
    PrematureEof { line: usize },

    #[error("line {line}: premature end of line")]
    PrematureEol { line: usize },

    #[error("line {line}: end of line expected, read '{found}'")]
    ExpectedEndOfLine { line: usize, found: String },

    #[error("line {line}: {expected} expected, read '{found}'")]
    UnexpectedToken {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: malformed enumeration for '{attribute}': {reason}")]
    MalformedEnumeration {
        line: usize,
        attribute: String,
        reason: &'static str,
    },

    #[error("line {line}: unknown type '{type_name}' for attribute '{attribute}'")]
    UnknownAttributeType {
        line: usize,
        attribute: String,
        type_name: String,
    },

    #[error("no attributes declared")]
    NoAttributesDeclared,

    // ─── Data section ──────────────────────────────────────────────────────
    #[error("line {line}: invalid value '{token}' for attribute '{attribute}' in row {row}")]
    InvalidValue {
        line: usize,
        row: usize,
        attribute: String,
        token: String,
    },

    #[error("line {line}: nominal value '{token}' not declared in header of '{attribute}' (row {row})")]
    UnknownNominalValue {
        line: usize,
        row: usize,
        attribute: String,
        token: String,
    },

    #[error("line {line}: number expected for '{attribute}', read '{token}' (row {row})")]
    NotANumber {
        line: usize,
        row: usize,
        attribute: String,
        token: String,
    },

    #[error("line {line}: row {row} has {found} of {expected} values")]
    MissingValues {
        line: usize,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: row {row} has more than {expected} values")]
    TrailingValues {
        line: usize,
        row: usize,
        expected: usize,
    },

    // ─── In-memory model ───────────────────────────────────────────────────
    #[error("{attribute}: value count ({found}) does not match previously added attributes ({expected})")]
    RowCountMismatch {
        attribute: String,
        expected: usize,
        found: usize,
    },

    #[error("no such attribute: {0}")]
    NoSuchAttribute(String),

    #[error("attribute '{attribute}' is {found}, not {expected}")]
    WrongAttributeKind {
        attribute: String,
        expected: AttributeKind,
        found: AttributeKind,
    },

    #[error("index {index} out of range for {len} values")]
    OutOfRange { index: usize, len: usize },

    #[error("'{value}' is not an accepted value of nominal attribute '{attribute}'")]
    InvalidNominalValue { attribute: String, value: String },

    #[error("attribute '{attribute}' cannot hold a {found} value")]
    TypeMismatch {
        attribute: String,
        found: &'static str,
    },

    // ─── Writer ────────────────────────────────────────────────────────────
    #[error("illegal value count in table '{0}'")]
    IncompleteTable(String),

    #[error("metadata entry '{key}' cannot be written: keys may not contain '=' or line breaks, values may not contain line breaks")]
    UnwritableMetadata { key: String },

    #[error("cannot write to the file the table was read from: {}", .0.display())]
    SameFileConflict(PathBuf),

    #[error("character {character:?} cannot be written as Latin-1")]
    Unencodable { character: char },
}

/// Non-fatal findings raised while reading a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArffWarning {
    /// A recognised type (`INTEGER`, `REAL`, `DATE`, `RELATIONAL`) that this
    /// crate does not handle. The attribute is left out of the table.
    UnsupportedAttributeType {
        line: usize,
        attribute: String,
        type_name: String,
    },
}

impl fmt::Display for ArffWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArffWarning::UnsupportedAttributeType {
                line,
                attribute,
                type_name,
            } => write!(
                f,
                "line {line}: attribute '{attribute}' of type {type_name} is not supported and was skipped"
            ),
        }
    }
}
