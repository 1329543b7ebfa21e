//! arffdata - Typed columns
//!
//! An [`Attribute`] is one named column of a [`crate::Table`]. Its values
//! live in one of three column variants:
//!
//! - **Numeric**: `f64` per row, NaN marks a missing cell
//! - **Nominal**: index into an ordered label [`Catalogue`]
//! - **String**: index into a per-attribute interning [`Catalogue`]
//!
//! Callers never see the NaN / absent-index encodings directly: every read
//! goes through [`Value`], where a missing cell is [`Value::Missing`].

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::{ArffError, Result};

/// Token that denotes a missing value in the data section.
pub const MISSING_TOKEN: &str = "?";

/// Keyword that opens an attribute declaration.
pub const ATTRIBUTE_KEYWORD: &str = "@ATTRIBUTE";

/// The three supported column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Numeric,
    Nominal,
    String,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeKind::Numeric => "numeric",
            AttributeKind::Nominal => "nominal",
            AttributeKind::String => "string",
        })
    }
}

// ─── Value ──────────────────────────────────────────────────────────────────

/// A single cell, independent of how the column stores it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the cell. A missing cell reads as NaN, the way the
    /// file format encodes it.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Missing => Some(f64::NAN),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "numeric",
            Value::Text(_) => "text",
            Value::Missing => "missing",
        }
    }
}

impl From<f64> for Value {
    /// NaN becomes [`Value::Missing`].
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Value::Missing
        } else {
            Value::Number(v)
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => f.write_str(&format_number(*v)),
            Value::Text(s) => f.write_str(s),
            Value::Missing => f.write_str(MISSING_TOKEN),
        }
    }
}

// ─── Catalogue ──────────────────────────────────────────────────────────────

/// Ordered, de-duplicated list of labels with O(1) reverse lookup.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    labels: Vec<String>,
    positions: HashMap<String, u32>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from labels in order, dropping repeats.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalogue = Self::new();
        for label in labels {
            catalogue.intern(label.as_ref());
        }
        catalogue
    }

    /// Index of `label`, appending it first if unseen.
    pub fn intern(&mut self, label: &str) -> u32 {
        if let Some(&index) = self.positions.get(label) {
            return index;
        }
        let index = self.labels.len() as u32;
        self.labels.push(label.to_string());
        self.positions.insert(label.to_string(), index);
        index
    }

    pub fn position(&self, label: &str) -> Option<u32> {
        self.positions.get(label).copied()
    }

    pub fn position_ignore_case(&self, label: &str) -> Option<u32> {
        if let Some(index) = self.position(label) {
            return Some(index);
        }
        let wanted = label.to_lowercase();
        self.labels
            .iter()
            .position(|l| l.to_lowercase() == wanted)
            .map(|i| i as u32)
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.labels.get(index as usize).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ─── Attribute ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Column {
    Numeric(Vec<f64>),
    Nominal {
        labels: Catalogue,
        /// A closed catalogue rejects labels it does not already hold.
        closed: bool,
        values: Vec<Option<u32>>,
    },
    String {
        pool: Catalogue,
        values: Vec<Option<u32>>,
    },
}

/// One named, typed column.
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    column: Column,
}

/// Why a data token could not be turned into a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    NotANumber,
    UnknownLabel,
}

impl Attribute {
    pub fn numeric<S, I>(name: S, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = f64>,
    {
        Self {
            name: name.into(),
            column: Column::Numeric(values.into_iter().collect()),
        }
    }

    /// Nominal attribute whose catalogue grows with every new label.
    pub fn nominal<S, I, V>(name: S, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let mut labels = Catalogue::new();
        let values = values
            .into_iter()
            .map(|v| Some(labels.intern(v.as_ref())))
            .collect();
        Self {
            name: name.into(),
            column: Column::Nominal {
                labels,
                closed: false,
                values,
            },
        }
    }

    /// Nominal attribute restricted to `labels`.
    ///
    /// Fails with [`ArffError::InvalidNominalValue`] on the first value that
    /// is not one of the labels.
    pub fn nominal_with_labels<S, L, LS, I, V>(name: S, labels: L, values: I) -> Result<Self>
    where
        S: Into<String>,
        L: IntoIterator<Item = LS>,
        LS: AsRef<str>,
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let mut attribute = Self::declared_nominal(name, labels);
        for value in values {
            attribute.append_value(value.as_ref())?;
        }
        Ok(attribute)
    }

    /// Nominal attribute over the labels `true` and `false`.
    pub fn nominal_from_bools<S, I>(name: S, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = bool>,
    {
        let values = values
            .into_iter()
            .map(|b| Some(if b { 0 } else { 1 }))
            .collect();
        Self {
            name: name.into(),
            column: Column::Nominal {
                labels: Catalogue::from_labels(["true", "false"]),
                closed: true,
                values,
            },
        }
    }

    pub fn string<S, I, V>(name: S, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let mut pool = Catalogue::new();
        let values = values
            .into_iter()
            .map(|v| Some(pool.intern(v.as_ref())))
            .collect();
        Self {
            name: name.into(),
            column: Column::String { pool, values },
        }
    }

    /// Closed nominal attribute with no rows, as declared in a file header.
    pub(crate) fn declared_nominal<S, L, LS>(name: S, labels: L) -> Self
    where
        S: Into<String>,
        L: IntoIterator<Item = LS>,
        LS: AsRef<str>,
    {
        Self {
            name: name.into(),
            column: Column::Nominal {
                labels: Catalogue::from_labels(labels),
                closed: true,
                values: Vec::new(),
            },
        }
    }

    /// Same name, type and catalogue, but no rows.
    pub(crate) fn empty_like(&self) -> Self {
        let column = match &self.column {
            Column::Numeric(_) => Column::Numeric(Vec::new()),
            Column::Nominal { labels, closed, .. } => Column::Nominal {
                labels: labels.clone(),
                closed: *closed,
                values: Vec::new(),
            },
            Column::String { pool, .. } => Column::String {
                pool: pool.clone(),
                values: Vec::new(),
            },
        };
        Self {
            name: self.name.clone(),
            column,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AttributeKind {
        match self.column {
            Column::Numeric(_) => AttributeKind::Numeric,
            Column::Nominal { .. } => AttributeKind::Nominal,
            Column::String { .. } => AttributeKind::String,
        }
    }

    pub fn value_count(&self) -> usize {
        match &self.column {
            Column::Numeric(values) => values.len(),
            Column::Nominal { values, .. } | Column::String { values, .. } => values.len(),
        }
    }

    /// Catalogue of a nominal attribute.
    pub fn labels(&self) -> Option<&[String]> {
        match &self.column {
            Column::Nominal { labels, .. } => Some(labels.labels()),
            _ => None,
        }
    }

    /// Position of `label` in a nominal catalogue (exact match).
    pub fn label_index(&self, label: &str) -> Option<usize> {
        match &self.column {
            Column::Nominal { labels, .. } => labels.position(label).map(|i| i as usize),
            _ => None,
        }
    }

    pub fn value_at(&self, row: usize) -> Result<Value> {
        let len = self.value_count();
        if row >= len {
            return Err(ArffError::OutOfRange { index: row, len });
        }
        Ok(match &self.column {
            Column::Numeric(values) => Value::from(values[row]),
            Column::Nominal { labels, values, .. } => resolve(labels, values[row]),
            Column::String { pool, values } => resolve(pool, values[row]),
        })
    }

    pub fn values(&self) -> Vec<Value> {
        (0..self.value_count())
            .filter_map(|row| self.value_at(row).ok())
            .collect()
    }

    /// Raw numbers of a numeric attribute; missing cells are NaN.
    pub fn numbers(&self) -> Option<&[f64]> {
        match &self.column {
            Column::Numeric(values) => Some(values),
            _ => None,
        }
    }

    /// Labels of a nominal or string attribute, `None` per missing cell.
    pub fn texts(&self) -> Option<Vec<Option<&str>>> {
        let (catalogue, values) = match &self.column {
            Column::Nominal { labels, values, .. } => (labels, values),
            Column::String { pool, values } => (pool, values),
            Column::Numeric(_) => return None,
        };
        Some(
            values
                .iter()
                .map(|index| index.and_then(|i| catalogue.get(i)))
                .collect(),
        )
    }

    pub fn set_value_at(&mut self, row: usize, value: impl Into<Value>) -> Result<()> {
        let len = self.value_count();
        if row >= len {
            return Err(ArffError::OutOfRange { index: row, len });
        }
        self.put(row, value.into())
    }

    pub fn append_value(&mut self, value: impl Into<Value>) -> Result<()> {
        let row = self.value_count();
        self.put(row, value.into())
    }

    /// Store `value` at `row`; `row == value_count()` appends.
    fn put(&mut self, row: usize, value: Value) -> Result<()> {
        let Attribute { name, column } = self;
        let found = value.variant_name();
        let mismatch = |name: &str| ArffError::TypeMismatch {
            attribute: name.to_string(),
            found,
        };
        match column {
            Column::Numeric(values) => {
                let number = match value {
                    Value::Number(v) => v,
                    Value::Missing => f64::NAN,
                    Value::Text(_) => return Err(mismatch(name)),
                };
                store(values, row, number);
            }
            Column::Nominal {
                labels,
                closed,
                values,
            } => {
                let index = match value {
                    Value::Missing => None,
                    Value::Text(label) => match labels.position(&label) {
                        Some(index) => Some(index),
                        None if !*closed => Some(labels.intern(&label)),
                        None => {
                            return Err(ArffError::InvalidNominalValue {
                                attribute: name.clone(),
                                value: label,
                            })
                        }
                    },
                    Value::Number(_) => return Err(mismatch(name)),
                };
                store(values, row, index);
            }
            Column::String { pool, values } => {
                let index = match value {
                    Value::Missing => None,
                    Value::Text(text) => Some(pool.intern(&text)),
                    Value::Number(_) => return Err(mismatch(name)),
                };
                store(values, row, index);
            }
        }
        Ok(())
    }

    /// Type part of the header line: `NUMERIC`, `STRING` or `{'a','b'}`.
    pub fn type_str(&self) -> String {
        match &self.column {
            Column::Numeric(_) => "NUMERIC".to_string(),
            Column::String { .. } => "STRING".to_string(),
            Column::Nominal { labels, .. } => {
                let list: Vec<String> = labels.labels().iter().map(|l| quote(l)).collect();
                format!("{{{}}}", list.join(","))
            }
        }
    }

    pub fn header_line(&self) -> String {
        format!("{} {} {}", ATTRIBUTE_KEYWORD, quote(&self.name), self.type_str())
    }

    /// The cell as written in a data line.
    ///
    /// Missing nominal and string cells render as a bare `?`; a missing
    /// numeric cell prints its NaN.
    pub fn formatted_value_at(&self, row: usize) -> Result<String> {
        let len = self.value_count();
        if row >= len {
            return Err(ArffError::OutOfRange { index: row, len });
        }
        Ok(match &self.column {
            Column::Numeric(values) => format_number(values[row]),
            Column::Nominal { labels, values, .. } => format_label(labels, values[row]),
            Column::String { pool, values } => format_label(pool, values[row]),
        })
    }

    /// Whether `token` would be accepted in this attribute's column.
    pub fn is_valid(&self, token: &str) -> bool {
        if token == MISSING_TOKEN {
            return true;
        }
        match &self.column {
            Column::Numeric(_) => token.parse::<f64>().is_ok(),
            Column::Nominal { labels, .. } => labels.position_ignore_case(token).is_some(),
            Column::String { .. } => true,
        }
    }

    /// Turn a data token into a buffer cell. String tokens are interned.
    pub(crate) fn encode_token(&mut self, token: &str) -> std::result::Result<f64, Rejection> {
        match &mut self.column {
            Column::Numeric(_) if token == MISSING_TOKEN => Ok(f64::NAN),
            Column::Numeric(_) => token.parse::<f64>().map_err(|_| Rejection::NotANumber),
            Column::Nominal { labels, .. } => labels
                .position(token)
                .map(f64::from)
                .ok_or(Rejection::UnknownLabel),
            Column::String { pool, .. } => Ok(f64::from(pool.intern(token))),
        }
    }

    pub(crate) fn decode_cell(&self, cell: f64) -> Value {
        match &self.column {
            Column::Numeric(_) => Value::from(cell),
            Column::Nominal { labels, .. } => resolve(labels, cell_index(cell)),
            Column::String { pool, .. } => resolve(pool, cell_index(cell)),
        }
    }

    pub(crate) fn push_cell(&mut self, cell: f64) {
        match &mut self.column {
            Column::Numeric(values) => values.push(cell),
            Column::Nominal { values, .. } | Column::String { values, .. } => {
                values.push(cell_index(cell))
            }
        }
    }
}

fn store<T>(values: &mut Vec<T>, row: usize, value: T) {
    if row == values.len() {
        values.push(value);
    } else {
        values[row] = value;
    }
}

fn cell_index(cell: f64) -> Option<u32> {
    (!cell.is_nan()).then_some(cell as u32)
}

fn resolve(catalogue: &Catalogue, index: Option<u32>) -> Value {
    match index.and_then(|i| catalogue.get(i)) {
        Some(label) => Value::Text(label.to_string()),
        None => Value::Missing,
    }
}

fn format_label(catalogue: &Catalogue, index: Option<u32>) -> String {
    match index.and_then(|i| catalogue.get(i)) {
        Some(label) => quote(label),
        None => MISSING_TOKEN.to_string(),
    }
}

/// Render a number the way the data section stores it.
///
/// `Display` for `f64` prints integral values without a fraction (`3`, not
/// `3.0`) and everything else as the shortest string that parses back to
/// the same bits.
pub fn format_number(v: f64) -> String {
    v.to_string()
}

/// Single-quote `text`, escaping quotes, backslashes and line breaks.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_formatting() {
        let attr = Attribute::numeric("x", [3.0, 2.5, -0.125, 1e-7, f64::NAN]);
        assert_eq!(attr.formatted_value_at(0).unwrap(), "3");
        assert_eq!(attr.formatted_value_at(1).unwrap(), "2.5");
        assert_eq!(attr.formatted_value_at(2).unwrap(), "-0.125");
        assert_eq!(attr.formatted_value_at(3).unwrap().parse::<f64>().unwrap(), 1e-7);
        assert_eq!(attr.formatted_value_at(4).unwrap(), "NaN");
        assert!(attr.value_at(4).unwrap().is_missing());
    }

    #[test]
    fn test_header_lines() {
        let num = Attribute::numeric("Loudness", [1.0]);
        let text = Attribute::string("Track's path", ["a"]);
        let nom = Attribute::nominal("genre", ["rock", "pop", "rock"]);

        assert_eq!(num.header_line(), "@ATTRIBUTE 'Loudness' NUMERIC");
        assert_eq!(text.header_line(), "@ATTRIBUTE 'Track\\'s path' STRING");
        assert_eq!(nom.header_line(), "@ATTRIBUTE 'genre' {'rock','pop'}");
    }

    #[test]
    fn test_string_escaping() {
        let attr = Attribute::string(
            "path",
            ["Users/Shared/50 Cent/01' Intro.mp3", "say \"hi\"", "C:\\music"],
        );
        assert_eq!(
            attr.formatted_value_at(0).unwrap(),
            "'Users/Shared/50 Cent/01\\' Intro.mp3'"
        );
        assert_eq!(attr.formatted_value_at(1).unwrap(), "'say \\\"hi\\\"'");
        assert_eq!(attr.formatted_value_at(2).unwrap(), "'C:\\\\music'");
    }

    #[test]
    fn test_string_interning() {
        let attr = Attribute::string("s", ["a", "b", "a", "a"]);
        assert_eq!(attr.value_count(), 4);
        assert_eq!(attr.value_at(2).unwrap(), Value::from("a"));
        match &attr.column {
            Column::String { pool, .. } => assert_eq!(pool.len(), 2),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_open_nominal_grows() -> Result<()> {
        let mut attr = Attribute::nominal("mood", ["happy"]);
        attr.append_value("sad")?;
        assert_eq!(attr.labels().unwrap(), ["happy", "sad"]);
        assert_eq!(attr.value_at(1)?, Value::from("sad"));
        Ok(())
    }

    #[test]
    fn test_closed_nominal_rejects_unknown() {
        let result = Attribute::nominal_with_labels("mood", ["happy", "sad"], ["happy", "angry"]);
        assert!(matches!(
            result,
            Err(ArffError::InvalidNominalValue { ref value, .. }) if value == "angry"
        ));

        let mut attr = Attribute::nominal_with_labels("mood", ["happy", "sad"], ["sad"]).unwrap();
        assert!(attr.append_value("angry").is_err());
        assert_eq!(attr.value_count(), 1);
        assert!(attr.set_value_at(0, "happy").is_ok());
        assert_eq!(attr.value_at(0).unwrap(), Value::from("happy"));
    }

    #[test]
    fn test_nominal_from_bools() {
        let attr = Attribute::nominal_from_bools("flag", [true, false, true]);
        assert_eq!(attr.labels().unwrap(), ["true", "false"]);
        assert_eq!(attr.value_at(1).unwrap(), Value::from("false"));
        assert_eq!(attr.header_line(), "@ATTRIBUTE 'flag' {'true','false'}");
    }

    #[test]
    fn test_type_checks() {
        let mut num = Attribute::numeric("x", []);
        assert!(matches!(
            num.append_value("one"),
            Err(ArffError::TypeMismatch { found: "text", .. })
        ));
        num.append_value(Value::Missing).unwrap();
        assert!(num.value_at(0).unwrap().to_f64().unwrap().is_nan());

        let mut text = Attribute::string("s", Vec::<String>::new());
        assert!(text.append_value(1.0).is_err());
        text.append_value(Value::Missing).unwrap();
        assert_eq!(text.formatted_value_at(0).unwrap(), "?");
    }

    #[test]
    fn test_out_of_range() {
        let attr = Attribute::numeric("x", [1.0]);
        assert!(matches!(
            attr.value_at(1),
            Err(ArffError::OutOfRange { index: 1, len: 1 })
        ));
        assert!(attr.formatted_value_at(5).is_err());
    }

    #[test]
    fn test_is_valid() {
        let num = Attribute::numeric("x", []);
        assert!(num.is_valid("1.5e3"));
        assert!(num.is_valid("?"));
        assert!(!num.is_valid("abc"));

        let nom = Attribute::nominal_with_labels("y", ["Rock", "Pop"], Vec::<&str>::new()).unwrap();
        assert!(nom.is_valid("rock"));
        assert!(nom.is_valid("?"));
        assert!(!nom.is_valid("jazz"));

        let text = Attribute::string("s", Vec::<&str>::new());
        assert!(text.is_valid("anything at all"));
    }

    #[test]
    fn test_cells_round_trip_through_catalogue() {
        let mut nom = Attribute::declared_nominal("y", ["a", "b"]);
        assert_eq!(nom.encode_token("b"), Ok(1.0));
        assert_eq!(nom.encode_token("B"), Err(Rejection::UnknownLabel));
        assert_eq!(nom.decode_cell(1.0), Value::from("b"));
        assert_eq!(nom.decode_cell(f64::NAN), Value::Missing);

        let mut num = Attribute::numeric("x", []);
        assert!(num.encode_token("?").unwrap().is_nan());
        assert_eq!(num.encode_token("x1"), Err(Rejection::NotANumber));
    }
}
