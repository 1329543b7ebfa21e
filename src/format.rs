//! arffdata - Export formats
//!
//! Writes a table, or a lazily read file, as CSV or JSON Lines, and
//! describes its shape as a [`Summary`].

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;

use crate::attribute::{format_number, Attribute, AttributeKind, Value};
use crate::error::ArffError;
use crate::parser::ArffParser;
use crate::table::Table;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Arff,
    /// Comma-separated values with a header row
    Csv,
    /// One JSON object per row
    Jsonl,
}

impl OutputFormat {
    /// Detect format from file extension
    pub fn detect<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("csv") => OutputFormat::Csv,
            Some("jsonl") | Some("json") | Some("ndjson") => OutputFormat::Jsonl,
            _ => OutputFormat::Arff,
        }
    }

    /// Parse format from string (for CLI)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "arff" => Some(OutputFormat::Arff),
            "csv" => Some(OutputFormat::Csv),
            "jsonl" | "json" | "ndjson" => Some(OutputFormat::Jsonl),
            _ => None,
        }
    }
}

/// Row-wise read access shared by [`Table`] and [`ArffParser`].
pub trait RowSource {
    fn attributes(&self) -> &[Attribute];

    fn row_count(&self) -> crate::Result<usize>;

    fn value(&mut self, row: usize, col: usize) -> crate::Result<Value>;
}

impl RowSource for Table {
    fn attributes(&self) -> &[Attribute] {
        Table::attributes(self)
    }

    fn row_count(&self) -> crate::Result<usize> {
        self.value_count()
            .ok_or_else(|| ArffError::IncompleteTable(self.name().to_string()))
    }

    fn value(&mut self, row: usize, col: usize) -> crate::Result<Value> {
        self.attribute(col)?.value_at(row)
    }
}

impl RowSource for ArffParser {
    fn attributes(&self) -> &[Attribute] {
        ArffParser::attributes(self)
    }

    fn row_count(&self) -> crate::Result<usize> {
        Ok(ArffParser::row_count(self))
    }

    fn value(&mut self, row: usize, col: usize) -> crate::Result<Value> {
        self.value_for(row, col)
    }
}

/// Values of one row in attribute order.
pub fn row_values<S: RowSource + ?Sized>(source: &mut S, row: usize) -> crate::Result<Vec<Value>> {
    let width = source.attributes().len();
    (0..width).map(|col| source.value(row, col)).collect()
}

/// Write `source` as CSV. Missing values become empty fields.
///
/// Returns the number of rows written.
pub fn write_csv<S: RowSource + ?Sized, P: AsRef<Path>>(source: &mut S, path: P) -> Result<usize> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    let names: Vec<String> = source.attributes().iter().map(|a| a.name().to_string()).collect();
    writer
        .write_record(&names)
        .with_context(|| "Failed to write CSV header")?;

    let rows = source.row_count()?;
    for row in 0..rows {
        let record: Vec<String> = row_values(source, row)?.iter().map(csv_field).collect();
        writer
            .write_record(&record)
            .with_context(|| format!("Failed to write CSV row {row}"))?;
    }
    writer.flush().with_context(|| "Failed to flush CSV output")?;
    Ok(rows)
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Number(v) => format_number(*v),
        Value::Text(s) => s.clone(),
        Value::Missing => String::new(),
    }
}

/// Write `source` as JSON Lines, keys in attribute order. Missing values
/// become `null`.
///
/// Returns the number of rows written.
pub fn write_jsonl<S: RowSource + ?Sized, P: AsRef<Path>>(source: &mut S, path: P) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSONL file: {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let names: Vec<String> = source.attributes().iter().map(|a| a.name().to_string()).collect();
    let rows = source.row_count()?;
    for row in 0..rows {
        let values = row_values(source, row)?;
        let object: IndexMap<&str, &Value> = names.iter().map(String::as_str).zip(values.iter()).collect();
        serde_json::to_writer(&mut out, &object)
            .with_context(|| format!("Failed to serialize row {row} to JSON"))?;
        out.write_all(b"\n")?;
    }
    out.flush().with_context(|| "Failed to flush JSONL output")?;
    Ok(rows)
}

// ─── Summary ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AttributeSummary {
    pub name: String,
    pub kind: AttributeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl From<&Attribute> for AttributeSummary {
    fn from(attribute: &Attribute) -> Self {
        Self {
            name: attribute.name().to_string(),
            kind: attribute.kind(),
            labels: attribute.labels().map(<[String]>::to_vec),
        }
    }
}

/// Shape of a relation: name, size, columns, metadata and read warnings.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub relation: String,
    /// `None` when the attributes disagree on their row count.
    pub rows: Option<usize>,
    pub attributes: Vec<AttributeSummary>,
    pub metadata: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Summary {
    pub fn of_parser(parser: &ArffParser) -> Self {
        Self {
            relation: parser.relation().to_string(),
            rows: Some(parser.row_count()),
            attributes: parser.attributes().iter().map(AttributeSummary::from).collect(),
            metadata: parser.metadata().clone(),
            warnings: parser.warnings().iter().map(ToString::to_string).collect(),
        }
    }

    pub fn of_table(table: &Table) -> Self {
        Self {
            relation: table.name().to_string(),
            rows: table.value_count(),
            attributes: table.attributes().iter().map(AttributeSummary::from).collect(),
            metadata: table.metadata().clone(),
            warnings: Vec::new(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Relation:   {}", self.relation)?;
        match self.rows {
            Some(rows) => writeln!(f, "Rows:       {rows}")?,
            None => writeln!(f, "Rows:       (inconsistent)")?,
        }
        writeln!(f, "Attributes: {}", self.attributes.len())?;
        for attribute in &self.attributes {
            match &attribute.labels {
                Some(labels) => writeln!(
                    f,
                    "  {:<24} {} {{{}}}",
                    attribute.name,
                    attribute.kind,
                    labels.join(",")
                )?,
                None => writeln!(f, "  {:<24} {}", attribute.name, attribute.kind)?,
            }
        }
        if !self.metadata.is_empty() {
            writeln!(f, "Metadata:")?;
            for (key, value) in &self.metadata {
                writeln!(f, "  {key} = {value}")?;
            }
        }
        for warning in &self.warnings {
            writeln!(f, "Warning: {warning}")?;
        }
        Ok(())
    }
}
