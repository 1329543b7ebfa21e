//! arffdata - In-memory table
//!
//! A [`Table`] is an ordered set of equally long [`Attribute`] columns plus
//! a relation name and free-form `%@key=value` metadata. Columns are looked
//! up by position or by name through [`AttributeKey`].

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::attribute::{Attribute, AttributeKind};
use crate::error::{ArffError, Result};
use crate::parser::ArffParser;
use crate::writer;

/// Anything that can pick out one attribute of a table.
pub trait AttributeKey {
    fn position(&self, attributes: &[Attribute]) -> Option<usize>;

    /// Used in [`ArffError::NoSuchAttribute`].
    fn describe(&self) -> String;
}

impl AttributeKey for usize {
    fn position(&self, attributes: &[Attribute]) -> Option<usize> {
        (*self < attributes.len()).then_some(*self)
    }

    fn describe(&self) -> String {
        format!("#{self}")
    }
}

impl AttributeKey for str {
    fn position(&self, attributes: &[Attribute]) -> Option<usize> {
        attributes.iter().position(|a| a.name() == self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl AttributeKey for String {
    fn position(&self, attributes: &[Attribute]) -> Option<usize> {
        self.as_str().position(attributes)
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

impl<K: AttributeKey + ?Sized> AttributeKey for &K {
    fn position(&self, attributes: &[Attribute]) -> Option<usize> {
        (**self).position(attributes)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    name: String,
    attributes: Vec<Attribute>,
    metadata: IndexMap<String, String>,
    /// File the table was loaded from, if any.
    source: Option<PathBuf>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load a whole ARFF file into memory.
    pub fn from_arff(path: impl AsRef<Path>) -> Result<Self> {
        let mut parser = ArffParser::open(path)?;
        Self::from_parser(&mut parser)
    }

    /// Copy every row out of an open parser.
    pub fn from_parser(parser: &mut ArffParser) -> Result<Self> {
        let width = parser.attributes().len();
        let rows = parser.row_count();
        let mut cells: Vec<Vec<f64>> = vec![Vec::with_capacity(rows); width];
        for row in 0..rows {
            for (col, column) in cells.iter_mut().enumerate() {
                column.push(parser.cell(row, col)?);
            }
        }
        // Catalogues are cloned only now: string pools grow while rows are read.
        let columns: Vec<Attribute> = parser
            .attributes()
            .iter()
            .zip(cells)
            .map(|(declared, column)| {
                let mut attribute = declared.empty_like();
                for cell in column {
                    attribute.push_cell(cell);
                }
                attribute
            })
            .collect();
        debug!(
            "Loaded {} rows x {} attributes from {}",
            parser.row_count(),
            columns.len(),
            parser.path().display()
        );
        Ok(Self {
            name: parser.relation().to_string(),
            attributes: columns,
            metadata: parser.metadata().clone(),
            source: Some(parser.path().to_path_buf()),
        })
    }

    /// Write the table to `path`. See [`writer::save`].
    pub fn to_arff(&self, path: impl AsRef<Path>) -> Result<()> {
        writer::save(self, path.as_ref())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Append a column. Its length must match the columns already present.
    pub fn add_attribute(&mut self, attribute: Attribute) -> Result<()> {
        if let Some(first) = self.attributes.first() {
            if first.value_count() != attribute.value_count() {
                return Err(ArffError::RowCountMismatch {
                    attribute: attribute.name().to_string(),
                    expected: first.value_count(),
                    found: attribute.value_count(),
                });
            }
        }
        self.attributes.push(attribute);
        Ok(())
    }

    /// Append several columns; stops at the first one that does not fit.
    pub fn add_attributes<I>(&mut self, attributes: I) -> Result<()>
    where
        I: IntoIterator<Item = Attribute>,
    {
        for attribute in attributes {
            self.add_attribute(attribute)?;
        }
        Ok(())
    }

    pub fn attribute<K: AttributeKey>(&self, key: K) -> Result<&Attribute> {
        let index = self.index_of(&key)?;
        Ok(&self.attributes[index])
    }

    pub fn attribute_mut<K: AttributeKey>(&mut self, key: K) -> Result<&mut Attribute> {
        let index = self.index_of(&key)?;
        Ok(&mut self.attributes[index])
    }

    pub fn remove_attribute<K: AttributeKey>(&mut self, key: K) -> Result<Attribute> {
        let index = self.index_of(&key)?;
        Ok(self.attributes.remove(index))
    }

    pub fn numeric<K: AttributeKey>(&self, key: K) -> Result<&Attribute> {
        self.typed(key, AttributeKind::Numeric)
    }

    pub fn nominal<K: AttributeKey>(&self, key: K) -> Result<&Attribute> {
        self.typed(key, AttributeKind::Nominal)
    }

    pub fn string<K: AttributeKey>(&self, key: K) -> Result<&Attribute> {
        self.typed(key, AttributeKind::String)
    }

    fn typed<K: AttributeKey>(&self, key: K, expected: AttributeKind) -> Result<&Attribute> {
        let attribute = self.attribute(key)?;
        if attribute.kind() != expected {
            return Err(ArffError::WrongAttributeKind {
                attribute: attribute.name().to_string(),
                expected,
                found: attribute.kind(),
            });
        }
        Ok(attribute)
    }

    fn index_of<K: AttributeKey + ?Sized>(&self, key: &K) -> Result<usize> {
        key.position(&self.attributes)
            .ok_or_else(|| ArffError::NoSuchAttribute(key.describe()))
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(Attribute::name).collect()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Common row count, or `None` when the table has no columns or the
    /// columns have drifted apart through per-attribute edits.
    pub fn value_count(&self) -> Option<usize> {
        let first = self.attributes.first()?.value_count();
        self.attributes
            .iter()
            .all(|a| a.value_count() == first)
            .then_some(first)
    }

    pub fn metadata(&self) -> &IndexMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }
}
