//! arffdata - Typed tabular data and a streaming ARFF codec.
//!
//! A [`Table`] holds named, typed columns ([`Attribute`]s) that are numeric,
//! nominal or free text, plus free-form metadata. Tables are built in
//! memory, loaded from ARFF files and written back with exact quoting.
//!
//! ## Reading large files
//!
//! - **Lazy reader** (`parser`) - [`ArffParser`] validates a file once and
//!   then serves rows from a bounded window, reopening the file when a row
//!   outside the window is requested. [`ReadOptions`] sets the window size.
//! - **Export** (`format`) - CSV and JSON Lines output from either a table
//!   or a lazy reader.
//!
//! ```no_run
//! use arffdata::{Attribute, Table};
//!
//! # fn main() -> arffdata::Result<()> {
//! let mut table = Table::new("songs");
//! table.add_attribute(Attribute::numeric("tempo", [120.0, 98.5]))?;
//! table.add_attribute(Attribute::nominal("mood", ["happy", "sad"]))?;
//! table.to_arff("songs.arff")?;
//!
//! let loaded = Table::from_arff("songs.arff")?;
//! assert_eq!(loaded.value_count(), Some(2));
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod error;
pub mod format;
pub mod metadata;
pub mod parser;
pub mod table;
pub mod tokenizer;
pub mod window;
pub mod writer;

pub use attribute::{Attribute, AttributeKind, Value};
pub use error::{ArffError, ArffWarning, Result};
pub use parser::{ArffParser, ReadOptions, DEFAULT_BUFFER_ROWS};
pub use table::{AttributeKey, Table};
pub use writer::ArffWriter;
