//! Access to the raw data of OpenType font tables.

pub mod cmap;

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::ParseError;

pub trait FontTableProvider {
    /// Return data for the specified table if present
    fn table_data<'a>(&'a self, tag: u32) -> Result<Option<Cow<'a, [u8]>>, ParseError>;

    fn has_table(&self, tag: u32) -> bool;

    fn read_table_data<'a>(&'a self, tag: u32) -> Result<Cow<'a, [u8]>, ParseError> {
        self.table_data(tag)?.ok_or(ParseError::MissingTable(tag))
    }
}

/// A `FontTableProvider` backed by table data held in memory, keyed by tag.
#[derive(Debug, Default, Clone)]
pub struct TableMap {
    tables: HashMap<u32, Vec<u8>>,
}

impl TableMap {
    pub fn new() -> Self {
        TableMap::default()
    }

    pub fn insert(&mut self, tag: u32, data: Vec<u8>) {
        self.tables.insert(tag, data);
    }

    pub fn with_table(mut self, tag: u32, data: Vec<u8>) -> Self {
        self.insert(tag, data);
        self
    }
}

impl FontTableProvider for TableMap {
    fn table_data<'a>(&'a self, tag: u32) -> Result<Option<Cow<'a, [u8]>>, ParseError> {
        Ok(self
            .tables
            .get(&tag)
            .map(|data| Cow::Borrowed(data.as_slice())))
    }

    fn has_table(&self, tag: u32) -> bool {
        self.tables.contains_key(&tag)
    }
}

impl<T: FontTableProvider + ?Sized> FontTableProvider for Box<T> {
    fn table_data<'a>(&'a self, tag: u32) -> Result<Option<Cow<'a, [u8]>>, ParseError> {
        self.as_ref().table_data(tag)
    }

    fn has_table(&self, tag: u32) -> bool {
        self.as_ref().has_table(tag)
    }
}
