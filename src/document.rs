//! In-memory view of a .docx body
//!
//! Word keeps paragraphs and tables as siblings below `w:body`, but most
//! readers only hand them out as two unrelated lists. [`Document::blocks`]
//! walks them in the order they were authored, which is what the table
//! locator relies on.

use crate::docx;
use crate::EbdError;
use std::path::Path;

/// A top-level paragraph of the document body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    /// Paragraph text (runs concatenated, tabs and breaks preserved)
    pub text: String,
    /// Style id from `w:pStyle`, e.g. `berschrift1`
    pub style_id: Option<String>,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, style_id: Option<&str>) -> Self {
        Self {
            text: text.into(),
            style_id: style_id.map(str::to_string),
        }
    }

    /// True if the paragraph holds nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A single `w:tc` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub text: String,
    /// Number of grid columns this cell covers (`w:gridSpan`, default 1)
    pub grid_span: usize,
}

impl TableCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            grid_span: 1,
        }
    }

    pub fn spanning(text: impl Into<String>, grid_span: usize) -> Self {
        Self {
            text: text.into(),
            grid_span: grid_span.max(1),
        }
    }
}

/// A table row as authored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    /// Physical cells in authoring order. Merged columns appear once.
    pub cells: Vec<TableCell>,
}

impl TableRow {
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self { cells }
    }

    /// Row built from plain texts, one physical cell each
    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        Self {
            cells: texts.iter().map(|t| TableCell::new(t.as_ref())).collect(),
        }
    }

    /// Physical cell texts; this is the list to index with column positions
    pub fn physical_cells(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|c| c.text.as_str())
    }

    /// Rectangular grid view: a cell spanning n columns is repeated n times
    pub fn logical_cells(&self) -> Vec<&str> {
        self.cells
            .iter()
            .flat_map(|c| std::iter::repeat(c.text.as_str()).take(c.grid_span))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Text of the physical cell at `index`, if the row has that many cells
    pub fn cell_text(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|c| c.text.as_str())
    }
}

/// One `w:tbl` element of the body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn new(rows: Vec<TableRow>) -> Self {
        Self { rows }
    }
}

/// Owned body element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyElement {
    Paragraph(Paragraph),
    Table(Table),
}

/// Borrowed block yielded by [`Document::blocks`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block<'a> {
    Paragraph(&'a Paragraph),
    Table(&'a Table),
}

/// A parsed .docx body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    elements: Vec<BodyElement>,
}

impl Document {
    /// Read the file at `path` and parse its body
    ///
    /// The file is read into memory in one go and closed before parsing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EbdError> {
        let path = path.as_ref();
        let buffer = std::fs::read(path)?;
        let document = Self::from_bytes(&buffer)?;
        log::info!("Successfully read the file '{}'", path.display());
        Ok(document)
    }

    /// Parse a .docx container held in memory
    pub fn from_bytes(buffer: &[u8]) -> Result<Self, EbdError> {
        let elements = docx::read_body_elements(buffer)?;
        Ok(Self { elements })
    }

    /// Build a document from already parsed body elements
    pub fn from_elements(elements: Vec<BodyElement>) -> Self {
        Self { elements }
    }

    /// Tables and paragraphs in document order
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            inner: self.elements.iter(),
        }
    }

    /// Top-level paragraphs only, in document order
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.elements.iter().filter_map(|e| match e {
            BodyElement::Paragraph(p) => Some(p),
            BodyElement::Table(_) => None,
        })
    }

    /// Top-level tables only, in document order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.elements.iter().filter_map(|e| match e {
            BodyElement::Table(t) => Some(t),
            BodyElement::Paragraph(_) => None,
        })
    }
}

/// Block sequencer over a [`Document`]
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    inner: std::slice::Iter<'a, BodyElement>,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|element| match element {
            BodyElement::Paragraph(p) => Block::Paragraph(p),
            BodyElement::Table(t) => Block::Table(t),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
