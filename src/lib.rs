//! EBD table extraction from edi@energy .docx documents
//!
//! This crate provides:
//! - A reader that exposes a .docx body as paragraphs and tables in document order
//! - Chapter tracking and an index of all EBD keys (`E_0003`) in a document
//! - Location of the table fragments that belong to one EBD key
//! - Conversion of those raw fragments into a typed [`EbdTable`]

pub mod batch;
pub mod chapters;
pub mod converter;
mod docx;
pub mod document;
pub mod header;
pub mod key;
pub mod locator;
pub mod model;

pub use batch::{extract_all, extract_selected, ExtractionReport, KeyOutcome, KeyReport};
pub use chapters::{
    collect_ebd_keys, enrich_paragraphs_with_sections, get_all_ebd_keys, list_all_keys,
    ChapterPosition, EbdKeyIndex, HeadingLevel,
};
pub use converter::{convert, DocxTableConverter, EbdConversion};
pub use document::{Block, Document, Paragraph, Table, TableCell, TableRow};
pub use header::{resolve_column_layout, ColumnLayout, HeaderColumn};
pub use key::EbdKey;
pub use locator::{get_ebd_docx_tables, locate_tables, EbdDocxTables};
pub use model::{
    EbdCheckResult, EbdNoTableSection, EbdTable, EbdTableMetaData, EbdTableRow, EbdTableSubRow,
    MultiStepInstruction, END_MARKER,
};

use std::path::Path;

/// Open a document, locate the tables of `key` and convert them
///
/// This re-reads the file on every call. To process many keys of one
/// document, open it once with [`Document::open`] and use [`locate_tables`]
/// and [`convert`], or [`extract_all`].
pub fn extract_ebd_table<P: AsRef<Path>>(
    path: P,
    key: &str,
    chapter: &str,
    section: &str,
    ebd_name: &str,
) -> Result<EbdConversion, EbdError> {
    let key = EbdKey::parse(key)?;
    let document = Document::open(path)?;
    let tables = locate_tables(document.blocks(), &key)?;
    convert(&tables, &key, chapter, section, ebd_name)
}

#[derive(Debug, thiserror::Error)]
pub enum EbdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("XML parsing error: {0}")]
    Xml(String),
    #[error("The ebd_key '{key}' does not match {pattern}")]
    InvalidKeyFormat { key: String, pattern: &'static str },
    #[error("No table found for {key}")]
    TableNotFound { key: EbdKey },
    #[error("{key}: the header column '{column}' was not found in the first two rows")]
    HeaderColumnNotResolved { key: EbdKey, column: HeaderColumn },
    #[error("{key}: the 'Prüfende Rolle' banner was never found")]
    RoleNotAssigned { key: EbdKey },
    #[error("{key}: the cell content '{text}' does not belong to a ja/nein cell")]
    CellParse { key: EbdKey, text: String },
    #[error(
        "{key}: step '{step_number}' has {sub_rows} sub rows with {true_outcomes} 'ja' outcomes; expected 2 sub rows with exactly 1 'ja'"
    )]
    SubRowInvariantViolation {
        key: EbdKey,
        step_number: String,
        sub_rows: usize,
        true_outcomes: usize,
    },
    #[error("{key} is not convertible: {reason}")]
    EbdTableNotConvertible { key: EbdKey, reason: String },
    #[error("{key}: no valid step number found in the table")]
    StepNumberNotFound { key: EbdKey },
}

impl EbdError {
    /// The EBD key the error refers to, if it is a per-key error
    pub fn ebd_key(&self) -> Option<&EbdKey> {
        match self {
            EbdError::TableNotFound { key }
            | EbdError::HeaderColumnNotResolved { key, .. }
            | EbdError::RoleNotAssigned { key }
            | EbdError::CellParse { key, .. }
            | EbdError::SubRowInvariantViolation { key, .. }
            | EbdError::EbdTableNotConvertible { key, .. }
            | EbdError::StepNumberNotFound { key } => Some(key),
            EbdError::Io(_)
            | EbdError::InvalidDocument(_)
            | EbdError::Xml(_)
            | EbdError::InvalidKeyFormat { .. } => None,
        }
    }

    /// Errors that only concern one key; a batch moves on to the next key
    pub fn is_skippable(&self) -> bool {
        self.ebd_key().is_some()
    }

    /// Recognized table layouts the converter does not support
    pub fn is_unsupported_layout(&self) -> bool {
        matches!(
            self,
            EbdError::EbdTableNotConvertible { .. }
                | EbdError::StepNumberNotFound { .. }
                | EbdError::HeaderColumnNotResolved { .. }
        )
    }
}

impl From<zip::result::ZipError> for EbdError {
    fn from(e: zip::result::ZipError) -> Self {
        // the container is already in memory, so any zip failure means a broken file
        EbdError::InvalidDocument(e.to_string())
    }
}

impl From<roxmltree::Error> for EbdError {
    fn from(e: roxmltree::Error) -> Self {
        EbdError::Xml(e.to_string())
    }
}
