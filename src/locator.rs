//! Locating the table fragments that belong to one EBD key
//!
//! Before each EBD table there is a paragraph whose text starts with the EBD
//! key. Authors sometimes split one logical table into several tables on
//! adjacent pages (with blank lines in between); those fragments are merged
//! here. A single Word table spanning several pages is already one table.

use crate::chapters::HeadingLevel;
use crate::document::{Block, Document, Paragraph, Table};
use crate::key::EbdKey;
use crate::model::EbdNoTableSection;
use crate::EbdError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::path::Path;

/// Openings of sentences that replace a table with an explanation
pub const NO_TABLE_REMARK_PREFIXES: &[&str] = &[
    "Es ist das EBD",
    "Derzeit ist für diese Entscheidung kein Entscheidungsbaum notwendig",
];

static ANY_KEY_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^E_\d{4}").unwrap());

/// The tables of one EBD key, or the explanation why there is none
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EbdDocxTables<'a> {
    /// One or more fragments in document order; never empty
    Tables(Vec<Cow<'a, Table>>),
    NoTable(EbdNoTableSection),
}

impl EbdDocxTables<'_> {
    /// Detach from the document the tables were found in
    pub fn into_owned(self) -> EbdDocxTables<'static> {
        match self {
            EbdDocxTables::Tables(tables) => EbdDocxTables::Tables(
                tables
                    .into_iter()
                    .map(|t| Cow::Owned(t.into_owned()))
                    .collect(),
            ),
            EbdDocxTables::NoTable(section) => EbdDocxTables::NoTable(section),
        }
    }

    /// Table fragments; empty for a table-less section
    pub fn tables(&self) -> Vec<&Table> {
        match self {
            EbdDocxTables::Tables(tables) => tables.iter().map(|t| &**t).collect(),
            EbdDocxTables::NoTable(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Idle,
    /// The last non-blank paragraph announced the requested key
    Armed,
}

fn is_no_table_remark(text: &str) -> bool {
    NO_TABLE_REMARK_PREFIXES
        .iter()
        .any(|prefix| text.starts_with(prefix))
}

/// Whether `paragraph` ends the section of the key being searched
fn leaves_section(paragraph: &Paragraph) -> bool {
    HeadingLevel::of(paragraph).is_some() || ANY_KEY_PREFIX_RE.is_match(paragraph.text.trim_start())
}

/// Find the table fragments for `key` in a block sequence
///
/// Returns [`EbdError::TableNotFound`] if neither a table nor a
/// "no table" remark follows the key's heading.
pub fn locate_tables<'a, I>(blocks: I, key: &EbdKey) -> Result<EbdDocxTables<'a>, EbdError>
where
    I: IntoIterator<Item = Block<'a>>,
{
    let mut blocks = blocks.into_iter();
    let mut state = ScanState::Idle;
    // true from the key's heading up to the next heading or key paragraph
    let mut in_key_section = false;
    let mut remark: Option<String> = None;
    let mut tables: Vec<Cow<'a, Table>> = Vec::new();

    while let Some(block) = blocks.next() {
        match block {
            Block::Paragraph(paragraph) => {
                if paragraph.is_blank() {
                    continue;
                }
                if paragraph.text.starts_with(key.as_str()) {
                    state = ScanState::Armed;
                    in_key_section = true;
                    continue;
                }
                if in_key_section && leaves_section(paragraph) {
                    in_key_section = false;
                }
                let text = paragraph.text.trim();
                if in_key_section && remark.is_none() && is_no_table_remark(text) {
                    log::debug!("{key} has no table: '{text}'");
                    remark = Some(text.to_string());
                }
                state = ScanState::Idle;
            }
            Block::Table(table) if state == ScanState::Armed => {
                tables.push(Cow::Borrowed(table));
                // continue from where the outer loop paused
                for next in blocks.by_ref() {
                    match next {
                        Block::Table(continuation) => tables.push(Cow::Borrowed(continuation)),
                        Block::Paragraph(p) if p.is_blank() => continue,
                        Block::Paragraph(_) => break,
                    }
                }
                break;
            }
            Block::Table(_) => {}
        }
    }

    if !tables.is_empty() {
        log::debug!("Found {} table fragment(s) for {key}", tables.len());
        return Ok(EbdDocxTables::Tables(tables));
    }
    match remark {
        Some(remark) => Ok(EbdDocxTables::NoTable(EbdNoTableSection {
            ebd_key: key.clone(),
            remark,
        })),
        None => Err(EbdError::TableNotFound { key: key.clone() }),
    }
}

/// Open the file at `path` and locate the tables of `key`
///
/// The key is validated before the file is touched.
pub fn get_ebd_docx_tables<P: AsRef<Path>>(
    path: P,
    key: &str,
) -> Result<EbdDocxTables<'static>, EbdError> {
    let key = EbdKey::parse(key)?;
    let document = Document::open(path)?;
    let located = locate_tables(document.blocks(), &key)?;
    Ok(located.into_owned())
}
