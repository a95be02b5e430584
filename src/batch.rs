//! Extracting every EBD of a document in one pass over a parsed document
//!
//! Per-key failures never abort the batch; they are recorded next to the
//! successful conversions.

use crate::chapters::{list_all_keys, ChapterPosition};
use crate::converter::{convert, EbdConversion};
use crate::document::Document;
use crate::key::EbdKey;
use crate::locator::locate_tables;
use crate::model::{EbdNoTableSection, EbdTable};
use crate::EbdError;
use serde::Serialize;

/// Result for one key
#[derive(Debug)]
pub enum KeyOutcome {
    Converted(EbdTable),
    NoTable(EbdNoTableSection),
    Failed(EbdError),
}

#[derive(Debug)]
pub struct KeyReport {
    pub key: EbdKey,
    pub title: String,
    pub position: ChapterPosition,
    pub outcome: KeyOutcome,
}

/// Serializable one-line view of a [`KeyReport`]
#[derive(Debug, Clone, Serialize)]
pub struct KeySummary {
    pub key: String,
    pub title: String,
    pub position: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl KeyReport {
    /// `(chapter, section)` labels used in the metadata of this key
    pub fn metadata_labels(&self) -> (String, String) {
        metadata_labels(&self.position)
    }

    /// `E_XXXX_<title>`
    pub fn ebd_name(&self) -> String {
        format!("{}_{}", self.key, self.title)
    }

    pub fn summary(&self) -> KeySummary {
        let (status, detail) = match &self.outcome {
            KeyOutcome::Converted(table) => ("converted", Some(format!("{} rows", table.rows.len()))),
            KeyOutcome::NoTable(section) => ("no_table", Some(section.remark.clone())),
            KeyOutcome::Failed(err) if err.is_unsupported_layout() => ("unsupported", Some(err.to_string())),
            KeyOutcome::Failed(err) => ("failed", Some(err.to_string())),
        };
        KeySummary {
            key: self.key.to_string(),
            title: self.title.clone(),
            position: self.position.to_string(),
            status,
            detail,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub entries: Vec<KeyReport>,
}

impl ExtractionReport {
    pub fn converted(&self) -> impl Iterator<Item = &EbdTable> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            KeyOutcome::Converted(table) => Some(table),
            _ => None,
        })
    }

    pub fn converted_count(&self) -> usize {
        self.converted().count()
    }

    pub fn no_table_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, KeyOutcome::NoTable(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, KeyOutcome::Failed(_)))
            .count()
    }

    pub fn summaries(&self) -> Vec<KeySummary> {
        self.entries.iter().map(KeyReport::summary).collect()
    }
}

/// Chapter and section labels for the table metadata
///
/// The chapter is its heading title; the section names the EBD's own
/// subsection, e.g. `7.39.1 E_0003_Bestellung der Aggregationsebene RZ prüfen`.
fn metadata_labels(position: &ChapterPosition) -> (String, String) {
    let chapter = position
        .chapter_title
        .clone()
        .unwrap_or_else(|| position.chapter.to_string());
    let section = match &position.subsection_title {
        Some(title) => format!("{position} {title}"),
        None => position.to_string(),
    };
    (chapter, section)
}

fn extract_one(
    document: &Document,
    key: &EbdKey,
    title: &str,
    position: &ChapterPosition,
) -> Result<EbdConversion, EbdError> {
    let tables = locate_tables(document.blocks(), key)?;
    let (chapter, section) = metadata_labels(position);
    convert(&tables, key, &chapter, &section, &format!("{key}_{title}"))
}

fn report_for(document: &Document, key: EbdKey, title: String, position: ChapterPosition) -> KeyReport {
    log::info!("Processing EBD '{key}' ({title})");
    let outcome = match extract_one(document, &key, &title, &position) {
        Ok(EbdConversion::Table(table)) => KeyOutcome::Converted(table),
        Ok(EbdConversion::NoTable(section)) => KeyOutcome::NoTable(section),
        Err(err) => {
            log::warn!("Error while scraping {key}: {err}; Skip!");
            KeyOutcome::Failed(err)
        }
    };
    KeyReport {
        key,
        title,
        position,
        outcome,
    }
}

/// Locate and convert every EBD key of the document
pub fn extract_all(document: &Document) -> ExtractionReport {
    extract_selected(document, None)
}

/// Like [`extract_all`], restricted to `keys` when given
///
/// Requested keys without a heading in the document are still searched for.
pub fn extract_selected(document: &Document, keys: Option<&[EbdKey]>) -> ExtractionReport {
    let mut index = list_all_keys(document);
    let entries: Vec<KeyReport> = match keys {
        None => index
            .into_iter()
            .map(|(key, (title, position))| report_for(document, key, title, position))
            .collect(),
        Some(keys) => keys
            .iter()
            .map(|key| {
                let (title, position) = index.remove(key).unwrap_or_default();
                report_for(document, key.clone(), title, position)
            })
            .collect(),
    };
    let report = ExtractionReport { entries };
    log::info!(
        "Finished: {} converted, {} without table, {} skipped",
        report.converted_count(),
        report.no_table_count(),
        report.failed_count()
    );
    report
}
