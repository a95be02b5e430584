//! Decision table model handed to graph rendering and JSON export

use crate::key::EbdKey;
use serde::{Deserialize, Serialize};

/// Canonical subsequent step of a terminating `ja`/`nein` branch
pub const END_MARKER: &str = "Ende";

/// Outcome of one check: the boolean answer and where to go next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdCheckResult {
    pub result: bool,
    /// A step number (`"2"`, `"4*"`), [`END_MARKER`], or `None` when the
    /// branch ends with a result code
    pub subsequent_step_number: Option<String>,
}

/// One branch (ja or nein) of a decision step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdTableSubRow {
    pub check_result: EbdCheckResult,
    pub result_code: Option<String>,
    pub note: Option<String>,
}

/// A numbered decision step with its two branches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdTableRow {
    pub step_number: String,
    pub description: String,
    pub sub_rows: Vec<EbdTableSubRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_cases: Option<Vec<String>>,
}

impl EbdTableRow {
    /// The branch whose check result is `ja`
    pub fn true_branch(&self) -> Option<&EbdTableSubRow> {
        self.sub_rows.iter().find(|s| s.check_result.result)
    }

    /// The branch whose check result is `nein`
    pub fn false_branch(&self) -> Option<&EbdTableSubRow> {
        self.sub_rows.iter().find(|s| !s.check_result.result)
    }
}

/// Free text spanning several steps, starting at `first_step_number_affected`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiStepInstruction {
    pub instruction_text: String,
    pub first_step_number_affected: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdTableMetaData {
    pub ebd_code: EbdKey,
    pub chapter: String,
    pub section: String,
    pub ebd_name: String,
    /// Market role that applies the decision tree ("Prüfende Rolle")
    pub role: String,
    /// Only set for sections that explain why there is no table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// A fully converted decision table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdTable {
    pub metadata: EbdTableMetaData,
    pub rows: Vec<EbdTableRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_step_instructions: Option<Vec<MultiStepInstruction>>,
}

impl EbdTable {
    /// Pretty-printed JSON, keeping non-ASCII characters as they are
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// A section that intentionally has no table, only an explanation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdNoTableSection {
    pub ebd_key: EbdKey,
    pub remark: String,
}

impl EbdNoTableSection {
    /// Metadata for a table-less section; there is no role banner to read
    pub fn to_metadata(&self, chapter: &str, section: &str, ebd_name: &str) -> EbdTableMetaData {
        EbdTableMetaData {
            ebd_code: self.ebd_key.clone(),
            chapter: chapter.to_string(),
            section: section.to_string(),
            ebd_name: ebd_name.to_string(),
            role: String::new(),
            remark: Some(self.remark.clone()),
        }
    }
}
