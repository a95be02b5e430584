//! Column layout of an EBD table
//!
//! The header lives in the first one or two rows of the first fragment.
//! Row 0 is either the "Prüfende Rolle: XY" banner (one merged cell across the
//! whole table) or already the `Nr. | Prüfschritt | Prüfergebnis | Code | Hinweis`
//! row; the row holding `Nr.` is the last header row.

use crate::document::Table;
use crate::key::EbdKey;
use crate::EbdError;
use std::fmt;

/// Start of the banner naming the market role that applies the EBD
pub const ROLE_BANNER_PREFIX: &str = "Prüfende Rolle";

/// The five columns every EBD table must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderColumn {
    StepNumber,
    Description,
    CheckResult,
    ResultCode,
    Note,
}

impl HeaderColumn {
    pub const ALL: [HeaderColumn; 5] = [
        HeaderColumn::StepNumber,
        HeaderColumn::Description,
        HeaderColumn::CheckResult,
        HeaderColumn::ResultCode,
        HeaderColumn::Note,
    ];

    /// Header cell text that marks this column
    pub fn marker(self) -> &'static str {
        match self {
            HeaderColumn::StepNumber => "Nr.",
            HeaderColumn::Description => "Prüfschritt",
            HeaderColumn::CheckResult => "Prüfergebnis",
            HeaderColumn::ResultCode => "Code",
            HeaderColumn::Note => "Hinweis",
        }
    }

    fn from_marker(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.marker() == text)
    }
}

impl fmt::Display for HeaderColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Resolved physical column indices plus the role from the banner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub step_number: usize,
    pub description: usize,
    pub check_result: usize,
    pub result_code: usize,
    pub note: usize,
    /// 0 or 1: index of the row that holds `Nr.`
    pub last_header_row: usize,
    pub role: String,
}

impl ColumnLayout {
    pub fn index_of(&self, column: HeaderColumn) -> usize {
        match column {
            HeaderColumn::StepNumber => self.step_number,
            HeaderColumn::Description => self.description,
            HeaderColumn::CheckResult => self.check_result,
            HeaderColumn::ResultCode => self.result_code,
            HeaderColumn::Note => self.note,
        }
    }
}

#[derive(Debug, Default)]
struct PartialLayout {
    columns: [Option<usize>; 5],
    last_header_row: Option<usize>,
    role: Option<String>,
}

impl PartialLayout {
    fn set(&mut self, column: HeaderColumn, index: usize) {
        self.columns[column as usize] = Some(index);
    }

    fn get(&self, column: HeaderColumn, key: &EbdKey) -> Result<usize, EbdError> {
        self.columns[column as usize].ok_or_else(|| EbdError::HeaderColumnNotResolved {
            key: key.clone(),
            column,
        })
    }

    fn finish(self, key: &EbdKey) -> Result<ColumnLayout, EbdError> {
        let step_number = self.get(HeaderColumn::StepNumber, key)?;
        let description = self.get(HeaderColumn::Description, key)?;
        let check_result = self.get(HeaderColumn::CheckResult, key)?;
        let result_code = self.get(HeaderColumn::ResultCode, key)?;
        let note = self.get(HeaderColumn::Note, key)?;
        // set together with the step number column
        let last_header_row = self.last_header_row.unwrap_or_default();
        let role = self
            .role
            .ok_or_else(|| EbdError::RoleNotAssigned { key: key.clone() })?;
        Ok(ColumnLayout {
            step_number,
            description,
            check_result,
            result_code,
            note,
            last_header_row,
            role,
        })
    }
}

/// Role named in a `Prüfende Rolle: XY` banner cell
pub(crate) fn role_from_banner(text: &str) -> Option<String> {
    let rest = text.trim().strip_prefix(ROLE_BANNER_PREFIX)?;
    let (_, role) = rest.split_once(':')?;
    Some(role.trim().to_string())
}

/// Collapse runs of identical neighbouring cells (merged columns show up repeated)
fn dedup_consecutive(cells: Vec<&str>) -> Vec<&str> {
    let mut out = cells;
    out.dedup();
    out
}

/// Resolve the column layout from the first two rows of `table`
pub fn resolve_column_layout(table: &Table, key: &EbdKey) -> Result<ColumnLayout, EbdError> {
    let mut layout = PartialLayout::default();
    for (row_index, row) in table.rows.iter().take(2).enumerate() {
        for (column_index, cell) in dedup_consecutive(row.logical_cells()).into_iter().enumerate() {
            if let Some(role) = role_from_banner(cell) {
                // the banner fills the whole row
                layout.role = Some(role);
                break;
            }
            let Some(column) = HeaderColumn::from_marker(cell.trim()) else {
                continue;
            };
            if column == HeaderColumn::StepNumber {
                layout.last_header_row = Some(row_index);
            }
            layout.set(column, column_index);
        }
    }
    let layout = layout.finish(key)?;
    log::debug!("{key}: column layout {layout:?}");
    Ok(layout)
}
