//! Conversion of raw EBD table fragments into an [`EbdTable`]
//!
//! Every decision step occupies two table rows: the upper row carries step
//! number, description and the first outcome; the lower row only the second
//! outcome. Rows that are narrower than the description column are
//! instructions spanning several steps ("multi-step instructions"); they
//! belong to the step that follows them. Consecutive instruction rows are
//! joined; an instruction without a following step is rejected.

use crate::document::{Table, TableRow};
use crate::header::{resolve_column_layout, role_from_banner, ColumnLayout, HeaderColumn};
use crate::key::EbdKey;
use crate::locator::EbdDocxTables;
use crate::model::{
    EbdCheckResult, EbdNoTableSection, EbdTable, EbdTableMetaData, EbdTableRow, EbdTableSubRow,
    MultiStepInstruction, END_MARKER,
};
use crate::EbdError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Cell values used instead of ja/nein in tables that are not decision trees
pub const PLACEHOLDER_MARKERS: &[&str] = &["--", "–", "—"];

/// `ja`/`nein`, then anything that is not a word character (arrows, also
/// Wingdings arrows from the private use area), then the subsequent step.
static SUBSEQUENT_STEP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<bool>ja|nein)\W*(?P<subsequent_step_number>\d+\*?|ende)?").unwrap()
});

static STEP_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\*?$").unwrap());

/// Step being assembled from its upper and lower table row
#[derive(Debug)]
struct RowDraft {
    step_number: String,
    description: String,
    sub_rows: Vec<EbdTableSubRow>,
}

/// Which sub row of a step the next data row is
#[derive(Debug)]
enum Phase {
    Upper,
    /// The upper row has been read
    Lower(RowDraft),
}

/// Converted table, or the remark of a section without a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EbdConversion {
    Table(EbdTable),
    NoTable(EbdNoTableSection),
}

/// Parse a check result cell into the outcome and the subsequent step
pub fn parse_check_result(text: &str, key: &EbdKey) -> Result<EbdCheckResult, EbdError> {
    let trimmed = text.trim();
    if let Some(marker) = PLACEHOLDER_MARKERS.iter().find(|m| **m == trimmed) {
        return Err(EbdError::EbdTableNotConvertible {
            key: key.clone(),
            reason: format!(
                "the check result column contains the non-boolean placeholder '{marker}' instead of ja/nein"
            ),
        });
    }
    let lowered = trimmed.to_lowercase();
    let caps = SUBSEQUENT_STEP_RE
        .captures(&lowered)
        .ok_or_else(|| EbdError::CellParse {
            key: key.clone(),
            text: trimmed.to_string(),
        })?;
    let subsequent_step_number = caps
        .name("subsequent_step_number")
        .map(|m| match m.as_str() {
            "ende" => END_MARKER.to_string(),
            step => step.to_string(),
        });
    Ok(EbdCheckResult {
        result: &caps["bool"] == "ja",
        subsequent_step_number,
    })
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Converts the docx tables of one EBD into an [`EbdTable`]
#[derive(Debug)]
pub struct DocxTableConverter<'t> {
    tables: Vec<&'t Table>,
    key: EbdKey,
    layout: ColumnLayout,
    metadata: EbdTableMetaData,
}

impl<'t> DocxTableConverter<'t> {
    /// Resolves the column layout from the header of the first fragment
    pub fn new<I>(
        tables: I,
        key: &EbdKey,
        chapter: &str,
        section: &str,
        ebd_name: &str,
    ) -> Result<Self, EbdError>
    where
        I: IntoIterator<Item = &'t Table>,
    {
        let tables: Vec<&Table> = tables.into_iter().collect();
        let first = tables
            .first()
            .ok_or_else(|| EbdError::TableNotFound { key: key.clone() })?;
        let layout = resolve_column_layout(first, key)?;
        let metadata = EbdTableMetaData {
            ebd_code: key.clone(),
            chapter: chapter.to_string(),
            section: section.to_string(),
            ebd_name: ebd_name.to_string(),
            role: layout.role.clone(),
            remark: None,
        };
        Ok(Self {
            tables,
            key: key.clone(),
            layout,
            metadata,
        })
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn metadata(&self) -> &EbdTableMetaData {
        &self.metadata
    }

    /// Data rows per fragment; header rows are dropped
    fn fragments(&self) -> Vec<Vec<&'t TableRow>> {
        self.tables
            .iter()
            .enumerate()
            .map(|(index, &table)| {
                if index == 0 {
                    table.rows.iter().skip(self.layout.last_header_row + 1).collect()
                } else {
                    table
                        .rows
                        .iter()
                        .filter(|row| !self.is_repeated_header(row))
                        .collect()
                }
            })
            .collect()
    }

    /// Continuation fragments sometimes repeat the banner or the column titles
    fn is_repeated_header(&self, row: &TableRow) -> bool {
        let step_cell = row.cell_text(self.layout.step_number).map(str::trim);
        step_cell == Some(HeaderColumn::StepNumber.marker())
            || row.physical_cells().any(|c| role_from_banner(c).is_some())
    }

    fn is_instruction_row(&self, row: &TableRow) -> bool {
        row.len() <= self.layout.description
    }

    fn instruction_text(row: &TableRow) -> String {
        let mut texts: Vec<&str> = row
            .physical_cells()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        texts.dedup();
        texts.join("\n")
    }

    fn cell<'r>(&self, row: &'r TableRow, column: HeaderColumn) -> Option<&'r str> {
        row.cell_text(self.layout.index_of(column))
    }

    fn has_step_number(&self, fragments: &[Vec<&TableRow>]) -> bool {
        fragments
            .iter()
            .flatten()
            .filter(|row| !self.is_instruction_row(row))
            .filter_map(|row| self.cell(*row, HeaderColumn::StepNumber))
            .any(|text| STEP_NUMBER_RE.is_match(text.trim()))
    }

    fn parse_sub_row(&self, row: &TableRow) -> Result<EbdTableSubRow, EbdError> {
        let check_result_text = self.cell(row, HeaderColumn::CheckResult).unwrap_or_default();
        Ok(EbdTableSubRow {
            check_result: parse_check_result(check_result_text, &self.key)?,
            result_code: non_empty(self.cell(row, HeaderColumn::ResultCode)),
            note: non_empty(self.cell(row, HeaderColumn::Note)),
        })
    }

    fn incomplete(&self, draft: &RowDraft) -> EbdError {
        EbdError::SubRowInvariantViolation {
            key: self.key.clone(),
            step_number: draft.step_number.clone(),
            sub_rows: draft.sub_rows.len(),
            true_outcomes: draft.sub_rows.iter().filter(|s| s.check_result.result).count(),
        }
    }

    /// Build the row once both sub rows are known; exactly one must be `ja`
    fn finish_row(&self, draft: RowDraft) -> Result<EbdTableRow, EbdError> {
        let true_outcomes = draft
            .sub_rows
            .iter()
            .filter(|s| s.check_result.result)
            .count();
        if draft.sub_rows.len() != 2 || true_outcomes != 1 {
            return Err(self.incomplete(&draft));
        }
        Ok(EbdTableRow {
            step_number: draft.step_number,
            description: draft.description,
            sub_rows: draft.sub_rows,
            use_cases: None,
        })
    }

    /// Converts the raw docx tables of an EBD to an [`EbdTable`]
    pub fn convert_docx_tables_to_ebd_table(&self) -> Result<EbdTable, EbdError> {
        let fragments = self.fragments();
        if !self.has_step_number(&fragments) {
            return Err(EbdError::StepNumberNotFound {
                key: self.key.clone(),
            });
        }

        let mut rows: Vec<EbdTableRow> = Vec::new();
        let mut instructions: Vec<MultiStepInstruction> = Vec::new();
        let mut pending_instruction: Option<String> = None;

        for fragment in &fragments {
            let mut phase = Phase::Upper;

            for row in fragment {
                if self.is_instruction_row(row) {
                    if let Phase::Lower(unfinished) = &phase {
                        return Err(self.incomplete(unfinished));
                    }
                    let text = Self::instruction_text(row);
                    pending_instruction = Some(match pending_instruction.take() {
                        Some(previous) => format!("{previous}\n{text}"),
                        None => text,
                    });
                    continue;
                }

                let sub_row = self.parse_sub_row(row)?;
                phase = match phase {
                    Phase::Upper => Phase::Lower(RowDraft {
                        step_number: self
                            .cell(row, HeaderColumn::StepNumber)
                            .unwrap_or_default()
                            .trim()
                            .to_string(),
                        description: self
                            .cell(row, HeaderColumn::Description)
                            .unwrap_or_default()
                            .trim()
                            .to_string(),
                        sub_rows: vec![sub_row],
                    }),
                    Phase::Lower(mut draft) => {
                        draft.sub_rows.push(sub_row);
                        let row = self.finish_row(draft)?;
                        if let Some(instruction_text) = pending_instruction.take() {
                            instructions.push(MultiStepInstruction {
                                instruction_text,
                                first_step_number_affected: row.step_number.clone(),
                            });
                        }
                        rows.push(row);
                        Phase::Upper
                    }
                };
            }

            if let Phase::Lower(unfinished) = &phase {
                return Err(self.incomplete(unfinished));
            }
        }

        if let Some(instruction_text) = pending_instruction {
            return Err(EbdError::EbdTableNotConvertible {
                key: self.key.clone(),
                reason: format!(
                    "the multi-step instruction '{instruction_text}' is not followed by any step"
                ),
            });
        }

        log::debug!(
            "{}: converted {} rows, {} multi-step instructions",
            self.key,
            rows.len(),
            instructions.len()
        );
        Ok(EbdTable {
            metadata: self.metadata.clone(),
            rows,
            multi_step_instructions: (!instructions.is_empty()).then_some(instructions),
        })
    }
}

/// Convert located tables; a section without table passes through
pub fn convert(
    tables: &EbdDocxTables<'_>,
    key: &EbdKey,
    chapter: &str,
    section: &str,
    ebd_name: &str,
) -> Result<EbdConversion, EbdError> {
    match tables {
        EbdDocxTables::NoTable(no_table) => Ok(EbdConversion::NoTable(no_table.clone())),
        EbdDocxTables::Tables(_) => {
            let converter =
                DocxTableConverter::new(tables.tables(), key, chapter, section, ebd_name)?;
            converter
                .convert_docx_tables_to_ebd_table()
                .map(EbdConversion::Table)
        }
    }
}
