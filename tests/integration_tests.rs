//! Integration tests for the EBD extraction library
//!
//! The documents are real .docx containers assembled in memory, so every test
//! runs through the zip/XML reader as well.

use ebd_docx::{
    convert, extract_all, extract_ebd_table, get_all_ebd_keys, get_ebd_docx_tables,
    list_all_keys, locate_tables, ChapterPosition, Document, DocxTableConverter, EbdCheckResult,
    EbdConversion, EbdDocxTables, EbdError, EbdKey, EbdTableSubRow, HeaderColumn, KeyOutcome,
    END_MARKER,
};
use std::io::{Cursor, Write};

// ============================================================================
// Document builder
// ============================================================================

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

/// Right arrow as Word stores it when typed with the Wingdings font
const WINGDINGS_ARROW: &str = r#"<w:r><w:sym w:font="Wingdings" w:char="F0E0"/></w:r>"#;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn run(text: &str) -> String {
    format!(r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#, escape(text))
}

enum Cell {
    Text(String),
    Raw(String),
    Span(String, usize),
}

fn t(text: &str) -> Cell {
    Cell::Text(text.to_string())
}

/// `ja`/`nein` followed by a Wingdings arrow and the next step
fn arrow(answer: &str, next: &str) -> Cell {
    Cell::Raw(format!("{}{}{}", run(answer), WINGDINGS_ARROW, run(next)))
}

fn span(text: &str, columns: usize) -> Vec<Cell> {
    vec![Cell::Span(text.to_string(), columns)]
}

fn data_row(cells: [&str; 5]) -> Vec<Cell> {
    cells.iter().map(|c| t(c)).collect()
}

fn header_rows(role: &str) -> Vec<Vec<Cell>> {
    vec![
        span(&format!("Prüfende Rolle: {role}"), 5),
        data_row(["Nr.", "Prüfschritt", "Prüfergebnis", "Code", "Hinweis"]),
    ]
}

#[derive(Default)]
struct DocxBuilder {
    body: String,
}

impl DocxBuilder {
    fn heading(mut self, level: u8, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="berschrift{level}"/></w:pPr>{}</w:p>"#,
            run(text)
        ));
        self
    }

    fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&format!("<w:p>{}</w:p>", run(text)));
        self
    }

    fn blank(mut self) -> Self {
        self.body.push_str("<w:p/>");
        self
    }

    fn table(mut self, rows: Vec<Vec<Cell>>) -> Self {
        self.body.push_str("<w:tbl>");
        for row in rows {
            self.body.push_str("<w:tr>");
            for cell in row {
                let (props, content) = match cell {
                    Cell::Text(text) => (String::new(), run(&text)),
                    Cell::Raw(xml) => (String::new(), xml),
                    Cell::Span(text, n) => (
                        format!(r#"<w:tcPr><w:gridSpan w:val="{n}"/></w:tcPr>"#),
                        run(&text),
                    ),
                };
                self.body
                    .push_str(&format!("<w:tc>{props}<w:p>{content}</w:p></w:tc>"));
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        self
    }

    fn build(&self) -> Vec<u8> {
        let document_xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            self.body
        );
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(document_xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }
}

const E_0402_REMARK: &str = "Derzeit ist für diese Entscheidung kein Entscheidungsbaum notwendig, da keine Antwort gegeben wird. Der Netzbetreiber muss prüfen, ob eine Abmeldeanfrage zu senden ist.";

fn four_steps(first: u32) -> Vec<Vec<Cell>> {
    let mut rows = Vec::new();
    for step in first..first + 2 {
        rows.push(vec![
            t(&step.to_string()),
            t(&format!("Prüfung {step}?")),
            arrow("ja", &(step + 1).to_string()),
            t(""),
            t(""),
        ]);
        rows.push(data_row(["", "", "nein", &format!("A{step:02}"), ""]));
    }
    rows
}

/// A reference document covering the scenarios of the converter
fn reference_document() -> Vec<u8> {
    let mut e_0003 = header_rows("ÜNB");
    e_0003.push(data_row([
        "1",
        "Erfolgt der Eingang der Bestellung fristgerecht?",
        "nein",
        "A01",
        "Fristüberschreitung",
    ]));
    e_0003.push(vec![t(""), t(""), arrow("ja", "2"), t(""), t("")]);
    e_0003.push(data_row([
        "2",
        "Erfolgt die Bestellung zum Monatsersten 00:00 Uhr?",
        "nein",
        "A02",
        "Gewählter Zeitpunkt nicht zulässig",
    ]));
    e_0003.push(vec![t(""), t(""), arrow("ja", "Ende"), t(""), t("")]);

    let mut e_0901_first = header_rows("NB");
    e_0901_first.extend(four_steps(1));
    let e_0901_second = four_steps(3);

    let mut e_0453 = header_rows("LF");
    e_0453.extend(four_steps(1));
    e_0453.push(data_row(["3", "Prüfung 3?", "ja ➔ 4", "", ""]));
    e_0453.push(data_row(["", "", "nein", "A03", ""]));
    e_0453.push(span(
        "Hinweis: Die Schritte 4 und 5 sind für jede Marktlokation durchzuführen.",
        5,
    ));
    e_0453.push(data_row(["4", "Prüfung 4?", "ja ➔ 5", "", ""]));
    e_0453.push(data_row(["", "", "nein", "A04", ""]));
    e_0453.push(data_row(["5", "Prüfung 5?", "ja ➔ Ende", "", ""]));
    e_0453.push(data_row(["", "", "nein", "A05", ""]));

    let mut e_0060 = header_rows("BIKO");
    e_0060.push(data_row(["1", "Datenstatus vergeben", "--", "--", ""]));
    e_0060.push(data_row(["", "", "--", "--", ""]));

    let mut e_1020 = header_rows("NB");
    e_1020.push(data_row(["", "Freitext statt Schrittnummer", "ja", "", ""]));
    e_1020.push(data_row(["", "", "nein", "A01", ""]));

    DocxBuilder::default()
        .paragraph("Entscheidungsbaum-Diagramme")
        .heading(1, "GPKE")
        .heading(2, "AD: Stammdatensynchronisation")
        .heading(3, "E_0453_Änderung prüfen")
        .table(e_0453)
        .heading(2, "AD: Kündigung")
        .heading(3, "E_0402_Prüfen, ob Abmeldeanfrage zu senden")
        .paragraph(E_0402_REMARK)
        .heading(1, "MaBiS")
        .heading(2, "AD: Bestellung der Aggregationsebene")
        .heading(3, "E_0003_Bestellung der Aggregationsebene RZ prüfen")
        .blank()
        .table(e_0003)
        .heading(3, "E_0060_Datenstatus nach Eingang eines Deltazeitreihenübertrags vergeben")
        .table(e_0060)
        .heading(3, "E_1020_Unbekanntes Format")
        .table(e_1020)
        .heading(2, "AD: Ausfallarbeit")
        .heading(3, "E_0900_Ohne Tabelle und ohne Erklärung")
        .paragraph("Dieser Abschnitt wird noch erstellt.")
        .heading(3, "E_0901_Gegenvorschlag prüfen")
        .table(e_0901_first)
        .blank()
        .blank()
        .table(e_0901_second)
        .paragraph("Ende des Dokuments")
        .build()
}

fn reference() -> Document {
    Document::from_bytes(&reference_document()).unwrap()
}

fn key(k: &str) -> EbdKey {
    EbdKey::parse(k).unwrap()
}

fn convert_key(document: &Document, k: &str) -> Result<EbdConversion, EbdError> {
    let key = key(k);
    let tables = locate_tables(document.blocks(), &key)?;
    convert(&tables, &key, "Dummy Chapter", "Dummy Section", &format!("{k} Dummy Name"))
}

fn convert_table(document: &Document, k: &str) -> ebd_docx::EbdTable {
    match convert_key(document, k).unwrap() {
        EbdConversion::Table(table) => table,
        EbdConversion::NoTable(section) => panic!("{k} has no table: {}", section.remark),
    }
}

// ============================================================================
// Document reading
// ============================================================================

#[test]
fn test_open_from_path() {
    let mut file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
    file.write_all(&reference_document()).unwrap();
    file.flush().unwrap();

    let document = Document::open(file.path()).unwrap();
    assert_eq!(document, reference());
    assert_eq!(document.tables().count(), 6);
}

#[test]
fn test_open_missing_file() {
    let err = Document::open("/definitely/not/here.docx").unwrap_err();
    assert!(matches!(err, EbdError::Io(_)));
}

#[test]
fn test_open_container_without_document_part() {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"<x/>").unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let err = Document::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, EbdError::InvalidDocument(_)));
}

#[test]
fn test_blocks_interleave_paragraphs_and_tables() {
    let document = reference();
    let mut saw_table_after_paragraph = false;
    let mut previous_was_paragraph = false;
    for block in document.blocks() {
        match block {
            ebd_docx::Block::Paragraph(_) => previous_was_paragraph = true,
            ebd_docx::Block::Table(_) => {
                saw_table_after_paragraph |= previous_was_paragraph;
                previous_was_paragraph = false;
            }
        }
    }
    assert!(saw_table_after_paragraph);
}

// ============================================================================
// Key index
// ============================================================================

#[test]
fn test_list_all_keys() {
    let keys = list_all_keys(&reference());
    let names: Vec<&str> = keys.keys().map(EbdKey::as_str).collect();
    assert_eq!(
        names,
        vec!["E_0003", "E_0060", "E_0402", "E_0453", "E_0900", "E_0901", "E_1020"]
    );

    let (title, position) = &keys[&key("E_0003")];
    assert_eq!(title, "Bestellung der Aggregationsebene RZ prüfen");
    assert_eq!(*position, ChapterPosition::new(2, 1, 1));
    assert_eq!(position.chapter_title.as_deref(), Some("MaBiS"));

    let (_, position) = &keys[&key("E_0402")];
    assert_eq!(position.to_string(), "1.2.1");
    assert_eq!(position.section_title.as_deref(), Some("AD: Kündigung"));

    let (_, position) = &keys[&key("E_0901")];
    assert_eq!(position.to_string(), "2.2.2");
}

#[test]
fn test_get_all_ebd_keys_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&reference_document()).unwrap();
    let keys = get_all_ebd_keys(file.path()).unwrap();
    assert_eq!(keys.len(), 7);
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_scenario_a_simple_table() {
    let table = convert_table(&reference(), "E_0003");
    assert_eq!(table.metadata.role, "ÜNB");
    assert_eq!(table.metadata.ebd_code.as_str(), "E_0003");
    assert_eq!(table.rows.len(), 2);

    let first = &table.rows[0];
    assert_eq!(first.step_number, "1");
    assert_eq!(
        first.description,
        "Erfolgt der Eingang der Bestellung fristgerecht?"
    );
    assert_eq!(
        first.sub_rows,
        vec![
            EbdTableSubRow {
                check_result: EbdCheckResult {
                    result: false,
                    subsequent_step_number: None,
                },
                result_code: Some("A01".to_string()),
                note: Some("Fristüberschreitung".to_string()),
            },
            EbdTableSubRow {
                check_result: EbdCheckResult {
                    result: true,
                    subsequent_step_number: Some("2".to_string()),
                },
                result_code: None,
                note: None,
            },
        ]
    );

    let second_true = table.rows[1].true_branch().unwrap();
    assert_eq!(
        second_true.check_result.subsequent_step_number.as_deref(),
        Some(END_MARKER)
    );
}

#[test]
fn test_scenario_b_two_fragments() {
    let document = reference();
    let located = locate_tables(document.blocks(), &key("E_0901")).unwrap();
    assert_eq!(located.tables().len(), 2);

    let table = convert_table(&document, "E_0901");
    let steps: Vec<&str> = table.rows.iter().map(|r| r.step_number.as_str()).collect();
    assert_eq!(steps, vec!["1", "2", "3", "4"]);
    assert_eq!(table.rows[3].false_branch().unwrap().result_code.as_deref(), Some("A04"));
}

#[test]
fn test_scenario_c_multi_step_instruction() {
    let table = convert_table(&reference(), "E_0453");
    assert_eq!(table.rows.len(), 5);
    let instructions = table.multi_step_instructions.expect("one instruction");
    assert_eq!(instructions.len(), 1);
    assert_eq!(instructions[0].first_step_number_affected, "4");
    assert_eq!(
        instructions[0].instruction_text,
        "Hinweis: Die Schritte 4 und 5 sind für jede Marktlokation durchzuführen."
    );
}

#[test]
fn test_scenario_d_no_table_section() {
    let document = reference();
    let located = locate_tables(document.blocks(), &key("E_0402")).unwrap();
    match located {
        EbdDocxTables::NoTable(section) => assert_eq!(section.remark, E_0402_REMARK),
        other => panic!("expected a section without table, got {other:?}"),
    }
}

#[test]
fn test_scenario_e_placeholder_cells() {
    let err = convert_key(&reference(), "E_0060").unwrap_err();
    match err {
        EbdError::EbdTableNotConvertible { key, reason } => {
            assert_eq!(key.as_str(), "E_0060");
            assert!(reason.to_lowercase().contains("non-boolean") || reason.contains("--"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_scenario_f_no_step_number() {
    let err = convert_key(&reference(), "E_1020").unwrap_err();
    assert!(matches!(err, EbdError::StepNumberNotFound { ref key } if key.as_str() == "E_1020"));
    assert!(err.is_skippable());
    assert!(err.is_unsupported_layout());
}

#[test]
fn test_table_not_found() {
    let document = reference();
    for missing in ["E_0900", "E_9999"] {
        let err = locate_tables(document.blocks(), &key(missing)).unwrap_err();
        assert!(matches!(err, EbdError::TableNotFound { ref key } if key.as_str() == missing));
        assert!(err.is_skippable());
    }
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_located_tables_are_never_empty() {
    let document = reference();
    for key in list_all_keys(&document).keys() {
        match locate_tables(document.blocks(), key) {
            Ok(EbdDocxTables::Tables(tables)) => assert!(!tables.is_empty(), "{key}"),
            Ok(EbdDocxTables::NoTable(_)) => {}
            Err(err) => assert!(matches!(err, EbdError::TableNotFound { .. }), "{key}: {err}"),
        }
    }
}

#[test]
fn test_converted_rows_have_one_true_branch() {
    let report = extract_all(&reference());
    assert_eq!(report.converted_count(), 3);
    for table in report.converted() {
        for row in &table.rows {
            assert_eq!(row.sub_rows.len(), 2);
            assert_eq!(
                row.sub_rows.iter().filter(|s| s.check_result.result).count(),
                1
            );
        }
    }
}

#[test]
fn test_extraction_is_deterministic() {
    let first = convert_table(&reference(), "E_0453");
    let second = convert_table(&reference(), "E_0453");
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_batch_report_skips_failures() {
    let report = extract_all(&reference());
    assert_eq!(report.entries.len(), 7);
    assert_eq!(report.no_table_count(), 1);
    assert_eq!(report.failed_count(), 3);
    for entry in &report.entries {
        if let KeyOutcome::Failed(err) = &entry.outcome {
            assert!(err.is_skippable());
            assert_eq!(err.ebd_key(), Some(&entry.key));
        }
    }
}

// ============================================================================
// Path based entry points
// ============================================================================

#[test]
fn test_path_entry_points() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&reference_document()).unwrap();

    let located = get_ebd_docx_tables(file.path(), "E_0901").unwrap();
    assert_eq!(located.tables().len(), 2);

    let converted = extract_ebd_table(file.path(), "E_0003", "MaBiS", "2.1", "E_0003_x").unwrap();
    assert!(matches!(converted, EbdConversion::Table(ref t) if t.rows.len() == 2));

    let err = get_ebd_docx_tables(file.path(), "E_3").unwrap_err();
    assert!(matches!(err, EbdError::InvalidKeyFormat { .. }));
    assert!(!err.is_skippable());
}

#[test]
fn test_converter_reports_missing_header_column() {
    let bytes = DocxBuilder::default()
        .heading(3, "E_0777_Alte Tabelle")
        .table(vec![
            span("Prüfende Rolle: NB", 4),
            data_row(["Schritt", "Prüfschritt", "Prüfergebnis", "Code", "Hinweis"]),
            data_row(["1", "Frage?", "ja", "", ""]),
            data_row(["", "", "nein", "A01", ""]),
        ])
        .build();
    let document = Document::from_bytes(&bytes).unwrap();
    let k = key("E_0777");
    let located = locate_tables(document.blocks(), &k).unwrap();
    let err = DocxTableConverter::new(located.tables(), &k, "c", "s", "n").unwrap_err();
    assert!(matches!(
        err,
        EbdError::HeaderColumnNotResolved {
            column: HeaderColumn::StepNumber,
            ..
        }
    ));
}
