//! WordprocessingML body reader
//!
//! Reads `word/document.xml` from the zip container and turns the children of
//! `w:body` into [`BodyElement`]s. Only what the EBD extraction needs is kept:
//! paragraph text with its style id, and tables as rows of physical cells.

use crate::document::{BodyElement, Paragraph, Table, TableCell, TableRow};
use crate::EbdError;
use roxmltree::{Document as XmlDoc, Node};
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

/// Parse the body of a .docx container
pub(crate) fn read_body_elements(buffer: &[u8]) -> Result<Vec<BodyElement>, EbdError> {
    let mut zip = ZipArchive::new(Cursor::new(buffer))?;
    let xml_text = read_zip_text(&mut zip, DOCUMENT_PART)?;
    let xml = XmlDoc::parse(strip_bom(&xml_text))?;

    let body = xml
        .descendants()
        .find(|n| is_tag(n, "body"))
        .ok_or_else(|| EbdError::InvalidDocument(format!("{DOCUMENT_PART} has no w:body")))?;

    let mut elements = Vec::new();
    collect_block_children(&body, &mut elements);
    log::debug!("Read {} body elements", elements.len());
    Ok(elements)
}

fn read_zip_text<R: Read + Seek>(zip: &mut ZipArchive<R>, path: &str) -> Result<String, EbdError> {
    let mut file = zip
        .by_name(path)
        .map_err(|_| EbdError::InvalidDocument(format!("missing {path} in container")))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| EbdError::InvalidDocument(format!("cannot read {path}: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| EbdError::InvalidDocument(format!("{path} is not valid UTF-8: {e}")))
}

fn strip_bom(s: &str) -> &str {
    const BOM: char = '\u{FEFF}';
    s.strip_prefix(BOM).unwrap_or(s)
}

fn is_tag(node: &Node, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local
}

fn get_attr_local<'a>(node: &Node<'a, 'a>, local: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == local)
        .map(|a| a.value())
}

fn child<'a>(node: &Node<'a, 'a>, local: &str) -> Option<Node<'a, 'a>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == local)
}

fn children<'a, 'b>(
    node: &Node<'a, 'a>,
    local: &'b str,
) -> impl Iterator<Item = Node<'a, 'a>> + use<'a, 'b> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == local)
}

/// Gallery of the content control Word wraps its generated table of contents in
const TOC_GALLERY: &str = "Table of Contents";

fn is_table_of_contents(sdt: &Node) -> bool {
    child(sdt, "sdtPr")
        .and_then(|pr| child(&pr, "docPartObj"))
        .and_then(|obj| child(&obj, "docPartGallery"))
        .and_then(|gallery| get_attr_local(&gallery, "val"))
        == Some(TOC_GALLERY)
}

/// Walk block-level children; content controls (`w:sdt`) are transparent,
/// except for the table of contents, whose entries repeat the headings
fn collect_block_children(parent: &Node, out: &mut Vec<BodyElement>) {
    for node in parent.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "p" => out.push(BodyElement::Paragraph(parse_paragraph(&node))),
            "tbl" => out.push(BodyElement::Table(parse_table(&node))),
            "sdt" if is_table_of_contents(&node) => {
                log::debug!("Skipping table of contents");
            }
            "sdt" => {
                if let Some(content) = child(&node, "sdtContent") {
                    collect_block_children(&content, out);
                }
            }
            _ => {}
        }
    }
}

fn parse_paragraph(p: &Node) -> Paragraph {
    let style_id = child(p, "pPr")
        .and_then(|ppr| child(&ppr, "pStyle"))
        .and_then(|n| get_attr_local(&n, "val"));
    let mut text = String::new();
    append_run_text(p, &mut text);
    Paragraph::new(text, style_id)
}

/// Append the visible text below `node`
fn append_run_text(node: &Node, out: &mut String) {
    for element in node.children().filter(|n| n.is_element()) {
        match element.tag_name().name() {
            "t" => out.push_str(element.text().unwrap_or_default()),
            "tab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            "noBreakHyphen" => out.push('-'),
            "sym" => {
                if let Some(ch) = symbol_char(&element) {
                    out.push(ch);
                }
            }
            // properties, deletions and text boxes carry no paragraph text
            "pPr" | "rPr" | "del" | "delText" | "instrText" | "txbxContent" => {}
            _ => append_run_text(&element, out),
        }
    }
}

/// `w:sym w:char="F0E0"` (Wingdings arrow) -> U+F0E0
fn symbol_char(sym: &Node) -> Option<char> {
    let code = get_attr_local(sym, "char")?;
    u32::from_str_radix(code, 16).ok().and_then(char::from_u32)
}

fn parse_table(tbl: &Node) -> Table {
    let rows = children(tbl, "tr")
        .map(|tr| TableRow::new(children(&tr, "tc").map(|tc| parse_cell(&tc)).collect()))
        .collect();
    Table::new(rows)
}

fn parse_cell(tc: &Node) -> TableCell {
    let grid_span = child(tc, "tcPr")
        .and_then(|pr| child(&pr, "gridSpan"))
        .and_then(|n| get_attr_local(&n, "val"))
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1);
    let text = children(tc, "p")
        .map(|p| {
            let mut s = String::new();
            append_run_text(&p, &mut s);
            s
        })
        .collect::<Vec<_>>()
        .join("\n");
    TableCell::spanning(text, grid_span)
}
