//! Chapter/section tracking and the index of all EBD keys in a document
//!
//! Headings are recognized by their Word style id. Every paragraph is paired
//! with the position (`chapter.section.subsection`) that is valid where it
//! appears, so an EBD heading like `E_0400_Kündigung Stromliefervertrag prüfen`
//! can be located as e.g. `6.1.1`.

use crate::document::{Document, Paragraph};
use crate::key::{split_key_heading, EbdKey};
use crate::EbdError;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Heading level derived from a paragraph style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    Chapter,
    Section,
    Subsection,
}

impl HeadingLevel {
    /// German Word templates drop the `Ü` of `Überschrift` from the style id.
    pub fn from_style_id(style_id: &str) -> Option<Self> {
        match style_id {
            "berschrift1" | "Heading1" => Some(Self::Chapter),
            "berschrift2" | "Heading2" => Some(Self::Section),
            "berschrift3" | "Heading3" => Some(Self::Subsection),
            _ => None,
        }
    }

    pub fn of(paragraph: &Paragraph) -> Option<Self> {
        paragraph.style_id.as_deref().and_then(Self::from_style_id)
    }
}

/// Where a paragraph sits in the heading hierarchy
///
/// Equality and ordering only look at the numbers; titles are informative.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterPosition {
    pub chapter: u32,
    pub chapter_title: Option<String>,
    pub section: u32,
    pub section_title: Option<String>,
    pub subsection: u32,
    pub subsection_title: Option<String>,
}

impl ChapterPosition {
    /// Position without titles; all components must be >= 1
    pub fn new(chapter: u32, section: u32, subsection: u32) -> Self {
        Self {
            chapter: chapter.max(1),
            chapter_title: None,
            section: section.max(1),
            section_title: None,
            subsection: subsection.max(1),
            subsection_title: None,
        }
    }

    fn numbers(&self) -> (u32, u32, u32) {
        (self.chapter, self.section, self.subsection)
    }
}

impl Default for ChapterPosition {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl PartialEq for ChapterPosition {
    fn eq(&self, other: &Self) -> bool {
        self.numbers() == other.numbers()
    }
}

impl Eq for ChapterPosition {}

impl PartialOrd for ChapterPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChapterPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numbers().cmp(&other.numbers())
    }
}

impl fmt::Display for ChapterPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.chapter, self.section, self.subsection)
    }
}

/// Counts headings per level; a level's count restarts whenever a higher
/// level heading appears.
#[derive(Debug, Default)]
struct HeadingCounters {
    chapters: u32,
    sections: u32,
    subsections: u32,
    chapter_title: Option<String>,
    section_title: Option<String>,
    subsection_title: Option<String>,
}

impl HeadingCounters {
    fn observe(&mut self, paragraph: &Paragraph) {
        let Some(level) = HeadingLevel::of(paragraph) else {
            return;
        };
        let title = Some(paragraph.text.trim().to_string());
        match level {
            HeadingLevel::Chapter => {
                self.chapters += 1;
                self.sections = 0;
                self.subsections = 0;
                self.chapter_title = title;
                self.section_title = None;
                self.subsection_title = None;
            }
            HeadingLevel::Section => {
                self.sections += 1;
                self.subsections = 0;
                self.section_title = title;
                self.subsection_title = None;
            }
            HeadingLevel::Subsection => {
                self.subsections += 1;
                self.subsection_title = title;
            }
        }
    }

    fn position(&self) -> ChapterPosition {
        ChapterPosition {
            chapter: self.chapters.max(1),
            chapter_title: self.chapter_title.clone(),
            section: self.sections.max(1),
            section_title: self.section_title.clone(),
            subsection: self.subsections.max(1),
            subsection_title: self.subsection_title.clone(),
        }
    }
}

/// Lazily pair every paragraph with the chapter position valid at that point
pub fn enrich_paragraphs_with_sections<'a, I>(
    paragraphs: I,
) -> impl Iterator<Item = (&'a Paragraph, ChapterPosition)>
where
    I: IntoIterator<Item = &'a Paragraph>,
{
    let mut counters = HeadingCounters::default();
    paragraphs.into_iter().map(move |paragraph| {
        counters.observe(paragraph);
        (paragraph, counters.position())
    })
}

/// All EBD keys of a document with their title and position
pub type EbdKeyIndex = BTreeMap<EbdKey, (String, ChapterPosition)>;

/// Scan paragraphs for `E_dddd_<title>` headings
///
/// A key found twice keeps its last occurrence.
pub fn collect_ebd_keys<'a, I>(paragraphs: I) -> EbdKeyIndex
where
    I: IntoIterator<Item = &'a Paragraph>,
{
    let mut result = EbdKeyIndex::new();
    for (paragraph, position) in enrich_paragraphs_with_sections(paragraphs) {
        let Some((key, title)) = split_key_heading(&paragraph.text) else {
            continue;
        };
        log::debug!("Found EBD {key}: '{title}' ({position})");
        if let Some((previous_title, previous_position)) =
            result.insert(key.clone(), (title, position))
        {
            log::warn!(
                "EBD {key} appears more than once; '{previous_title}' ({previous_position}) is overwritten"
            );
        }
    }
    log::info!("{} EBD keys have been found", result.len());
    result
}

/// Extract all EBD keys from an opened document
pub fn list_all_keys(document: &Document) -> EbdKeyIndex {
    collect_ebd_keys(document.paragraphs())
}

/// Open the file at `path` and extract all EBD keys
pub fn get_all_ebd_keys<P: AsRef<Path>>(path: P) -> Result<EbdKeyIndex, EbdError> {
    let document = Document::open(path)?;
    Ok(list_all_keys(&document))
}
