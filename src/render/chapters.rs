//! Chapter reconstruction from a flat, ordered paragraph stream.
//!
//! Boundary detection is inherently best-effort, so it lives behind the
//! [`ChapterBreak`] predicate: element type is the primary signal and a
//! text pattern the fallback. Swapping the predicate never touches the
//! rest of the renderer.

use regex::Regex;

use crate::store::Paragraph;

/// A reconstructed chapter. Derived at render time, never persisted.
#[derive(Debug, Clone)]
pub struct Chapter {
    /// 1-based chapter number.
    pub number: u32,
    /// Chapter title, taken from the marker paragraph when one exists.
    pub title: String,
    /// Paragraphs of the chapter, in order, marker included.
    pub paragraphs: Vec<Paragraph>,
}

/// Decides whether a paragraph starts a new chapter.
pub trait ChapterBreak: Send + Sync {
    /// True when `paragraph` is a chapter boundary.
    fn is_chapter_start(&self, paragraph: &Paragraph) -> bool;
}

/// Element types treated as chapter markers.
const HEADING_TYPES: [&str; 3] = ["heading", "chapter-title", "h1"];

/// Default boundary predicate: heading element types first, then a
/// chapter-marker pattern over the plain text.
#[derive(Debug)]
pub struct HeadingChapterBreak {
    marker: Regex,
}

impl Default for HeadingChapterBreak {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadingChapterBreak {
    /// Creates the default predicate.
    ///
    /// # Panics
    ///
    /// Never panics; the pattern is a checked constant.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            marker: Regex::new(r"(?i)^\s*(chapter|part)\s+([0-9]+|[ivxlcdm]+)\b")
                .expect("chapter marker pattern is valid"),
        }
    }
}

impl ChapterBreak for HeadingChapterBreak {
    fn is_chapter_start(&self, paragraph: &Paragraph) -> bool {
        if HEADING_TYPES
            .iter()
            .any(|t| paragraph.element_type.eq_ignore_ascii_case(t))
        {
            return true;
        }
        self.marker.is_match(&plain_text(&paragraph.content))
    }
}

/// Reconstructs chapters by scanning paragraphs in order.
///
/// A boundary paragraph starts a new chapter and belongs to it. The
/// first chapter implicitly starts at the first paragraph even without a
/// marker; a book with zero markers yields a single chapter.
#[must_use]
pub fn reconstruct_chapters(
    paragraphs: Vec<Paragraph>,
    predicate: &dyn ChapterBreak,
) -> Vec<Chapter> {
    let mut chapters: Vec<Chapter> = Vec::new();

    for paragraph in paragraphs {
        let starts_new = predicate.is_chapter_start(&paragraph) || chapters.is_empty();
        if starts_new {
            #[allow(clippy::cast_possible_truncation)]
            let number = (chapters.len() + 1) as u32;
            let marker_text = plain_text(&paragraph.content);
            let title = if predicate.is_chapter_start(&paragraph) && !marker_text.is_empty() {
                marker_text
            } else {
                format!("Chapter {number}")
            };
            chapters.push(Chapter {
                number,
                title,
                paragraphs: Vec::new(),
            });
        }
        // chapters is non-empty here by construction
        if let Some(current) = chapters.last_mut() {
            current.paragraphs.push(paragraph);
        }
    }

    chapters
}

/// Strips markup from rich paragraph content and collapses whitespace.
/// Handles the handful of entities the remote content actually uses.
#[must_use]
pub fn plain_text(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    for ch in content.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    let decoded = out
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
