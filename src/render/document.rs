//! Document assembly: pagination, table of contents, and citation
//! anchors.
//!
//! Citation identity `(book_id, chapter_number, para_id)` is computed
//! from chapter reconstruction alone, before any layout, so re-rendering
//! with a different page size, font, or margin configuration can never
//! change it.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument};

use super::chapters::{Chapter, ChapterBreak, HeadingChapterBreak, plain_text, reconstruct_chapters};
use super::options::{ParaIdVisibility, RenderOptions};
use super::progress::{ProgressReporter, RenderProgress, RenderStage};
use crate::store::{Book, ContentStore, Paragraph, StoreError};

/// Gutter width for margin paragraph ids.
const MARGIN_GUTTER: usize = 10;

/// Where the renderer reads books and paragraphs from. The content store
/// is the production source; tests render from fixtures.
#[async_trait]
pub trait ParagraphSource: Send + Sync {
    /// Fetches the book record.
    async fn book(&self, book_id: i64) -> Result<Option<Book>, StoreError>;
    /// Fetches all paragraphs of the book in order.
    async fn paragraphs(&self, book_id: i64) -> Result<Vec<Paragraph>, StoreError>;
}

#[async_trait]
impl ParagraphSource for ContentStore {
    async fn book(&self, book_id: i64) -> Result<Option<Book>, StoreError> {
        self.get_book(book_id).await
    }

    async fn paragraphs(&self, book_id: i64) -> Result<Vec<Paragraph>, StoreError> {
        self.get_all_paragraphs(book_id).await
    }
}

/// Rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The book has zero paragraphs; rendering fails fast with this
    /// specific error, never a generic one.
    #[error("book {book_id} has no paragraphs to render")]
    InputMissing {
        /// The book without content.
        book_id: i64,
    },

    /// The book is not in the catalog at all.
    #[error("book {book_id} not found in the catalog")]
    BookNotFound {
        /// The unknown book id.
        book_id: i64,
    },

    /// Reading from the source failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A stable citation anchor for one paragraph.
///
/// The identity triple is `(book_id, chapter_number, para_id)`; the page
/// label is layout-dependent extra information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// Book id.
    pub book_id: i64,
    /// Chapter the paragraph landed in.
    pub chapter_number: u32,
    /// Paragraph id.
    pub para_id: String,
    /// Page label under the current formatting configuration.
    pub page_label: String,
}

/// One table-of-contents entry.
#[derive(Debug, Clone)]
pub struct TocEntry {
    /// Chapter number.
    pub chapter_number: u32,
    /// Chapter title.
    pub title: String,
    /// Page label where the chapter starts.
    pub page_label: String,
}

/// One laid-out page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Formatted page label.
    pub label: String,
    /// Page lines, including the page-number line.
    pub lines: Vec<String>,
}

/// The rendered artifact.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// Book id.
    pub book_id: i64,
    /// Book title.
    pub title: String,
    /// Embedded table of contents (empty when TOC was disabled).
    pub toc: Vec<TocEntry>,
    /// Laid-out pages.
    pub pages: Vec<Page>,
    /// Citation anchors for every paragraph.
    pub citations: Vec<Citation>,
}

impl RenderedDocument {
    /// Serializes the document as plain text, pages separated by form
    /// feeds.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.lines.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\u{000C}\n")
    }
}

/// Renders a book's ordered paragraph stream into a paginated document.
pub struct DocumentRenderer {
    options: RenderOptions,
    predicate: Box<dyn ChapterBreak>,
}

impl DocumentRenderer {
    /// Creates a renderer with the default chapter-break predicate.
    #[must_use]
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            predicate: Box::new(HeadingChapterBreak::new()),
        }
    }

    /// Replaces the chapter-break predicate.
    #[must_use]
    pub fn with_predicate(mut self, predicate: Box<dyn ChapterBreak>) -> Self {
        self.predicate = predicate;
        self
    }

    /// Renders the book, emitting progress events on `progress` when a
    /// sender is supplied. The renderer never blocks on the consumer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::BookNotFound`] for an unknown book,
    /// [`RenderError::InputMissing`] for a book with zero paragraphs,
    /// or [`RenderError::Store`] when reads fail.
    #[instrument(skip(self, source, progress))]
    pub async fn render(
        &self,
        source: &dyn ParagraphSource,
        book_id: i64,
        progress: Option<UnboundedSender<RenderProgress>>,
    ) -> Result<RenderedDocument, RenderError> {
        let mut reporter = ProgressReporter::new(progress);

        reporter.report(RenderStage::Fetching, 0, None);
        let book = source
            .book(book_id)
            .await?
            .ok_or(RenderError::BookNotFound { book_id })?;
        let paragraphs = source.paragraphs(book_id).await?;
        if paragraphs.is_empty() {
            return Err(RenderError::InputMissing { book_id });
        }
        reporter.report(RenderStage::Fetching, 10, None);

        // Chapter reconstruction fixes citation identity; everything
        // after this point is layout.
        let chapters = reconstruct_chapters(paragraphs, self.predicate.as_ref());
        reporter.report(RenderStage::Processing, 25, chapters.first().map(|c| c.title.as_str()));

        let layout = self.lay_out_body(&chapters, &mut reporter);
        reporter.report(RenderStage::Formatting, 70, None);

        let document = self.assemble(&book, &chapters, layout, &mut reporter);
        reporter.report(RenderStage::Complete, 100, None);

        info!(
            book_id,
            chapters = chapters.len(),
            pages = document.pages.len(),
            "document rendered"
        );
        Ok(document)
    }

    /// Wraps every paragraph into body lines, recording where each
    /// chapter and paragraph starts.
    fn lay_out_body(&self, chapters: &[Chapter], reporter: &mut ProgressReporter) -> BodyLayout {
        let columns = self.options.effective_columns();
        let mut layout = BodyLayout::default();

        let total = chapters.len().max(1);
        for (index, chapter) in chapters.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let percent = 30 + (40 * index / total) as u8;
            reporter.report(RenderStage::Formatting, percent, Some(&chapter.title));

            layout
                .chapter_starts
                .push((chapter.number, layout.lines.len()));

            for paragraph in &chapter.paragraphs {
                layout.paragraph_starts.push(ParagraphMark {
                    chapter_number: chapter.number,
                    para_id: paragraph.para_id.clone(),
                    line: layout.lines.len(),
                });

                let text = plain_text(&paragraph.content);
                match self.options.para_ids {
                    ParaIdVisibility::Inline => {
                        let prefixed = format!("[{}] {}", paragraph.para_id, text);
                        layout.lines.extend(wrap(&prefixed, columns));
                    }
                    ParaIdVisibility::Margin => {
                        let body_width = columns.saturating_sub(MARGIN_GUTTER).max(10);
                        for (i, line) in wrap(&text, body_width).into_iter().enumerate() {
                            let gutter = if i == 0 {
                                format!("{:<MARGIN_GUTTER$}", truncate(&paragraph.para_id, MARGIN_GUTTER - 1))
                            } else {
                                " ".repeat(MARGIN_GUTTER)
                            };
                            layout.lines.push(format!("{gutter}{line}"));
                        }
                    }
                    ParaIdVisibility::Footnote | ParaIdVisibility::Hidden => {
                        layout.lines.extend(wrap(&text, columns));
                    }
                }
                layout.lines.push(String::new());
            }
        }

        // No trailing blank after the final paragraph
        if layout.lines.last().is_some_and(String::is_empty) {
            layout.lines.pop();
        }
        layout
    }

    /// Builds TOC, pages, and citations from the body layout.
    fn assemble(
        &self,
        book: &Book,
        chapters: &[Chapter],
        layout: BodyLayout,
        reporter: &mut ProgressReporter,
    ) -> RenderedDocument {
        reporter.report(RenderStage::Rendering, 80, None);

        let columns = self.options.effective_columns();
        let per_page = self.options.body_lines_per_page();

        // TOC sizing is stable before page labels are known: one line
        // per entry plus the heading, so chapter pages can be computed
        // arithmetically.
        let (toc_line_count, show_entries) = match self.options.toc {
            Some(toc) => {
                let entries = if toc.max_depth >= 1 { chapters.len() } else { 0 };
                (2 + entries, toc.max_depth >= 1)
            }
            None => (0, false),
        };

        let body_start = match self.options.toc {
            Some(toc) if toc.page_break_after => toc_line_count.div_ceil(per_page) * per_page,
            Some(_) => toc_line_count + 1,
            None => 0,
        };

        let page_label = |line: usize| -> String {
            #[allow(clippy::cast_possible_truncation)]
            let page_index = (line / per_page) as u32;
            self.options
                .number_format
                .format(self.options.start_number + page_index)
        };

        let toc: Vec<TocEntry> = if show_entries {
            chapters
                .iter()
                .zip(&layout.chapter_starts)
                .map(|(chapter, (_, line))| TocEntry {
                    chapter_number: chapter.number,
                    title: chapter.title.clone(),
                    page_label: page_label(body_start + line),
                })
                .collect()
        } else {
            Vec::new()
        };

        // Assemble the full line stream: TOC first, then body.
        let mut all_lines: Vec<String> = Vec::new();
        if self.options.toc.is_some() {
            all_lines.push("Contents".to_string());
            all_lines.push(String::new());
            for entry in &toc {
                all_lines.push(toc_line(&entry.title, &entry.page_label, columns));
            }
            while all_lines.len() < body_start {
                all_lines.push(String::new());
            }
        }
        all_lines.extend(layout.lines);

        let citations: Vec<Citation> = layout
            .paragraph_starts
            .iter()
            .map(|mark| Citation {
                book_id: book.book_id,
                chapter_number: mark.chapter_number,
                para_id: mark.para_id.clone(),
                page_label: page_label(body_start + mark.line),
            })
            .collect();

        reporter.report(RenderStage::Rendering, 90, None);

        let mut pages = Vec::new();
        for (page_index, chunk) in all_lines.chunks(per_page).enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let label = self
                .options
                .number_format
                .format(self.options.start_number + page_index as u32);

            let mut body: Vec<String> = chunk.to_vec();
            body.resize(per_page, String::new());

            let mut lines = Vec::with_capacity(per_page + 2);
            let number_line = align_label(&label, columns, self.options.pagination.is_right());
            if self.options.pagination.is_top() {
                lines.push(number_line.clone());
            }
            lines.extend(body);

            if self.options.para_ids == ParaIdVisibility::Footnote {
                let page_start = page_index * per_page;
                let page_end = page_start + per_page;
                let ids: Vec<&str> = layout
                    .paragraph_starts
                    .iter()
                    .filter(|mark| {
                        let line = body_start + mark.line;
                        line >= page_start && line < page_end
                    })
                    .map(|mark| mark.para_id.as_str())
                    .collect();
                let footnote = if ids.is_empty() {
                    String::new()
                } else {
                    truncate(&format!("[{}]", ids.join(", ")), columns).to_string()
                };
                lines.push(footnote);
            }

            if !self.options.pagination.is_top() {
                lines.push(number_line);
            }

            pages.push(Page { label, lines });
        }

        RenderedDocument {
            book_id: book.book_id,
            title: book.title.clone(),
            toc,
            pages,
            citations,
        }
    }
}

/// Body layout intermediate: wrapped lines plus start positions.
#[derive(Debug, Default)]
struct BodyLayout {
    lines: Vec<String>,
    chapter_starts: Vec<(u32, usize)>,
    paragraph_starts: Vec<ParagraphMark>,
}

#[derive(Debug)]
struct ParagraphMark {
    chapter_number: u32,
    para_id: String,
    line: usize,
}

/// Greedy word wrap; words longer than the width are hard-split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        // Hard-split oversized words
        while word.chars().count() > width {
            let split: String = word.chars().take(width).collect();
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(split.clone());
            word = &word[split.len()..];
        }
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Builds a dotted TOC line: `title ..... label`.
fn toc_line(title: &str, label: &str, width: usize) -> String {
    let title = truncate(title, width.saturating_sub(label.len() + 5));
    let dots = width
        .saturating_sub(title.chars().count() + label.len() + 2)
        .max(1);
    format!("{title} {} {label}", ".".repeat(dots))
}

/// Positions a page label within the line width.
fn align_label(label: &str, width: usize, right: bool) -> String {
    if right {
        format!("{label:>width$}")
    } else {
        let pad = width.saturating_sub(label.chars().count()) / 2;
        format!("{}{label}", " ".repeat(pad))
    }
}

/// Truncates to at most `max` characters.
fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn test_wrap_hard_splits_long_words() {
        let lines = wrap("supercalifragilistic", 8);
        assert!(lines.len() >= 2);
        assert!(lines.iter().all(|l| l.chars().count() <= 8));
    }

    #[test]
    fn test_wrap_empty_text_yields_one_blank_line() {
        assert_eq!(wrap("", 10), vec![String::new()]);
    }

    #[test]
    fn test_toc_line_ends_with_label() {
        let line = toc_line("The First Morning", "3", 40);
        assert!(line.ends_with(" 3"));
        assert!(line.contains("..."));
        assert!(line.chars().count() <= 40);
    }

    #[test]
    fn test_align_label_right() {
        let line = align_label("iv", 10, true);
        assert_eq!(line.len(), 10);
        assert!(line.ends_with("iv"));
    }

    #[test]
    fn test_align_label_center() {
        let line = align_label("5", 11, false);
        assert_eq!(line.trim(), "5");
        assert!(line.starts_with("     "));
    }
}
