//! Book rendering: chapter reconstruction, pagination, table of
//! contents, and stable citation anchors.

pub mod chapters;
pub mod document;
pub mod options;
pub mod progress;

pub use chapters::{Chapter, ChapterBreak, HeadingChapterBreak, plain_text, reconstruct_chapters};
pub use document::{
    Citation, DocumentRenderer, Page, ParagraphSource, RenderError, RenderedDocument, TocEntry,
};
pub use options::{
    FontFamily, NumberFormat, PageSize, PaginationStyle, ParaIdVisibility, RenderOptions,
    TocOptions,
};
pub use progress::{RenderProgress, RenderStage};
