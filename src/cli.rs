//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use scriptorium_core::render::{
    FontFamily, NumberFormat, PageSize, PaginationStyle, ParaIdVisibility, RenderOptions,
    TocOptions,
};

/// Mirror a remote writings catalog and render books into paginated,
/// citable documents.
#[derive(Parser, Debug)]
#[command(name = "scriptorium")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the settings file
    #[arg(long, default_value = "scriptorium.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl the remote catalog into the local store
    Crawl {
        /// Restrict the crawl to these language codes (comma-separated)
        #[arg(long, value_delimiter = ',')]
        languages: Option<Vec<String>>,

        /// Also download book content (chapters and paragraphs)
        #[arg(long)]
        download_content: bool,

        /// Cap on books fetched per folder, for bounded sampling runs
        #[arg(long)]
        max_books: Option<u32>,

        /// Books requested per page (1-500)
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..=500))]
        page_size: u32,
    },

    /// Full-text search over downloaded paragraphs
    Search {
        /// Search query
        query: String,

        /// Maximum hits to show
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=500))]
        limit: u32,

        /// Hits to skip (for paging)
        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Query the remote search endpoint instead of the local store
        #[arg(long)]
        remote: bool,

        /// Restrict a remote search to one language code
        #[arg(long, requires = "remote")]
        language: Option<String>,

        /// Show remote query suggestions instead of search results
        #[arg(long, conflicts_with_all = ["remote", "language"])]
        suggest: bool,
    },

    /// Render a book into a paginated plain-text document
    Render {
        /// Book id to render
        book_id: i64,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Page size
        #[arg(long, value_enum, default_value_t = PageSizeArg::A4)]
        page_size: PageSizeArg,

        /// Body font
        #[arg(long, value_enum, default_value_t = FontArg::Times)]
        font: FontArg,

        /// Paragraph-id visibility
        #[arg(long, value_enum, default_value_t = ParaIdArg::Hidden)]
        para_ids: ParaIdArg,

        /// Page-number placement
        #[arg(long, value_enum, default_value_t = PaginationArg::BottomCenter)]
        pagination: PaginationArg,

        /// Page-number format
        #[arg(long, value_enum, default_value_t = NumberFormatArg::Numeric)]
        number_format: NumberFormatArg,

        /// First page number
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        start_number: u32,

        /// Skip the table of contents
        #[arg(long)]
        no_toc: bool,

        /// Start the body on the same page as the table of contents
        #[arg(long)]
        no_toc_page_break: bool,
    },

    /// Download a book's binary archive
    Download {
        /// Book id to download
        book_id: i64,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Show catalog statistics
    Stats,

    /// Export the catalog snapshot as JSON
    Export {
        /// Output file
        #[arg(short, long, default_value = "catalog.json")]
        output: PathBuf,
    },

    /// Token management
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Show the persisted token's state
    Status,
    /// Acquire a fresh token with client credentials
    Login,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSizeArg {
    A4,
    Letter,
    Legal,
}

impl From<PageSizeArg> for PageSize {
    fn from(arg: PageSizeArg) -> Self {
        match arg {
            PageSizeArg::A4 => Self::A4,
            PageSizeArg::Letter => Self::Letter,
            PageSizeArg::Legal => Self::Legal,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontArg {
    Times,
    Helvetica,
    Courier,
}

impl From<FontArg> for FontFamily {
    fn from(arg: FontArg) -> Self {
        match arg {
            FontArg::Times => Self::Times,
            FontArg::Helvetica => Self::Helvetica,
            FontArg::Courier => Self::Courier,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParaIdArg {
    Inline,
    Footnote,
    Margin,
    Hidden,
}

impl From<ParaIdArg> for ParaIdVisibility {
    fn from(arg: ParaIdArg) -> Self {
        match arg {
            ParaIdArg::Inline => Self::Inline,
            ParaIdArg::Footnote => Self::Footnote,
            ParaIdArg::Margin => Self::Margin,
            ParaIdArg::Hidden => Self::Hidden,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationArg {
    BottomCenter,
    BottomRight,
    TopCenter,
    TopRight,
}

impl From<PaginationArg> for PaginationStyle {
    fn from(arg: PaginationArg) -> Self {
        match arg {
            PaginationArg::BottomCenter => Self::BottomCenter,
            PaginationArg::BottomRight => Self::BottomRight,
            PaginationArg::TopCenter => Self::TopCenter,
            PaginationArg::TopRight => Self::TopRight,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormatArg {
    Numeric,
    Roman,
    Alpha,
}

impl From<NumberFormatArg> for NumberFormat {
    fn from(arg: NumberFormatArg) -> Self {
        match arg {
            NumberFormatArg::Numeric => Self::Numeric,
            NumberFormatArg::Roman => Self::Roman,
            NumberFormatArg::Alpha => Self::Alpha,
        }
    }
}

impl Command {
    /// Builds render options from the render subcommand's flags.
    /// Returns `None` for any other subcommand.
    pub fn render_options(&self) -> Option<RenderOptions> {
        let Self::Render {
            page_size,
            font,
            para_ids,
            pagination,
            number_format,
            start_number,
            no_toc,
            no_toc_page_break,
            ..
        } = self
        else {
            return None;
        };

        let toc = if *no_toc {
            None
        } else {
            Some(TocOptions {
                page_break_after: !no_toc_page_break,
                ..TocOptions::default()
            })
        };

        Some(RenderOptions {
            page_size: (*page_size).into(),
            font: (*font).into(),
            para_ids: (*para_ids).into(),
            pagination: (*pagination).into(),
            number_format: (*number_format).into(),
            start_number: *start_number,
            toc,
        })
    }
}
