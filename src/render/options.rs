//! Enumerated formatting configuration for document rendering.
//!
//! Configuration affects layout only. Citation identity is computed
//! before layout and never depends on anything in this module.

/// Output page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    /// ISO A4.
    A4,
    /// US Letter.
    Letter,
    /// US Legal.
    Legal,
    /// Explicit text geometry.
    Custom {
        /// Text columns per line.
        columns: usize,
        /// Lines per page.
        lines: usize,
    },
}

impl PageSize {
    /// Text geometry as (columns, lines per page).
    #[must_use]
    pub fn geometry(self) -> (usize, usize) {
        match self {
            Self::A4 => (80, 54),
            Self::Letter => (78, 50),
            Self::Legal => (78, 64),
            Self::Custom { columns, lines } => (columns.max(20), lines.max(4)),
        }
    }
}

/// Body font family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    /// Times (serif).
    Times,
    /// Helvetica (sans).
    Helvetica,
    /// Courier (monospace).
    Courier,
}

impl FontFamily {
    /// Horizontal density relative to Times, in percent. Courier glyphs
    /// are wider, so fewer columns fit on a line.
    #[must_use]
    pub fn column_percent(self) -> usize {
        match self {
            Self::Times => 100,
            Self::Helvetica => 96,
            Self::Courier => 82,
        }
    }
}

/// Where paragraph ids appear in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParaIdVisibility {
    /// Prefixed to the paragraph text.
    Inline,
    /// Collected at the bottom of each page.
    Footnote,
    /// Shown in a left gutter next to the first line.
    Margin,
    /// Not shown.
    Hidden,
}

/// Page-number placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// Centered footer.
    BottomCenter,
    /// Right-aligned footer.
    BottomRight,
    /// Centered header.
    TopCenter,
    /// Right-aligned header.
    TopRight,
}

impl PaginationStyle {
    /// True when the page number renders above the body.
    #[must_use]
    pub fn is_top(self) -> bool {
        matches!(self, Self::TopCenter | Self::TopRight)
    }

    /// True when the page number is right-aligned.
    #[must_use]
    pub fn is_right(self) -> bool {
        matches!(self, Self::BottomRight | Self::TopRight)
    }
}

/// Page-number format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    /// 1, 2, 3, ...
    Numeric,
    /// i, ii, iii, ...
    Roman,
    /// a, b, ..., z, aa, ...
    Alpha,
}

impl NumberFormat {
    /// Formats a 1-based page number.
    #[must_use]
    pub fn format(self, number: u32) -> String {
        match self {
            Self::Numeric => number.to_string(),
            Self::Roman => to_roman(number),
            Self::Alpha => to_alpha(number),
        }
    }
}

/// Table-of-contents options.
#[derive(Debug, Clone, Copy)]
pub struct TocOptions {
    /// Maximum entry depth; chapters are depth 1, so 0 suppresses all
    /// entries while still emitting the TOC heading.
    pub max_depth: u32,
    /// Force the body to start on a fresh page after the TOC.
    pub page_break_after: bool,
}

impl Default for TocOptions {
    fn default() -> Self {
        Self {
            max_depth: 1,
            page_break_after: true,
        }
    }
}

/// Complete formatting configuration.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Page size.
    pub page_size: PageSize,
    /// Body font.
    pub font: FontFamily,
    /// Paragraph-id visibility.
    pub para_ids: ParaIdVisibility,
    /// Page-number placement.
    pub pagination: PaginationStyle,
    /// Page-number format.
    pub number_format: NumberFormat,
    /// First page number.
    pub start_number: u32,
    /// TOC generation; `None` renders no TOC.
    pub toc: Option<TocOptions>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            font: FontFamily::Times,
            para_ids: ParaIdVisibility::Hidden,
            pagination: PaginationStyle::BottomCenter,
            number_format: NumberFormat::Numeric,
            start_number: 1,
            toc: Some(TocOptions::default()),
        }
    }
}

impl RenderOptions {
    /// Effective text columns: page width scaled by the font's density.
    #[must_use]
    pub fn effective_columns(&self) -> usize {
        let (columns, _) = self.page_size.geometry();
        (columns * self.font.column_percent() / 100).max(20)
    }

    /// Lines available on a page for body text, after reserving the
    /// page-number line and, in footnote mode, the footnote line.
    #[must_use]
    pub fn body_lines_per_page(&self) -> usize {
        let (_, lines) = self.page_size.geometry();
        let reserved = if self.para_ids == ParaIdVisibility::Footnote {
            2
        } else {
            1
        };
        lines.saturating_sub(reserved).max(1)
    }
}

/// Lowercase roman numerals; 0 is rendered as "0" (never produced for
/// 1-based page numbers).
fn to_roman(mut number: u32) -> String {
    if number == 0 {
        return "0".to_string();
    }
    const TABLE: [(u32, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, glyph) in TABLE {
        while number >= value {
            out.push_str(glyph);
            number -= value;
        }
    }
    out
}

/// Bijective base-26 letters: 1 -> a, 26 -> z, 27 -> aa.
fn to_alpha(mut number: u32) -> String {
    if number == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while number > 0 {
        number -= 1;
        #[allow(clippy::cast_possible_truncation)]
        out.push(b'a' + (number % 26) as u8);
        number /= 26;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
