//! Derived book categorization.
//!
//! A pure function of `{author, title, type, code}`; recomputable at any
//! time and denormalized onto books at ingestion for fast filtering.
//! Same inputs always yield the same outputs.

/// A derived category/subcategory pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Categorization {
    /// Top-level category.
    pub category: &'static str,
    /// Subcategory within it.
    pub subcategory: &'static str,
}

const fn cat(category: &'static str, subcategory: &'static str) -> Categorization {
    Categorization {
        category,
        subcategory,
    }
}

/// Computes the category assignment for a book.
///
/// Signals are checked from most to least specific: explicit type first,
/// then code, then title keywords, then author presence. Matching is
/// case-insensitive. This function has no side effects; callers may only
/// use its output to fill the denormalized category fields.
#[must_use]
pub fn categorize(author: &str, title: &str, book_type: &str, code: &str) -> Categorization {
    let title_lower = title.to_lowercase();
    let type_lower = book_type.to_lowercase();

    match type_lower.as_str() {
        "bible" | "scripture" => return cat("Scripture", "Bible"),
        "dictionary" => return cat("Reference", "Dictionaries"),
        "periodical" | "periodical_page" => return cat("Periodicals", "Articles"),
        "manuscript" => return cat("Manuscripts", "Manuscripts"),
        "letter" => return cat("Manuscripts", "Letters"),
        "devotional" => return cat("Books", "Devotionals"),
        _ => {}
    }

    if code.eq_ignore_ascii_case("kjv") || code.eq_ignore_ascii_case("rsv") {
        return cat("Scripture", "Bible");
    }

    if title_lower.starts_with("letter ") || title_lower.starts_with("lt ") {
        return cat("Manuscripts", "Letters");
    }
    if title_lower.starts_with("manuscript ") || title_lower.starts_with("ms ") {
        return cat("Manuscripts", "Manuscripts");
    }
    if title_lower.contains("daily devotional") || title_lower.contains("morning watch") {
        return cat("Books", "Devotionals");
    }
    if title_lower.contains("life of") || title_lower.contains("biography") {
        return cat("Books", "Biography");
    }
    if title_lower.contains("testimonies") {
        return cat("Books", "Testimonies");
    }

    if author.trim().is_empty() {
        return cat("Reference", "General");
    }

    cat("Books", "General")
}
