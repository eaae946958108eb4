//! Integration tests for document rendering against a populated store.

use scriptorium_core::render::{
    DocumentRenderer, FontFamily, PageSize, ParaIdVisibility, RenderError, RenderOptions,
    RenderStage,
};
use scriptorium_core::store::{Book, ContentStore, Paragraph};

fn sample_book(book_id: i64) -> Book {
    Book {
        book_id,
        code: "SC".to_string(),
        language_code: "en".to_string(),
        folder_id: Some(10),
        title: "Steps to Christ".to_string(),
        author: "White, E.".to_string(),
        publication_year: Some(1892),
        page_count: Some(153),
        book_type: "book".to_string(),
        subtype: None,
        download_url: None,
        category: "Books".to_string(),
        subcategory: "General".to_string(),
    }
}

fn paragraph(book_id: i64, para_id: &str, element_type: &str, content: &str, order: i64) -> Paragraph {
    Paragraph {
        book_id,
        para_id: para_id.to_string(),
        prev_id: None,
        next_id: None,
        refcode_short: format!("SC {order}"),
        refcode_long: format!("Steps to Christ, p. {order}"),
        element_type: element_type.to_string(),
        content: content.to_string(),
        para_order: order,
    }
}

/// A two-chapter book with enough text to spill across pages.
async fn populated_store(book_id: i64) -> ContentStore {
    let store = ContentStore::in_memory().await.unwrap();
    store.upsert_book(&sample_book(book_id)).await.unwrap();

    let long_text = "Nature and revelation alike testify of God's love. ".repeat(30);
    let mut order = 1;
    for chapter in ["God's Love for Man", "The Sinner's Need of Christ"] {
        store
            .upsert_paragraph(&paragraph(book_id, &format!("{book_id}.{order}"), "heading", chapter, order))
            .await
            .unwrap();
        order += 1;
        for _ in 0..3 {
            store
                .upsert_paragraph(&paragraph(
                    book_id,
                    &format!("{book_id}.{order}"),
                    "paragraph",
                    &long_text,
                    order,
                ))
                .await
                .unwrap();
            order += 1;
        }
    }
    store
}

// ---- Citation identity across formatting configurations ----

#[tokio::test]
async fn test_citation_identity_is_independent_of_formatting() {
    let store = populated_store(5).await;

    let compact = DocumentRenderer::new(RenderOptions {
        page_size: PageSize::Letter,
        font: FontFamily::Courier,
        para_ids: ParaIdVisibility::Inline,
        ..RenderOptions::default()
    });
    let spacious = DocumentRenderer::new(RenderOptions {
        page_size: PageSize::A4,
        font: FontFamily::Times,
        toc: None,
        ..RenderOptions::default()
    });

    let a = compact.render(&store, 5, None).await.unwrap();
    let b = spacious.render(&store, 5, None).await.unwrap();

    let identity = |doc: &scriptorium_core::render::RenderedDocument| {
        doc.citations
            .iter()
            .map(|c| (c.book_id, c.chapter_number, c.para_id.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(
        identity(&a),
        identity(&b),
        "citation triples must not depend on page size, font, or TOC"
    );
    // Page labels are allowed to differ; geometry did
    assert_ne!(a.pages.len(), b.pages.len());
}

#[tokio::test]
async fn test_citations_cover_every_paragraph_in_order() {
    let store = populated_store(5).await;
    let document = DocumentRenderer::new(RenderOptions::default())
        .render(&store, 5, None)
        .await
        .unwrap();

    assert_eq!(document.citations.len(), 8);
    let ids: Vec<&str> = document.citations.iter().map(|c| c.para_id.as_str()).collect();
    assert_eq!(ids, ["5.1", "5.2", "5.3", "5.4", "5.5", "5.6", "5.7", "5.8"]);

    // First four paragraphs belong to chapter 1, the rest to chapter 2
    assert!(document.citations[..4].iter().all(|c| c.chapter_number == 1));
    assert!(document.citations[4..].iter().all(|c| c.chapter_number == 2));
}

// ---- Table of contents ----

#[tokio::test]
async fn test_toc_entries_point_at_chapter_pages() {
    let store = populated_store(5).await;
    let document = DocumentRenderer::new(RenderOptions::default())
        .render(&store, 5, None)
        .await
        .unwrap();

    assert_eq!(document.toc.len(), 2);
    assert_eq!(document.toc[0].title, "God's Love for Man");
    assert_eq!(document.toc[1].title, "The Sinner's Need of Christ");

    // With the default page break after the TOC, the body starts on page 2
    assert_eq!(document.toc[0].page_label, "2");

    // The TOC page itself lists both chapters with dotted leaders
    let first_page = document.pages[0].lines.join("\n");
    assert!(first_page.contains("Contents"));
    assert!(first_page.contains("God's Love for Man ."));
}

#[tokio::test]
async fn test_no_toc_renders_body_from_first_page() {
    let store = populated_store(5).await;
    let document = DocumentRenderer::new(RenderOptions {
        toc: None,
        ..RenderOptions::default()
    })
    .render(&store, 5, None)
    .await
    .unwrap();

    assert!(document.toc.is_empty());
    let first_page = document.pages[0].lines.join("\n");
    assert!(!first_page.contains("Contents"));
    assert!(first_page.contains("God's Love for Man"));
}

// ---- Paragraph-id visibility ----

#[tokio::test]
async fn test_footnote_mode_collects_ids_at_page_bottom() {
    let store = populated_store(5).await;
    let document = DocumentRenderer::new(RenderOptions {
        para_ids: ParaIdVisibility::Footnote,
        toc: None,
        ..RenderOptions::default()
    })
    .render(&store, 5, None)
    .await
    .unwrap();

    let first_page = document.pages[0].lines.join("\n");
    assert!(first_page.contains("[5.1"), "footnote line should list first-page paragraph ids");
}

#[tokio::test]
async fn test_hidden_mode_shows_no_paragraph_ids() {
    let store = populated_store(5).await;
    let document = DocumentRenderer::new(RenderOptions {
        toc: None,
        ..RenderOptions::default()
    })
    .render(&store, 5, None)
    .await
    .unwrap();

    assert!(!document.to_text().contains("5.1]"));
    // Citations still exist even when ids are not printed
    assert_eq!(document.citations.len(), 8);
}

// ---- Failure modes ----

#[tokio::test]
async fn test_book_without_paragraphs_fails_with_input_missing() {
    let store = ContentStore::in_memory().await.unwrap();
    store.upsert_book(&sample_book(9)).await.unwrap();

    let err = DocumentRenderer::new(RenderOptions::default())
        .render(&store, 9, None)
        .await
        .unwrap_err();
    assert!(
        matches!(err, RenderError::InputMissing { book_id: 9 }),
        "expected InputMissing, got: {err:?}"
    );
}

#[tokio::test]
async fn test_unknown_book_fails_with_book_not_found() {
    let store = ContentStore::in_memory().await.unwrap();
    let err = DocumentRenderer::new(RenderOptions::default())
        .render(&store, 404, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::BookNotFound { book_id: 404 }));
}

// ---- Progress events ----

#[tokio::test]
async fn test_progress_events_are_monotone_and_terminal() {
    let store = populated_store(5).await;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    DocumentRenderer::new(RenderOptions::default())
        .render(&store, 5, Some(tx))
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert!(!events.is_empty());

    let percents: Vec<u8> = events.iter().map(|e| e.percent).collect();
    let mut sorted = percents.clone();
    sorted.sort_unstable();
    assert_eq!(percents, sorted, "progress must never go backwards");

    let last = events.last().unwrap();
    assert_eq!(last.stage, RenderStage::Complete);
    assert_eq!(last.percent, 100);
}
