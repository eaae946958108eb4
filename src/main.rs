//! CLI entry point for the scriptorium tool.

use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::Result;
use clap::Parser;
use scriptorium_core::auth::Grant;
use scriptorium_core::render::DocumentRenderer;
use scriptorium_core::store::{ContentStore, export_catalog};
use scriptorium_core::{ApiClient, CrawlOptions, Crawler, Settings, TokenManager};
use tracing::{debug, info, warn};

mod app;
mod cli;

use cli::{Args, AuthCommand, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let settings = Settings::load(&args.config)?;
    let use_ui = !args.quiet && std::io::stderr().is_terminal();

    match args.command {
        Command::Crawl {
            ref languages,
            download_content,
            max_books,
            page_size,
        } => {
            let tokens = Arc::new(TokenManager::new(&settings));
            let api = ApiClient::new(&settings, tokens);
            let store = ContentStore::open(&settings.db_path).await?;

            let options = CrawlOptions {
                languages: languages.clone(),
                download_content,
                max_books_per_folder: max_books.or(settings.max_books_per_folder),
                page_size,
            };

            let crawler = Crawler::new(&api, &store, options);

            // Ctrl-C requests a clean stop at the next page boundary
            let cancel = crawler.cancel_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("cancellation requested, stopping at next boundary");
                    cancel.store(true, Ordering::SeqCst);
                }
            });

            let (ui_handle, ui_stop) = app::progress::spawn_crawl_spinner(use_ui);
            let result = crawler.run().await;
            ui_stop.store(true, Ordering::SeqCst);
            if let Some(handle) = ui_handle {
                let _ = handle.await;
            }
            let summary = result?;

            info!(
                languages = summary.languages,
                folders = summary.folders,
                books = summary.books_inserted,
                paragraphs = summary.paragraphs_inserted,
                duplicates = summary.duplicates_dropped,
                cancelled = summary.cancelled,
                "crawl complete"
            );
            for skipped in &summary.skipped {
                warn!(scope = %skipped.scope, reason = %skipped.reason, "subtree skipped");
            }
            store.close().await;
        }

        Command::Search {
            ref query,
            limit,
            offset,
            remote,
            ref language,
            suggest,
        } => {
            if suggest {
                let tokens = Arc::new(TokenManager::new(&settings));
                let api = ApiClient::new(&settings, tokens);
                for suggestion in api.search_suggestions(query).await? {
                    println!("{suggestion}");
                }
            } else if remote {
                let tokens = Arc::new(TokenManager::new(&settings));
                let api = ApiClient::new(&settings, tokens);
                let page = api
                    .remote_search(query, language.as_deref(), limit, offset)
                    .await?;
                let total = page.count();
                let hits = page.into_items();
                match total {
                    Some(total) => println!("{} of {total} matches", hits.len()),
                    None => println!("{} matches", hits.len()),
                }
                for hit in &hits {
                    println!("  [{} {}] {}", hit.book_id, hit.para_id, snippet(&hit.snippet, 100));
                }
            } else {
                let store = ContentStore::open(&settings.db_path).await?;
                let results = store
                    .search(query, i64::from(limit), i64::from(offset))
                    .await?;

                println!("{} matches", results.total);
                for hit in &results.hits {
                    println!("  [{}] {}", hit.refcode_short, snippet(&hit.content, 100));
                }
                store.close().await;
            }
        }

        Command::Render { book_id, ref output, .. } => {
            let options = args
                .command
                .render_options()
                .unwrap_or_default();
            let store = ContentStore::open(&settings.db_path).await?;

            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            let ui_handle = app::progress::spawn_render_progress(use_ui, rx);

            let renderer = DocumentRenderer::new(options);
            let result = renderer.render(&store, book_id, Some(tx)).await;
            let _ = ui_handle.await;
            let document = result?;

            let text = document.to_text();
            match output {
                Some(path) => {
                    std::fs::write(path, &text)?;
                    info!(
                        book_id,
                        pages = document.pages.len(),
                        output = %path.display(),
                        "document written"
                    );
                }
                None => println!("{text}"),
            }
            store.close().await;
        }

        Command::Download { book_id, ref output } => {
            let tokens = Arc::new(TokenManager::new(&settings));
            let api = ApiClient::new(&settings, tokens);

            let book = api.book(book_id).await?;
            if book.download_url.is_none() {
                warn!(book_id, title = %book.title, "catalog lists no archive for this book");
            }
            info!(book_id, title = %book.title, "downloading archive");

            let path = api.download_archive(book_id, output).await?;
            info!(book_id, path = %path.display(), "archive downloaded");
        }

        Command::Stats => {
            let store = ContentStore::open(&settings.db_path).await?;
            let stats = store.stats().await?;
            println!("languages:        {}", stats.languages);
            println!("folders:          {}", stats.folders);
            println!("books:            {}", stats.books);
            println!("downloaded books: {}", stats.downloaded_books);
            println!("paragraphs:       {}", stats.paragraphs);
            store.close().await;
        }

        Command::Export { ref output } => {
            let store = ContentStore::open(&settings.db_path).await?;
            export_catalog(&store, output).await?;
            info!(output = %output.display(), "catalog exported");
            store.close().await;
        }

        Command::Auth { ref command } => {
            let tokens = TokenManager::new(&settings);
            match command {
                AuthCommand::Status => {
                    let status = tokens.status().await?;
                    if status.present {
                        let remaining = status.remaining_ms.unwrap_or(0).max(0) / 1000;
                        println!("token present; {remaining}s remaining");
                        println!("refresh token: {}", status.has_refresh_token);
                        if let Some(scope) = status.scope {
                            println!("scope: {scope}");
                        }
                    } else {
                        println!("no token");
                    }
                }
                AuthCommand::Login => {
                    tokens.authenticate(&Grant::ClientCredentials).await?;
                    println!("authenticated");
                }
            }
        }
    }

    Ok(())
}

/// First `max` characters of a paragraph, for single-line hit display.
fn snippet(content: &str, max: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}
