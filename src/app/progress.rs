//! Progress UI (spinner and render progress bar).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use scriptorium_core::render::RenderProgress;
use tokio::sync::mpsc::UnboundedReceiver;

/// Spawns the crawl spinner when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_spinner` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_crawl_spinner(
    use_spinner: bool,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_spinner {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = Arc::clone(&stop);

    let handle = tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message("Crawling catalog...");

        while !stop_clone.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        spinner.finish_and_clear();
    });
    (Some(handle), stop)
}

/// Spawns a consumer that drives a 0-100 progress bar from render
/// events. The task ends when the renderer drops its sender.
pub(crate) fn spawn_render_progress(
    use_bar: bool,
    mut events: UnboundedReceiver<RenderProgress>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let bar = if use_bar {
            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::with_template("{bar:30} {percent}% {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            Some(bar)
        } else {
            None
        };

        while let Some(event) = events.recv().await {
            if let Some(bar) = &bar {
                bar.set_position(u64::from(event.percent));
                let msg = match event.current_chapter {
                    Some(chapter) => format!("{} ({chapter})", event.stage),
                    None => event.stage.to_string(),
                };
                bar.set_message(msg);
            }
        }

        if let Some(bar) = &bar {
            bar.finish_and_clear();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_core::render::RenderStage;

    #[tokio::test]
    async fn spawn_crawl_spinner_when_disabled_returns_none_handle_and_stop_already_true() {
        let (handle, stop) = spawn_crawl_spinner(false);
        assert!(handle.is_none());
        assert!(stop.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn spawn_crawl_spinner_when_enabled_stop_ends_task() {
        let (handle, stop) = spawn_crawl_spinner(true);
        assert!(handle.is_some());

        stop.store(true, Ordering::SeqCst);
        let join_handle = handle.unwrap();
        let _ = join_handle.await;
        // If we get here without hanging, the spinner task exited on stop
    }

    #[tokio::test]
    async fn spawn_render_progress_ends_when_sender_drops() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = spawn_render_progress(false, rx);

        tx.send(RenderProgress {
            stage: RenderStage::Complete,
            percent: 100,
            current_chapter: None,
        })
        .unwrap();
        drop(tx);

        let _ = handle.await;
    }
}
