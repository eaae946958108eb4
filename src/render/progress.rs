//! Render progress as a stream of immutable events.
//!
//! The renderer pushes events into an unbounded channel and never blocks
//! on (or fails because of) the consumer. Consumers may display progress
//! but must not rely on stage count or timing.

use std::fmt;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Rendering stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    /// Loading the book and its paragraphs.
    Fetching,
    /// Reconstructing chapters.
    Processing,
    /// Laying out body text.
    Formatting,
    /// Assembling pages, TOC, and anchors.
    Rendering,
    /// Done.
    Complete,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetching => "fetching",
            Self::Processing => "processing",
            Self::Formatting => "formatting",
            Self::Rendering => "rendering",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// One immutable progress event.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current stage.
    pub stage: RenderStage,
    /// Completion percentage, monotonically increasing across events.
    pub percent: u8,
    /// Chapter being processed, when applicable.
    pub current_chapter: Option<String>,
}

/// Internal emitter that enforces percent monotonicity and swallows
/// consumer-side channel closure.
pub(crate) struct ProgressReporter {
    tx: Option<UnboundedSender<RenderProgress>>,
    last_percent: u8,
}

impl ProgressReporter {
    pub(crate) fn new(tx: Option<UnboundedSender<RenderProgress>>) -> Self {
        Self {
            tx,
            last_percent: 0,
        }
    }

    /// Emits an event. The percentage is clamped so consumers always see
    /// a non-decreasing sequence; a dropped receiver is ignored.
    pub(crate) fn report(&mut self, stage: RenderStage, percent: u8, chapter: Option<&str>) {
        let percent = percent.clamp(self.last_percent, 100);
        self.last_percent = percent;

        debug!(%stage, percent, chapter, "render progress");

        if let Some(tx) = &self.tx {
            let _ = tx.send(RenderProgress {
                stage,
                percent,
                current_chapter: chapter.map(str::to_string),
            });
        }
    }
}
