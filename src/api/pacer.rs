//! Constant inter-request pacing for remote calls.
//!
//! The remote service has implicit rate limits; the client settles a
//! fixed, unconditional delay after every call completes, independent of
//! success or failure. This is not a backoff: the delay never grows.

use std::time::Duration;

use tracing::{debug, instrument};

/// Which delay applies after a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayClass {
    /// Ordinary JSON API call (default 1000 ms).
    Request,
    /// Bulk binary archive download (default 2000 ms).
    Download,
}

/// Enforces the minimum post-call delay.
///
/// One pacer is shared per client, so the delay acts as a global rate
/// limit rather than a per-task one.
#[derive(Debug)]
pub struct RequestPacer {
    request_delay: Duration,
    download_delay: Duration,
}

impl RequestPacer {
    /// Creates a pacer with the given delays.
    #[must_use]
    #[instrument(skip_all, fields(request_ms = request_delay.as_millis(), download_ms = download_delay.as_millis()))]
    pub fn new(request_delay: Duration, download_delay: Duration) -> Self {
        debug!("creating request pacer");
        Self {
            request_delay,
            download_delay,
        }
    }

    /// Creates a pacer that applies no delays (tests, local mirrors).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            request_delay: Duration::ZERO,
            download_delay: Duration::ZERO,
        }
    }

    /// Returns the delay for a class.
    #[must_use]
    pub fn delay_for(&self, class: DelayClass) -> Duration {
        match class {
            DelayClass::Request => self.request_delay,
            DelayClass::Download => self.download_delay,
        }
    }

    /// Settles the post-call delay. Call after every remote call
    /// completes, on the success and failure paths alike.
    pub async fn settle(&self, class: DelayClass) {
        let delay = self.delay_for(class);
        if delay.is_zero() {
            return;
        }
        tokio::time::sleep(delay).await;
    }
}
