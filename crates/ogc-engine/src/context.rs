use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-call cancellation, deadline and public endpoint.
///
/// Cancellation and the deadline are honoured only while the engine waits
/// on a data provider.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
    /// URL the client used to reach the service; replaces the configured
    /// online resource in capabilities links
    pub base_url: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context cancelled through `token`.
    pub fn with_cancel(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}
