use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default subject for requests that carry no identity.
pub const ROOT_USER: &str = "root";

/// Per-request identity, cancellation and deadline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub subject: String,
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(ROOT_USER)
    }
}

/// Why a guarded call did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aborted {
    Cancelled,
    TimedOut,
}

impl std::fmt::Display for Aborted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Aborted::Cancelled => write!(f, "request cancelled"),
            Aborted::TimedOut => write!(f, "deadline exceeded"),
        }
    }
}

impl RequestContext {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Run `fut` until it completes, the request is cancelled, or the earlier
    /// of the request deadline and `limit` passes. An aborted future is
    /// dropped, so nothing after its last await point runs.
    pub async fn guard<F, T>(&self, limit: Duration, fut: F) -> Result<T, Aborted>
    where
        F: Future<Output = T>,
    {
        let mut deadline = Instant::now() + limit;
        if let Some(request_deadline) = self.deadline {
            deadline = deadline.min(request_deadline);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Aborted::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Err(Aborted::TimedOut),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_limit() {
        let ctx = RequestContext::default();
        let out = ctx.guard(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn cancelled_request_aborts() {
        let ctx = RequestContext::default();
        ctx.cancel.cancel();
        let out = ctx
            .guard(Duration::from_secs(1), std::future::pending::<()>())
            .await;
        assert_eq!(out, Err(Aborted::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn request_deadline_wins_over_longer_limit() {
        let ctx = RequestContext::new("alice").with_timeout(Duration::from_millis(10));
        let out = ctx
            .guard(Duration::from_secs(60), std::future::pending::<()>())
            .await;
        assert_eq!(out, Err(Aborted::TimedOut));
    }
}
