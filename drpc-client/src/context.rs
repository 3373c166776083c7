//! Per-call deadline and cancellation
//!
//! The client itself never waits on timers. Each call carries a
//! [`CallContext`] down to the transport, which decides how to honor it;
//! [`CallContext::run`] is the usual way to do that.
//!
//! ```rust
//! use drpc_client::CallContext;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let (ctx, cancel) = CallContext::with_timeout(Duration::from_secs(5)).cancellable();
//! cancel.cancel();
//! assert!(ctx.is_cancelled());
//! # }
//! ```

use drpc_core::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Deadline and cancellation signal for one call
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every context derived from the same [`CallContext::cancellable`]
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CallContext {
    /// No deadline, not cancellable
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    /// Attach a cancellation signal
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, CancelHandle { tx: Arc::new(tx) })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drive `fut` until it completes, the deadline passes, or the call is cancelled
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        let cancelled = async {
            if let Some(mut rx) = self.cancel.clone() {
                if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                    return;
                }
            }
            // handle dropped without cancelling: never fires
            std::future::pending::<()>().await
        };

        tokio::select! {
            res = fut => res,
            _ = deadline => Err(Error::Timeout),
            _ = cancelled => Err(Error::Cancelled),
        }
    }
}
