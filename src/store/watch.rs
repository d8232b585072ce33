//! Poll-driven live subscriptions.
//!
//! The store's REST plane has no push listen, so "live" views re-read their
//! source at a fixed cadence and deliver the full result whenever it changed,
//! the same re-read-all-on-change shape the product's web client uses. A
//! spawned task feeds an mpsc channel; the returned [`Subscription`] stops it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ChatError;

/// Handle for a live watch. `cancel()` is idempotent; nothing is delivered
/// after it returns. Dropping the handle cancels too, so an abandoned view
/// cannot leak its poll task.
pub struct Subscription {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A live feed: updates arrive on `updates`, the watch stops via
/// `subscription`.
pub struct Feed<T> {
    pub updates: mpsc::UnboundedReceiver<T>,
    pub subscription: Subscription,
}

/// Spawn a poll loop that calls `fetch` every `interval` and sends the result
/// whenever it differs from the previous one. The first successful fetch is
/// always delivered, so subscribers see current state immediately. Fetch
/// errors are logged and the previous state kept; the store client's own
/// retry behavior is the only retry there is.
pub fn poll_watch<T, F, Fut>(interval: Duration, mut fetch: F) -> Feed<T>
where
    T: Clone + PartialEq + Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ChatError>> + Send,
{
    let (tx, updates) = mpsc::unbounded_channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last: Option<T> = None;

        loop {
            ticker.tick().await;
            if flag.load(Ordering::SeqCst) {
                break;
            }
            match fetch().await {
                Ok(value) => {
                    if last.as_ref() != Some(&value) {
                        if tx.send(value.clone()).is_err() {
                            break;
                        }
                        last = Some(value);
                    }
                }
                Err(e) => {
                    tracing::warn!("watch poll failed: {}", e);
                }
            }
        }
    });

    Feed {
        updates,
        subscription: Subscription { cancelled, task },
    }
}
