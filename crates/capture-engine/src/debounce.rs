//! Deadline-based debouncing for work that should follow a burst of events.

use std::time::Duration;

use tokio::time::Instant;

/// Holds at most one pending value, released once `delay` has passed
/// without a newer [`schedule`](Debouncer::schedule).
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending value and restart the delay.
    pub fn schedule(&mut self, value: T) {
        self.pending = Some((Instant::now() + self.delay, value));
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, value)| value)
    }

    /// Wait for the pending value's deadline and take it.
    ///
    /// Never resolves while nothing is scheduled. Cancel-safe: dropping the
    /// future before it resolves leaves the value pending.
    pub async fn fired(&mut self) -> T {
        loop {
            match &self.pending {
                Some((deadline, _)) => {
                    tokio::time::sleep_until(*deadline).await;
                    if let Some((_, value)) = self.pending.take() {
                        return value;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        }
    }
}
