//! Cooperative cancellation shared by the scheduler, the gate and prompts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::{BookingError, Result};

/// Clonable cancellation flag.
///
/// Cancelling never interrupts a request already in flight; loops observe the
/// flag at sleep and prompt boundaries through [`check`](Self::check),
/// [`sleep`](Self::sleep) and [`cancelled`](Self::cancelled).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
	inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
	cancelled: AtomicBool,
	notify: Notify,
}

impl CancelToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.inner.cancelled.store(true, Ordering::SeqCst);
		self.inner.notify.notify_waiters();
	}

	pub fn is_cancelled(&self) -> bool {
		self.inner.cancelled.load(Ordering::SeqCst)
	}

	/// Returns `Err(Cancelled)` once cancellation was requested.
	pub fn check(&self) -> Result<()> {
		if self.is_cancelled() { Err(BookingError::Cancelled) } else { Ok(()) }
	}

	/// Resolves when cancellation is requested.
	pub async fn cancelled(&self) {
		loop {
			let notified = self.inner.notify.notified();
			tokio::pin!(notified);
			// Register before re-checking so a concurrent cancel is not missed.
			notified.as_mut().enable();
			if self.is_cancelled() {
				return;
			}
			notified.await;
		}
	}

	/// Sleeps for `duration` unless cancelled first.
	pub async fn sleep(&self, duration: Duration) -> Result<()> {
		self.check()?;
		if duration.is_zero() {
			return Ok(());
		}
		tokio::select! {
			_ = tokio::time::sleep(duration) => Ok(()),
			_ = self.cancelled() => Err(BookingError::Cancelled),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn sleep_returns_early_on_cancel() {
		let token = CancelToken::new();
		let trigger = token.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;
			trigger.cancel();
		});

		let started = std::time::Instant::now();
		let result = token.sleep(Duration::from_secs(30)).await;
		assert!(matches!(result, Err(BookingError::Cancelled)));
		assert!(started.elapsed() < Duration::from_secs(5));
	}

	#[tokio::test]
	async fn check_reflects_state() {
		let token = CancelToken::new();
		assert!(token.check().is_ok());
		assert!(token.sleep(Duration::ZERO).await.is_ok());
		token.cancel();
		assert!(token.check().is_err());
		assert!(token.sleep(Duration::ZERO).await.is_err());
		token.cancelled().await;
	}
}
