use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Single-fire readiness signal.
///
/// The flag is set before waiters are woken, so an observer that returns from
/// [`Self::wait`] always sees [`Self::is_ready`] as true. Waiters may register
/// before, during or after the transition.
#[derive(Debug, Default)]
pub struct ReadySignal {
	ready: AtomicBool,
	notify: Notify,
}

impl ReadySignal {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_ready(&self) -> bool {
		self.ready.load(Ordering::Acquire)
	}

	/// Marks the signal ready and wakes every registered waiter.
	///
	/// Returns `false` if the signal had already fired; waiters are not woken twice.
	pub fn fire(&self) -> bool {
		if self.ready.swap(true, Ordering::AcqRel) {
			return false;
		}
		self.notify.notify_waiters();
		true
	}

	/// Resolves once the signal has fired.
	pub async fn wait(&self) {
		let notified = self.notify.notified();
		tokio::pin!(notified);
		// Register before checking the flag: `fire` could run between the check and the await.
		notified.as_mut().enable();
		if self.is_ready() {
			return;
		}
		notified.await;
	}
}
