//! Hotkey dispatch.
//!
//! Inbound messages are staged in a bounded channel and forwarded by a
//! dispatch-owned task to [`DispatchRouter::handle_trigger`]. Each trigger runs
//! on its own task, so a component still waiting for readiness never holds up
//! the messages behind it.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::component::LifecycleState;
use crate::error::DispatchError;
use crate::Registry;

/// Default staging capacity of [`ChannelTriggerSource`].
pub const DEFAULT_TRIGGER_CAPACITY: usize = 256;

/// Message delivered by the inbound trigger channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum InboundMessage {
	/// A hotkey fired; `name` is matched against `trigger-<id>`.
	HotkeyPressed { name: String },
	/// Any other command. Ignored by the router.
	#[serde(other)]
	Other,
}

impl InboundMessage {
	pub fn hotkey(name: impl Into<String>) -> Self {
		Self::HotkeyPressed { name: name.into() }
	}

	pub fn from_json(raw: &str) -> serde_json::Result<Self> {
		serde_json::from_str(raw)
	}
}

/// Source of inbound trigger messages.
pub trait TriggerSource: Send + Sync {
	/// Subscribes the router. Failure here is fatal to startup.
	fn subscribe(&self) -> Result<mpsc::Receiver<InboundMessage>, DispatchError>;
}

/// [`TriggerSource`] backed by a tokio channel. Supports one subscriber.
#[derive(Debug)]
pub struct ChannelTriggerSource {
	rx: Mutex<Option<mpsc::Receiver<InboundMessage>>>,
}

impl ChannelTriggerSource {
	/// Creates the source together with the sender used to deliver messages.
	pub fn channel(capacity: usize) -> (mpsc::Sender<InboundMessage>, Self) {
		let (tx, rx) = mpsc::channel(capacity);
		(tx, Self { rx: Mutex::new(Some(rx)) })
	}
}

impl TriggerSource for ChannelTriggerSource {
	fn subscribe(&self) -> Result<mpsc::Receiver<InboundMessage>, DispatchError> {
		self.rx
			.lock()
			.take()
			.ok_or_else(|| DispatchError::SetupFailed("trigger channel already has a subscriber".into()))
	}
}

/// Routes trigger names to registered components.
#[derive(Debug, Clone)]
pub struct DispatchRouter {
	registry: Arc<Registry>,
}

impl DispatchRouter {
	pub fn new(registry: Arc<Registry>) -> Self {
		Self { registry }
	}

	/// Invokes every component whose trigger name equals `name`.
	///
	/// Components that never started (not in the required set) are skipped:
	/// they will never become ready. Returns the number of components triggered.
	pub async fn handle_trigger(&self, name: &str) -> usize {
		let matches: Vec<_> = self
			.registry
			.all(None)
			.filter(|entry| entry.id().trigger_name() == name)
			.filter(|entry| {
				let started = entry.state() != LifecycleState::Unstarted;
				if !started {
					tracing::debug!(component = %entry.id(), "dispatch.trigger.unstarted");
				}
				started
			})
			.cloned()
			.collect();

		if matches.is_empty() {
			tracing::trace!(name, "dispatch.trigger.unmatched");
			return 0;
		}

		let results = join_all(matches.iter().map(|entry| entry.trigger(&self.registry))).await;
		for (entry, result) in matches.iter().zip(results) {
			match result {
				Ok(()) => tracing::debug!(component = %entry.id(), "dispatch.trigger"),
				Err(error) => tracing::warn!(component = %entry.id(), %error, "dispatch.trigger.failed"),
			}
		}
		matches.len()
	}

	/// Routes one inbound message. Returns the number of components triggered.
	pub async fn handle_message(&self, message: InboundMessage) -> usize {
		match message {
			InboundMessage::HotkeyPressed { name } => self.handle_trigger(&name).await,
			InboundMessage::Other => {
				tracing::trace!("dispatch.message.ignored");
				0
			}
		}
	}

	/// Subscribes to `source` and starts forwarding messages.
	pub fn activate(&self, source: &dyn TriggerSource) -> Result<DispatchHandle, DispatchError> {
		let mut rx = source.subscribe()?;
		let cancel = CancellationToken::new();
		let task_cancel = cancel.clone();
		let router = self.clone();
		let task = tokio::spawn(async move {
			loop {
				let message = tokio::select! {
					biased;
					_ = task_cancel.cancelled() => break,
					maybe = rx.recv() => {
						let Some(message) = maybe else {
							break;
						};
						message
					}
				};
				let router = router.clone();
				tokio::spawn(async move {
					router.handle_message(message).await;
				});
			}
			tracing::debug!("dispatch.stopped");
		});
		Ok(DispatchHandle { cancel, task })
	}
}

/// Running dispatch loop.
#[derive(Debug)]
pub struct DispatchHandle {
	cancel: CancellationToken,
	task: JoinHandle<()>,
}

impl DispatchHandle {
	/// True once the forwarding task has exited, e.g. because every sender was dropped.
	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}

	/// Stops forwarding and waits for the forwarding task to exit.
	pub async fn shutdown(self) {
		self.cancel.cancel();
		if let Err(error) = self.task.await {
			tracing::warn!(%error, "dispatch.join_failed");
		}
	}
}
