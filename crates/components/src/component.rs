//! Component instances and their customization hooks.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use serde_json::{Map, Value};

use crate::error::ComponentError;
use crate::ready::ReadySignal;
use crate::render::Affordance;
use crate::settings::SettingsStore;
use crate::{ComponentDescriptor, ComponentId, Registry};

/// Lifecycle position of one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
	Unstarted,
	WaitingOnDependencies,
	Rendering,
	Ready,
	/// Initialization failed; the readiness signal never fires.
	Failed,
}

impl LifecycleState {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Unstarted => "unstarted",
			Self::WaitingOnDependencies => "waiting_on_dependencies",
			Self::Rendering => "rendering",
			Self::Ready => "ready",
			Self::Failed => "failed",
		}
	}
}

/// Borrowed view handed to component hooks.
pub struct ComponentContext<'a> {
	pub entry: &'a ComponentEntry,
	pub registry: &'a Registry,
}

impl ComponentContext<'_> {
	pub fn id(&self) -> &ComponentId {
		self.entry.id()
	}

	/// Looks up a declared dependency. Absent if it was never registered.
	pub fn dependency(&self, id: &str) -> Option<&Arc<ComponentEntry>> {
		self.registry.get(id)
	}
}

/// Per-kind behavior of a component.
///
/// `trigger` is the one required capability: it runs when the component's
/// hotkey fires or its affordance is activated, always after the component is
/// ready.
#[async_trait]
pub trait Component: Send + Sync + 'static {
	/// Runs once, after every resolvable dependency is ready and before the
	/// affordance is rendered.
	async fn prepare(&self, _cx: &ComponentContext<'_>) -> Result<(), String> {
		Ok(())
	}

	async fn trigger(&self, cx: &ComponentContext<'_>) -> Result<(), String>;
}

/// Component with no trigger behavior of its own.
///
/// Useful for pure dependency providers; triggering it only logs a diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct Placeholder;

#[async_trait]
impl Component for Placeholder {
	async fn trigger(&self, cx: &ComponentContext<'_>) -> Result<(), String> {
		tracing::warn!(component = %cx.id(), "component.trigger.placeholder: no trigger behavior supplied");
		Ok(())
	}
}

/// One registered component: descriptor, flags, lifecycle state and behavior.
pub struct ComponentEntry {
	descriptor: ComponentDescriptor,
	enabled: bool,
	displayed: AtomicBool,
	state: Mutex<LifecycleState>,
	ready: ReadySignal,
	data: Mutex<Map<String, Value>>,
	affordance: Mutex<Option<Affordance>>,
	behavior: Box<dyn Component>,
}

impl ComponentEntry {
	/// Creates an entry with an explicit `enabled` flag. `displayed` starts equal to it.
	pub fn new(descriptor: ComponentDescriptor, enabled: bool, behavior: impl Component) -> Self {
		Self {
			descriptor,
			enabled,
			displayed: AtomicBool::new(enabled),
			state: Mutex::new(LifecycleState::Unstarted),
			ready: ReadySignal::new(),
			data: Mutex::new(Map::new()),
			affordance: Mutex::new(None),
			behavior: Box::new(behavior),
		}
	}

	/// Creates an entry, reading `<id>-enabled` from the settings store.
	pub async fn load(descriptor: ComponentDescriptor, behavior: impl Component, settings: &dyn SettingsStore) -> Self {
		let enabled = settings.flag(&descriptor.id.enabled_key()).await;
		tracing::trace!(component = %descriptor.id, enabled, "component.load");
		Self::new(descriptor, enabled, behavior)
	}

	pub fn id(&self) -> &ComponentId {
		&self.descriptor.id
	}

	pub fn descriptor(&self) -> &ComponentDescriptor {
		&self.descriptor
	}

	pub fn dependencies(&self) -> &[ComponentId] {
		&self.descriptor.dependencies
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	/// Whether an affordance is rendered for this component.
	pub fn is_displayed(&self) -> bool {
		self.displayed.load(Ordering::Acquire)
	}

	pub(crate) fn hide(&self) {
		self.displayed.store(false, Ordering::Release);
	}

	pub fn state(&self) -> LifecycleState {
		*self.state.lock()
	}

	pub(crate) fn set_state(&self, state: LifecycleState) {
		*self.state.lock() = state;
	}

	/// Moves `Unstarted` to `WaitingOnDependencies`; any other state means `init` already ran.
	pub(crate) fn begin(&self) -> Result<(), ComponentError> {
		let mut state = self.state.lock();
		if *state != LifecycleState::Unstarted {
			return Err(ComponentError::AlreadyStarted { id: self.id().clone() });
		}
		*state = LifecycleState::WaitingOnDependencies;
		Ok(())
	}

	/// Sets the ready state, then broadcasts readiness.
	pub(crate) fn mark_ready(&self) {
		self.set_state(LifecycleState::Ready);
		self.ready.fire();
	}

	pub fn is_ready(&self) -> bool {
		self.ready.is_ready()
	}

	/// Resolves once the component is ready; immediately if it already is.
	pub async fn wait_ready(&self) {
		self.ready.wait().await;
	}

	/// Free-form data owned by the component's behavior.
	pub fn data(&self) -> MutexGuard<'_, Map<String, Value>> {
		self.data.lock()
	}

	/// The rendered affordance, if one was generated.
	pub fn affordance(&self) -> Option<Affordance> {
		self.affordance.lock().clone()
	}

	pub(crate) fn set_affordance(&self, affordance: Affordance) {
		*self.affordance.lock() = Some(affordance);
	}

	pub(crate) async fn prepare(&self, registry: &Registry) -> Result<(), ComponentError> {
		let cx = ComponentContext { entry: self, registry };
		self.behavior.prepare(&cx).await.map_err(|message| ComponentError::Hook {
			id: self.id().clone(),
			message,
		})
	}

	/// Runs the trigger hook, waiting for readiness first if needed.
	pub async fn trigger(&self, registry: &Registry) -> Result<(), ComponentError> {
		if !self.is_ready() {
			tracing::debug!(component = %self.id(), "component.trigger.deferred");
			self.wait_ready().await;
		}
		let cx = ComponentContext { entry: self, registry };
		self.behavior.trigger(&cx).await.map_err(|message| ComponentError::Hook {
			id: self.id().clone(),
			message,
		})
	}
}

impl fmt::Debug for ComponentEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentEntry")
			.field("id", self.id())
			.field("enabled", &self.enabled)
			.field("displayed", &self.is_displayed())
			.field("state", &self.state())
			.finish_non_exhaustive()
	}
}

/// Cloneable handle that triggers one component, e.g. from an affordance click.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
	registry: Arc<Registry>,
	id: ComponentId,
}

impl TriggerHandle {
	pub fn new(registry: Arc<Registry>, id: ComponentId) -> Self {
		Self { registry, id }
	}

	pub fn id(&self) -> &ComponentId {
		&self.id
	}

	/// Triggers the component. Returns `Ok(false)` if it is not registered.
	pub async fn fire(&self) -> Result<bool, ComponentError> {
		let Some(entry) = self.registry.get(self.id.as_str()) else {
			return Ok(false);
		};
		entry.trigger(&self.registry).await?;
		Ok(true)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;

	use super::*;

	struct Counter(Arc<AtomicUsize>);

	#[async_trait]
	impl Component for Counter {
		async fn trigger(&self, cx: &ComponentContext<'_>) -> Result<(), String> {
			self.0.fetch_add(1, Ordering::SeqCst);
			cx.entry.data().insert("last".into(), Value::from(cx.id().as_str()));
			Ok(())
		}
	}

	#[tokio::test]
	async fn load_reads_enabled_flag_from_settings() {
		let settings = crate::MemorySettings::new().with("Widget.clock-enabled", true);
		let on = ComponentEntry::load(ComponentDescriptor::new("Widget", "Clock"), Placeholder, &settings).await;
		let off = ComponentEntry::load(ComponentDescriptor::new("Widget", "Timer"), Placeholder, &settings).await;

		assert!(on.is_enabled() && on.is_displayed());
		assert!(!off.is_enabled() && !off.is_displayed());
	}

	#[test]
	fn begin_only_succeeds_once() {
		let entry = ComponentEntry::new(ComponentDescriptor::new("Widget", "Clock"), true, Placeholder);
		assert!(entry.begin().is_ok());
		assert_eq!(entry.state(), LifecycleState::WaitingOnDependencies);
		assert!(matches!(entry.begin(), Err(ComponentError::AlreadyStarted { .. })));
	}

	#[tokio::test]
	async fn trigger_waits_for_readiness() {
		let hits = Arc::new(AtomicUsize::new(0));
		let mut registry = Registry::new();
		let entry = registry
			.register(ComponentEntry::new(ComponentDescriptor::new("Widget", "Clock"), true, Counter(Arc::clone(&hits))))
			.unwrap();
		let registry = Arc::new(registry);

		let handle = TriggerHandle::new(Arc::clone(&registry), entry.id().clone());
		let pending = tokio::spawn(async move { handle.fire().await });
		tokio::task::yield_now().await;
		assert_eq!(hits.load(Ordering::SeqCst), 0, "trigger must not run before ready");

		entry.mark_ready();
		assert_eq!(pending.await.unwrap(), Ok(true));
		assert_eq!(hits.load(Ordering::SeqCst), 1);
		assert_eq!(entry.data().get("last"), Some(&Value::from("Widget.clock")));
	}

	#[tokio::test]
	async fn trigger_handle_for_unknown_id_is_a_no_op() {
		let handle = TriggerHandle::new(Arc::new(Registry::new()), ComponentId::from("Widget.ghost"));
		assert_eq!(handle.fire().await, Ok(false));
	}
}
