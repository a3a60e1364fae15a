use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use super::*;
use crate::dispatch::{ChannelTriggerSource, InboundMessage};
use crate::error::{DispatchError, RenderError};
use crate::render::{Affordance, SurfaceRenderer};
use crate::{Component, ComponentContext, ComponentDescriptor, MemorySettings, Placeholder};

struct Counter(Arc<AtomicUsize>);

#[async_trait]
impl Component for Counter {
	async fn trigger(&self, _cx: &ComponentContext<'_>) -> Result<(), String> {
		self.0.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

struct BrokenPrepare;

#[async_trait]
impl Component for BrokenPrepare {
	async fn prepare(&self, _cx: &ComponentContext<'_>) -> Result<(), String> {
		Err("storage unavailable".into())
	}

	async fn trigger(&self, _cx: &ComponentContext<'_>) -> Result<(), String> {
		Ok(())
	}
}

/// Fails to render one element; records, for every render, whether all resolvable dependencies were ready.
struct CheckingRenderer {
	registry: Arc<Registry>,
	fail_on: Option<String>,
	early: parking_lot::Mutex<Vec<String>>,
	inner: SurfaceRenderer,
}

#[async_trait]
impl AffordanceRenderer for CheckingRenderer {
	async fn render(&self, request: AffordanceRequest) -> Result<Affordance, RenderError> {
		if let Some(entry) = self.registry.get(request.activate.id().as_str()) {
			let deps_ready = entry.dependencies().iter().filter_map(|dep| self.registry.get(dep.as_str())).all(|dep| dep.is_ready());
			if !deps_ready {
				self.early.lock().push(request.element_id.clone());
			}
		}
		if self.fail_on.as_deref() == Some(request.element_id.as_str()) {
			return Err(RenderError::new("no host surface"));
		}
		self.inner.render(request).await
	}
}

struct FailingSource;

impl TriggerSource for FailingSource {
	fn subscribe(&self) -> Result<tokio::sync::mpsc::Receiver<InboundMessage>, DispatchError> {
		Err(DispatchError::SetupFailed("runtime.onMessage unavailable".into()))
	}
}

struct Harness {
	lifecycle: Lifecycle,
	renderer: Arc<CheckingRenderer>,
	tx: tokio::sync::mpsc::Sender<InboundMessage>,
}

fn widget(name: &str) -> ComponentDescriptor {
	ComponentDescriptor::new("Widget", name).icon("*").hotkey(format!("Alt+{name}"))
}

fn id(name: &str) -> ComponentId {
	ComponentId::new("Widget", name)
}

fn harness(registry: Registry, settings: MemorySettings, fail_on: Option<&str>) -> Harness {
	let registry = Arc::new(registry);
	let renderer = Arc::new(CheckingRenderer {
		registry: Arc::clone(&registry),
		fail_on: fail_on.map(|name| id(name).element_id()),
		early: parking_lot::Mutex::new(Vec::new()),
		inner: SurfaceRenderer::new(),
	});
	let (tx, source) = ChannelTriggerSource::channel(16);
	let lifecycle = Lifecycle::new(registry, Arc::new(settings), Arc::clone(&renderer) as Arc<dyn AffordanceRenderer>, Arc::new(source));
	Harness { lifecycle, renderer, tx }
}

fn chain_registry(hits: &Arc<AtomicUsize>) -> Registry {
	let mut registry = Registry::new();
	registry.register(ComponentEntry::new(widget("a"), false, Placeholder)).unwrap();
	registry.register(ComponentEntry::new(widget("b").depends_on(id("a")), false, Placeholder)).unwrap();
	registry
		.register(ComponentEntry::new(widget("c").depends_on(id("b")), true, Counter(Arc::clone(hits))))
		.unwrap();
	registry
}

#[tokio::test]
async fn chain_initializes_dependencies_first_then_dispatches() {
	let hits = Arc::new(AtomicUsize::new(0));
	let h = harness(chain_registry(&hits), MemorySettings::new(), None);

	assert!(!h.lifecycle.is_dispatching());
	let report = h.lifecycle.init().await.unwrap();

	let mut required = report.required.clone();
	required.sort();
	assert_eq!(required, vec![id("a"), id("b"), id("c")]);
	assert_eq!(report.ready_order, vec![id("a"), id("b"), id("c")]);
	assert!(h.lifecycle.is_dispatching());
	for name in ["a", "b", "c"] {
		assert_eq!(h.lifecycle.registry().get(id(name).as_str()).unwrap().state(), LifecycleState::Ready);
	}

	// Only the directly enabled component gets an affordance.
	assert_eq!(h.renderer.inner.element_ids(), vec![id("c").element_id()]);
	assert!(h.renderer.early.lock().is_empty());

	h.tx.send(InboundMessage::hotkey(id("c").trigger_name())).await.unwrap();
	tokio::time::timeout(Duration::from_secs(1), async {
		while hits.load(Ordering::SeqCst) == 0 {
			tokio::task::yield_now().await;
		}
	})
	.await
	.expect("hotkey should reach the ready component");

	assert_eq!(h.renderer.inner.click(&id("c").element_id()).await, Ok(true));
	assert_eq!(hits.load(Ordering::SeqCst), 2);
	h.lifecycle.shutdown().await;
	assert!(!h.lifecycle.is_dispatching());
}

#[tokio::test]
async fn disabled_unreachable_components_never_start() {
	let mut registry = Registry::new();
	registry.register(ComponentEntry::new(widget("on"), true, Placeholder)).unwrap();
	registry.register(ComponentEntry::new(widget("off"), false, Placeholder)).unwrap();
	let h = harness(registry, MemorySettings::new(), None);

	let report = h.lifecycle.init().await.unwrap();
	assert_eq!(report.required, vec![id("on")]);
	assert_eq!(h.lifecycle.registry().get(id("off").as_str()).unwrap().state(), LifecycleState::Unstarted);
}

#[tokio::test]
async fn missing_dependency_is_not_waited_on() {
	let mut registry = Registry::new();
	registry
		.register(ComponentEntry::new(widget("d").depends_on("Widget.ghost"), true, Placeholder))
		.unwrap();
	let h = harness(registry, MemorySettings::new(), None);

	let report = tokio::time::timeout(Duration::from_secs(1), h.lifecycle.init())
		.await
		.expect("a missing dependency must not stall startup")
		.unwrap();
	assert_eq!(report.ready_order, vec![id("d")]);
}

#[tokio::test]
async fn rendering_failure_is_isolated_to_its_component() {
	let mut registry = Registry::new();
	registry.register(ComponentEntry::new(widget("broken"), true, Placeholder)).unwrap();
	registry.register(ComponentEntry::new(widget("fine"), true, Placeholder)).unwrap();
	let h = harness(registry, MemorySettings::new(), Some("broken"));

	let Err(StartupError::Components { failures }) = h.lifecycle.init().await else {
		panic!("startup should report the failed component");
	};
	assert_eq!(failures.len(), 1);
	assert!(matches!(&failures[0], ComponentError::Rendering { id: failed, .. } if *failed == id("broken")));

	let registry = h.lifecycle.registry();
	assert_eq!(registry.get(id("broken").as_str()).unwrap().state(), LifecycleState::Failed);
	assert!(!registry.get(id("broken").as_str()).unwrap().is_ready());
	assert_eq!(registry.get(id("fine").as_str()).unwrap().state(), LifecycleState::Ready);
	assert!(registry.get(id("fine").as_str()).unwrap().affordance().is_some());
	assert!(!h.lifecycle.is_dispatching(), "dispatch must stay inactive after a failed batch");
}

#[tokio::test]
async fn prepare_failure_is_reported_as_hook_error() {
	let mut registry = Registry::new();
	registry.register(ComponentEntry::new(widget("storage"), true, BrokenPrepare)).unwrap();
	let h = harness(registry, MemorySettings::new(), None);

	let Err(StartupError::Components { failures }) = h.lifecycle.init().await else {
		panic!("startup should fail");
	};
	assert_eq!(
		failures,
		vec![ComponentError::Hook {
			id: id("storage"),
			message: "storage unavailable".into(),
		}]
	);
	assert!(h.renderer.inner.element_ids().is_empty(), "no affordance after a failed hook");
}

#[tokio::test(start_paused = true)]
async fn dependency_timeout_fails_the_waiting_component() {
	let mut registry = Registry::new();
	registry.register(ComponentEntry::new(widget("storage"), false, BrokenPrepare)).unwrap();
	registry
		.register(ComponentEntry::new(widget("notes").depends_on(id("storage")), true, Placeholder))
		.unwrap();
	let h = harness(registry, MemorySettings::new(), None);
	let lifecycle = h.lifecycle.with_config(LifecycleConfig::default().with_dependency_timeout(Duration::from_millis(50)));

	let Err(StartupError::Components { failures }) = lifecycle.init().await else {
		panic!("startup should fail");
	};
	assert_eq!(failures.len(), 2);
	assert!(failures.contains(&ComponentError::DependencyTimeout {
		id: id("notes"),
		dependency: id("storage"),
		timeout: Duration::from_millis(50),
	}));
	assert!(failures.iter().any(|f| matches!(f, ComponentError::Hook { id: failed, .. } if *failed == id("storage"))));
}

#[tokio::test]
async fn dispatch_setup_failure_fails_startup_after_components_are_ready() {
	let mut registry = Registry::new();
	registry.register(ComponentEntry::new(widget("clock"), true, Placeholder)).unwrap();
	let registry = Arc::new(registry);
	let lifecycle = Lifecycle::new(
		Arc::clone(&registry),
		Arc::new(MemorySettings::new()),
		Arc::new(SurfaceRenderer::new()),
		Arc::new(FailingSource),
	);

	let err = lifecycle.init().await.unwrap_err();
	assert!(matches!(err, StartupError::Dispatch(DispatchError::SetupFailed(_))));
	assert!(registry.get(id("clock").as_str()).unwrap().is_ready());
	assert!(!lifecycle.is_dispatching());
}

#[tokio::test]
async fn rejected_cycle_starts_nothing() {
	let mut registry = Registry::new();
	registry.register(ComponentEntry::new(widget("x").depends_on(id("y")), true, Placeholder)).unwrap();
	registry.register(ComponentEntry::new(widget("y").depends_on(id("x")), false, Placeholder)).unwrap();
	let h = harness(registry, MemorySettings::new(), None);
	let lifecycle = h.lifecycle.with_config(LifecycleConfig::default().reject_cycles(true));

	let Err(StartupError::DependencyCycle { cycle }) = lifecycle.init().await else {
		panic!("cycle should be rejected");
	};
	assert_eq!(cycle, vec![id("x"), id("y")]);
	assert_eq!(lifecycle.registry().get(id("x").as_str()).unwrap().state(), LifecycleState::Unstarted);
}

#[tokio::test]
async fn hotkey_label_follows_kind_setting() {
	let mut registry = Registry::new();
	registry.register(ComponentEntry::new(widget("clock"), true, Placeholder)).unwrap();
	let settings = MemorySettings::new().with(display_hotkeys_key("Widget"), true);
	let h = harness(registry, settings, None);

	h.lifecycle.init().await.unwrap();
	let affordance = h.renderer.inner.get(&id("clock").element_id()).unwrap();
	assert!(affordance.markup.contains(r#"<div class="hotkey">Alt+clock</div>"#));
}

#[tokio::test]
async fn components_initialize_exactly_once() {
	let mut registry = Registry::new();
	registry.register(ComponentEntry::new(widget("clock"), true, Placeholder)).unwrap();
	let h = harness(registry, MemorySettings::new(), None);

	h.lifecycle.init().await.unwrap();
	let Err(StartupError::Components { failures }) = h.lifecycle.init().await else {
		panic!("second init must not restart components");
	};
	assert_eq!(failures, vec![ComponentError::AlreadyStarted { id: id("clock") }]);
	assert_eq!(h.renderer.inner.element_ids().len(), 1);
	h.lifecycle.shutdown().await;
}

#[tokio::test]
async fn wait_for_ready_tolerates_any_ordering() {
	let hits = Arc::new(AtomicUsize::new(0));
	let h = harness(chain_registry(&hits), MemorySettings::new(), None);
	let lifecycle = Arc::new(h.lifecycle);

	assert!(!lifecycle.wait_for_ready("Widget.ghost").await);

	let early = tokio::spawn({
		let lifecycle = Arc::clone(&lifecycle);
		async move { lifecycle.wait_for_ready(id("a").as_str()).await }
	});
	tokio::task::yield_now().await;

	lifecycle.init().await.unwrap();
	assert!(early.await.unwrap());
	let late = tokio::time::timeout(Duration::from_millis(100), lifecycle.wait_for_ready(id("c").as_str()))
		.await
		.expect("waiting after readiness returns immediately");
	assert!(late);
	lifecycle.shutdown().await;
}
