//! Two-phase startup: initialize the required set, then activate dispatch.
//!
//! Every required component runs its own `init` sequence, and all sequences
//! are interleaved on the calling task:
//!
//! * wait for each resolvable declared dependency to become ready
//! * run the component's `prepare` hook
//! * render its affordance when it is displayed
//! * set `ready` and broadcast readiness
//!
//! Only after every sequence has finished is the [`DispatchRouter`] subscribed
//! to the trigger source, so no hotkey can reach a half-initialized component.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{join_all, try_join_all};
use parking_lot::Mutex;

use crate::component::{ComponentEntry, LifecycleState, TriggerHandle};
use crate::config::LifecycleConfig;
use crate::dispatch::{DispatchHandle, DispatchRouter, TriggerSource};
use crate::error::{ComponentError, StartupError};
use crate::render::{AffordanceRenderer, AffordanceRequest};
use crate::settings::SettingsStore;
use crate::{ComponentId, Registry, display_hotkeys_key, resolver};

#[cfg(test)]
mod tests;

/// Summary of a successful startup.
#[derive(Debug, Clone)]
pub struct StartupReport {
	/// Required components, in discovery order.
	pub required: Vec<ComponentId>,
	/// Components in the order they became ready.
	pub ready_order: Vec<ComponentId>,
	/// Time spent initializing components.
	pub init_elapsed: Duration,
	/// Time spent activating dispatch.
	pub dispatch_elapsed: Duration,
}

/// Drives every required component from `Unstarted` to `Ready`.
pub struct Lifecycle {
	registry: Arc<Registry>,
	settings: Arc<dyn SettingsStore>,
	renderer: Arc<dyn AffordanceRenderer>,
	triggers: Arc<dyn TriggerSource>,
	router: DispatchRouter,
	config: LifecycleConfig,
	ready_order: Mutex<Vec<ComponentId>>,
	dispatch: Mutex<Option<DispatchHandle>>,
}

impl Lifecycle {
	pub fn new(
		registry: Arc<Registry>, settings: Arc<dyn SettingsStore>, renderer: Arc<dyn AffordanceRenderer>, triggers: Arc<dyn TriggerSource>,
	) -> Self {
		Self {
			router: DispatchRouter::new(Arc::clone(&registry)),
			registry,
			settings,
			renderer,
			triggers,
			config: LifecycleConfig::default(),
			ready_order: Mutex::new(Vec::new()),
			dispatch: Mutex::new(None),
		}
	}

	#[must_use]
	pub fn with_config(mut self, config: LifecycleConfig) -> Self {
		self.config = config;
		self
	}

	pub fn registry(&self) -> &Arc<Registry> {
		&self.registry
	}

	pub fn router(&self) -> &DispatchRouter {
		&self.router
	}

	/// Whether the dispatch loop has been activated.
	pub fn is_dispatching(&self) -> bool {
		self.dispatch.lock().is_some()
	}

	/// Resolves the required set, initializes it, then activates dispatch.
	///
	/// A failed component never aborts its siblings: every other component
	/// still runs to completion before the aggregate result is returned. Any
	/// failure fails the aggregate and dispatch stays inactive. A component
	/// whose dependency never becomes ready waits forever unless
	/// [`LifecycleConfig::dependency_timeout_ms`] is set.
	pub async fn init(&self) -> Result<StartupReport, StartupError> {
		let resolution = resolver::resolve(&self.registry);

		let cycles = resolution.cycles(&self.registry);
		for cycle in &cycles {
			let path: Vec<&str> = cycle.iter().map(ComponentId::as_str).collect();
			tracing::warn!(cycle = ?path, "lifecycle.dependency_cycle");
		}
		if self.config.reject_cycles
			&& let Some(cycle) = cycles.into_iter().next()
		{
			return Err(StartupError::DependencyCycle { cycle });
		}

		let required: Vec<ComponentId> = resolution.ids().cloned().collect();
		tracing::info!(required = required.len(), registered = self.registry.len(), "lifecycle.init");

		let start = Instant::now();
		let results = join_all(resolution.components().iter().map(|entry| self.init_component(entry))).await;
		let init_elapsed = start.elapsed();

		let failures: Vec<ComponentError> = results.into_iter().filter_map(Result::err).collect();
		if !failures.is_empty() {
			tracing::error!(failed = failures.len(), required = required.len(), "lifecycle.init.failed");
			return Err(StartupError::Components { failures });
		}

		let start = Instant::now();
		let handle = self.router.activate(self.triggers.as_ref())?;
		let dispatch_elapsed = start.elapsed();
		*self.dispatch.lock() = Some(handle);
		tracing::info!(elapsed_ms = dispatch_elapsed.as_millis() as u64, "lifecycle.dispatch.activated");

		Ok(StartupReport {
			required,
			ready_order: self.ready_order.lock().clone(),
			init_elapsed,
			dispatch_elapsed,
		})
	}

	/// Runs one component's `init` sequence.
	///
	/// Fails with [`ComponentError::AlreadyStarted`] if the component already left `Unstarted`.
	pub async fn init_component(&self, entry: &Arc<ComponentEntry>) -> Result<(), ComponentError> {
		entry.begin()?;
		tracing::trace!(component = %entry.id(), "component.init");

		let result = self.run_component(entry).await;
		if let Err(error) = &result {
			entry.set_state(LifecycleState::Failed);
			tracing::warn!(component = %entry.id(), %error, "component.init.failed");
		}
		result
	}

	async fn run_component(&self, entry: &Arc<ComponentEntry>) -> Result<(), ComponentError> {
		self.wait_for_dependencies(entry).await?;

		entry.set_state(LifecycleState::Rendering);
		entry.prepare(&self.registry).await?;
		if entry.is_displayed() {
			self.render(entry).await?;
		}

		// Record before broadcasting so the order matches what waiters observe.
		self.ready_order.lock().push(entry.id().clone());
		entry.mark_ready();
		tracing::debug!(component = %entry.id(), event = %entry.id().ready_event(), "component.ready");
		Ok(())
	}

	/// Waits on every declared dependency that resolves, concurrently.
	async fn wait_for_dependencies(&self, entry: &ComponentEntry) -> Result<(), ComponentError> {
		let waits = entry.dependencies().iter().filter_map(|dep| match self.registry.get(dep.as_str()) {
			Some(dependency) => Some(self.wait_dependency(entry, dependency)),
			None => {
				tracing::debug!(component = %entry.id(), dependency = %dep, "component.dependency.absent");
				None
			}
		});
		try_join_all(waits).await?;
		Ok(())
	}

	async fn wait_dependency(&self, entry: &ComponentEntry, dependency: &ComponentEntry) -> Result<(), ComponentError> {
		let Some(timeout) = self.config.dependency_timeout() else {
			dependency.wait_ready().await;
			return Ok(());
		};
		tokio::time::timeout(timeout, dependency.wait_ready())
			.await
			.map_err(|_| ComponentError::DependencyTimeout {
				id: entry.id().clone(),
				dependency: dependency.id().clone(),
				timeout,
			})
	}

	async fn render(&self, entry: &ComponentEntry) -> Result<(), ComponentError> {
		let descriptor = entry.descriptor();
		let show_hotkey = self.settings.flag(&display_hotkeys_key(descriptor.kind())).await;
		let request = AffordanceRequest {
			element_id: descriptor.id.element_id(),
			display_name: descriptor.display_name.clone(),
			icon: descriptor.icon.clone(),
			hotkey: show_hotkey.then(|| descriptor.hotkey.clone()),
			activate: TriggerHandle::new(Arc::clone(&self.registry), descriptor.id.clone()),
		};
		let affordance = self.renderer.render(request).await.map_err(|source| ComponentError::Rendering {
			id: entry.id().clone(),
			source,
		})?;
		tracing::trace!(component = %entry.id(), element = %affordance.element_id, "component.render");
		entry.set_affordance(affordance);
		Ok(())
	}

	/// Resolves once `id` is ready. Returns `false` without waiting if `id` is not registered.
	pub async fn wait_for_ready(&self, id: &str) -> bool {
		let Some(entry) = self.registry.get(id) else {
			return false;
		};
		entry.wait_ready().await;
		true
	}

	/// Stops the dispatch loop, if it was activated.
	pub async fn shutdown(&self) {
		let handle = self.dispatch.lock().take();
		if let Some(handle) = handle {
			handle.shutdown().await;
		}
	}
}
