//! Error types for registration, startup and dispatch.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::ComponentId;

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// A component with the same identifier is already registered.
	#[error("duplicate component identifier: {id}")]
	DuplicateIdentifier { id: ComponentId },
}

/// Failure reported by an [`AffordanceRenderer`](crate::AffordanceRenderer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}

/// Failure of one component's initialization or trigger.
///
/// These are scoped to a single component and never abort siblings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
	/// Affordance generation failed.
	#[error("rendering failed for {id}: {source}")]
	Rendering {
		id: ComponentId,
		#[source]
		source: RenderError,
	},

	/// The component's own `prepare` or `trigger` hook failed.
	#[error("hook failed for {id}: {message}")]
	Hook { id: ComponentId, message: String },

	/// A declared dependency did not become ready within the configured bound.
	#[error("{id} timed out after {timeout:?} waiting for {dependency}")]
	DependencyTimeout {
		id: ComponentId,
		dependency: ComponentId,
		timeout: Duration,
	},

	/// `init` was invoked on a component that already started.
	#[error("{id} was already initialized")]
	AlreadyStarted { id: ComponentId },
}

impl ComponentError {
	/// Identifier of the component this failure belongs to.
	pub fn component(&self) -> &ComponentId {
		match self {
			Self::Rendering { id, .. } | Self::Hook { id, .. } | Self::DependencyTimeout { id, .. } | Self::AlreadyStarted { id } => id,
		}
	}
}

/// Dispatch activation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
	/// The inbound trigger channel could not be subscribed to.
	#[error("trigger subscription failed: {0}")]
	SetupFailed(String),
}

/// Aggregate startup failure returned by [`Lifecycle::init`](crate::Lifecycle::init).
#[derive(Debug, Error)]
pub enum StartupError {
	/// One or more required components failed; every other component still ran to completion.
	#[error("{} component(s) failed to initialize", failures.len())]
	Components { failures: Vec<ComponentError> },

	/// The required set contains a dependency cycle and cycles are rejected.
	#[error("dependency cycle: {}", format_cycle(cycle))]
	DependencyCycle { cycle: Vec<ComponentId> },

	/// Dispatch could not be activated after every component became ready.
	#[error(transparent)]
	Dispatch(#[from] DispatchError),
}

fn format_cycle(cycle: &[ComponentId]) -> String {
	let mut out = cycle.iter().map(ComponentId::as_str).collect::<Vec<_>>().join(" -> ");
	if let Some(first) = cycle.first() {
		out.push_str(" -> ");
		out.push_str(first.as_str());
	}
	out
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),
}
