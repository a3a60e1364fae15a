//! Dependency-aware component runtime.
//!
//! Components are registered in a [`Registry`], each declaring the
//! identifiers of the components it depends on. At startup the
//! [`Lifecycle`] expands the enabled subset to its transitive closure,
//! initializes every required component exactly once (each waiting only on
//! its own dependencies), and then activates the [`DispatchRouter`] that
//! routes inbound hotkey events to ready components.
//!
//! The settings store, affordance renderer and trigger channel are injected
//! through the [`SettingsStore`], [`AffordanceRenderer`] and [`TriggerSource`]
//! traits. In-memory implementations ([`MemorySettings`], [`SurfaceRenderer`],
//! [`ChannelTriggerSource`]) are provided.

mod component;
pub mod config;
mod descriptor;
pub mod dispatch;
mod error;
mod id;
pub mod lifecycle;
mod ready;
mod registry;
pub mod render;
pub mod resolver;
mod settings;

pub use component::{Component, ComponentContext, ComponentEntry, LifecycleState, Placeholder, TriggerHandle};
pub use config::{LifecycleConfig, RuntimeConfig};
pub use descriptor::ComponentDescriptor;
pub use dispatch::{ChannelTriggerSource, DispatchHandle, DispatchRouter, InboundMessage, TriggerSource};
pub use error::{ComponentError, ConfigError, DispatchError, RegistryError, RenderError, StartupError};
pub use id::{ComponentId, display_hotkeys_key};
pub use lifecycle::{Lifecycle, StartupReport};
pub use ready::ReadySignal;
pub use registry::Registry;
pub use render::{Affordance, AffordanceRenderer, AffordanceRequest, SurfaceRenderer};
pub use resolver::{Resolution, resolve};
pub use settings::{MemorySettings, SettingsStore};
