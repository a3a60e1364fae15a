//! Affordance rendering port and an in-memory host surface.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::component::TriggerHandle;
use crate::error::RenderError;

/// Everything a renderer needs to build one component's control.
#[derive(Debug, Clone)]
pub struct AffordanceRequest {
	/// Stable element identifier, `<id>-button`.
	pub element_id: String,
	pub display_name: String,
	pub icon: String,
	/// Present only when hotkey labels are enabled for the component's kind.
	pub hotkey: Option<String>,
	/// Invoked when the control is activated.
	pub activate: TriggerHandle,
}

/// A rendered control as attached to the host surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordance {
	pub element_id: String,
	pub markup: String,
}

/// Turns display metadata into a control attached to a host surface.
#[async_trait]
pub trait AffordanceRenderer: Send + Sync {
	async fn render(&self, request: AffordanceRequest) -> Result<Affordance, RenderError>;
}

struct Attached {
	affordance: Affordance,
	activate: TriggerHandle,
}

/// Renderer that appends controls to an in-memory surface, in render order.
#[derive(Default)]
pub struct SurfaceRenderer {
	attached: Mutex<Vec<Attached>>,
}

impl SurfaceRenderer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Element identifiers in the order they were attached.
	pub fn element_ids(&self) -> Vec<String> {
		self.attached.lock().iter().map(|a| a.affordance.element_id.clone()).collect()
	}

	pub fn get(&self, element_id: &str) -> Option<Affordance> {
		self.attached.lock().iter().find(|a| a.affordance.element_id == element_id).map(|a| a.affordance.clone())
	}

	/// Simulates activating a control. Returns `Ok(false)` if no such element exists.
	pub async fn click(&self, element_id: &str) -> Result<bool, crate::ComponentError> {
		let handle = self
			.attached
			.lock()
			.iter()
			.find(|a| a.affordance.element_id == element_id)
			.map(|a| a.activate.clone());
		match handle {
			Some(handle) => handle.fire().await,
			None => Ok(false),
		}
	}
}

fn markup(request: &AffordanceRequest) -> String {
	let mut out = format!(
		r#"<div class="infos"><span class="icon">{}</span><span class="name">{}</span></div>"#,
		request.icon, request.display_name
	);
	if let Some(hotkey) = &request.hotkey {
		out.push_str(&format!(r#"<div class="hotkey">{hotkey}</div>"#));
	}
	out
}

#[async_trait]
impl AffordanceRenderer for SurfaceRenderer {
	async fn render(&self, request: AffordanceRequest) -> Result<Affordance, RenderError> {
		let mut attached = self.attached.lock();
		if attached.iter().any(|a| a.affordance.element_id == request.element_id) {
			return Err(RenderError::new(format!("element {} is already attached", request.element_id)));
		}
		let affordance = Affordance {
			element_id: request.element_id.clone(),
			markup: markup(&request),
		};
		attached.push(Attached {
			affordance: affordance.clone(),
			activate: request.activate,
		});
		Ok(affordance)
	}
}
