use crate::ComponentId;

/// Static identity and display metadata for one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
	pub id: ComponentId,
	pub display_name: String,
	pub icon: String,
	pub hotkey: String,
	/// Declared dependencies, in declaration order. They may name components
	/// that are never registered.
	pub dependencies: Vec<ComponentId>,
}

impl ComponentDescriptor {
	/// Creates a descriptor whose slug is derived from the display name.
	pub fn new(kind: &str, display_name: impl Into<String>) -> Self {
		let display_name = display_name.into();
		Self {
			id: ComponentId::new(kind, &display_name),
			display_name,
			icon: String::new(),
			hotkey: String::new(),
			dependencies: Vec::new(),
		}
	}

	/// Overrides the slug derived from the display name.
	#[must_use]
	pub fn slug(mut self, slug: &str) -> Self {
		self.id = ComponentId::new(self.id.kind(), slug);
		self
	}

	#[must_use]
	pub fn icon(mut self, icon: impl Into<String>) -> Self {
		self.icon = icon.into();
		self
	}

	#[must_use]
	pub fn hotkey(mut self, hotkey: impl Into<String>) -> Self {
		self.hotkey = hotkey.into();
		self
	}

	/// Appends one declared dependency. Repeated identifiers are kept once.
	#[must_use]
	pub fn depends_on(mut self, dependency: impl Into<ComponentId>) -> Self {
		let dependency = dependency.into();
		if !self.dependencies.contains(&dependency) {
			self.dependencies.push(dependency);
		}
		self
	}

	pub fn kind(&self) -> &str {
		self.id.kind()
	}
}
