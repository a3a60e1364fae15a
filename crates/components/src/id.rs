use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between a component's kind and its slug.
pub const KIND_SEPARATOR: char = '.';

/// Unique component identifier of the form `kind.slug`.
///
/// The identifier is the only key used for registry lookup, dependency
/// references and every derived name (settings keys, trigger names, element ids).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
	/// Builds an identifier from a kind and a slug. The slug is normalized with [`Self::slugify`].
	pub fn new(kind: &str, slug: &str) -> Self {
		Self(format!("{kind}{KIND_SEPARATOR}{}", Self::slugify(slug)))
	}

	/// Wraps an already-formed identifier, e.g. a dependency reference.
	pub fn from_raw(raw: impl Into<String>) -> Self {
		Self(raw.into())
	}

	/// Normalizes a display name into a slug.
	///
	/// Whitespace runs become a single `-`, anything that is not alphanumeric,
	/// `-` or `_` is dropped, and the result is lowercased.
	pub fn slugify(name: &str) -> String {
		let mut slug = String::with_capacity(name.len());
		let mut pending_dash = false;
		for ch in name.trim().chars() {
			if ch.is_whitespace() {
				pending_dash = !slug.is_empty();
				continue;
			}
			if !(ch.is_alphanumeric() || ch == '-' || ch == '_') {
				continue;
			}
			if pending_dash {
				slug.push('-');
				pending_dash = false;
			}
			slug.extend(ch.to_lowercase());
		}
		slug
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// The kind prefix, or the whole identifier when it has no separator.
	pub fn kind(&self) -> &str {
		self.0.split_once(KIND_SEPARATOR).map_or(self.0.as_str(), |(kind, _)| kind)
	}

	/// Settings key deciding whether the component is enabled.
	pub fn enabled_key(&self) -> String {
		format!("{}-enabled", self.0)
	}

	/// Name of the inbound hotkey event routed to this component.
	pub fn trigger_name(&self) -> String {
		format!("trigger-{}", self.0)
	}

	/// Name of the one-shot readiness broadcast.
	pub fn ready_event(&self) -> String {
		format!("{}-ready", self.0)
	}

	/// Element identifier of the rendered affordance.
	pub fn element_id(&self) -> String {
		format!("{}-button", self.0)
	}
}

/// Settings key deciding whether hotkey labels are rendered for a kind.
pub fn display_hotkeys_key(kind: &str) -> String {
	format!("display-{kind}-hotkeys")
}

impl fmt::Display for ComponentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Borrow<str> for ComponentId {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for ComponentId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl From<&str> for ComponentId {
	fn from(raw: &str) -> Self {
		Self::from_raw(raw)
	}
}
