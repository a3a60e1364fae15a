use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::component::ComponentEntry;
use crate::error::RegistryError;
use crate::ComponentId;

/// Table of every component, keyed by identifier.
///
/// Built mutably before startup and shared immutably (behind an `Arc`)
/// afterwards. Enumeration is most-recently-registered first: later
/// registrations are treated as overrides of earlier ones.
#[derive(Debug, Default)]
pub struct Registry {
	entries: IndexMap<ComponentId, Arc<ComponentEntry>>,
}

impl Registry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts one component. An existing identifier is never overwritten.
	pub fn register(&mut self, entry: ComponentEntry) -> Result<Arc<ComponentEntry>, RegistryError> {
		match self.entries.entry(entry.id().clone()) {
			Entry::Occupied(occupied) => {
				tracing::warn!(component = %occupied.key(), "registry.register.duplicate");
				Err(RegistryError::DuplicateIdentifier { id: occupied.key().clone() })
			}
			Entry::Vacant(vacant) => {
				tracing::trace!(component = %vacant.key(), enabled = entry.is_enabled(), "registry.register");
				Ok(Arc::clone(vacant.insert(Arc::new(entry))))
			}
		}
	}

	/// O(1) lookup. `None` is an expected answer for undeclared dependencies.
	pub fn get(&self, id: &str) -> Option<&Arc<ComponentEntry>> {
		self.entries.get(id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.entries.contains_key(id)
	}

	/// Every component, or only those of `kind`, most recently registered first.
	pub fn all<'a>(&'a self, kind: Option<&'a str>) -> impl Iterator<Item = &'a Arc<ComponentEntry>> + 'a {
		self.entries.values().rev().filter(move |entry| kind.is_none_or(|kind| entry.id().kind() == kind))
	}

	/// Identifiers in the same order as [`Self::all`].
	pub fn ids<'a>(&'a self, kind: Option<&'a str>) -> impl Iterator<Item = &'a ComponentId> + 'a {
		self.all(kind).map(|entry| entry.id())
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
