//! Transitive closure of the enabled components.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::component::ComponentEntry;
use crate::{ComponentId, Registry};

/// The components that must be initialized, in discovery order.
///
/// Discovery order is not a topological order; startup ordering comes from
/// each component waiting on its own dependencies.
#[derive(Debug, Default)]
pub struct Resolution {
	required: Vec<Arc<ComponentEntry>>,
}

impl Resolution {
	pub fn components(&self) -> &[Arc<ComponentEntry>] {
		&self.required
	}

	pub fn ids(&self) -> impl Iterator<Item = &ComponentId> {
		self.required.iter().map(|entry| entry.id())
	}

	pub fn contains(&self, id: &str) -> bool {
		self.required.iter().any(|entry| entry.id().as_str() == id)
	}

	pub fn len(&self) -> usize {
		self.required.len()
	}

	pub fn is_empty(&self) -> bool {
		self.required.is_empty()
	}

	/// Dependency cycles among the required components, each as an identifier path.
	///
	/// Cycles do not stop resolution, but a component on a cycle waits on its
	/// own readiness and never starts.
	pub fn cycles(&self, registry: &Registry) -> Vec<Vec<ComponentId>> {
		#[derive(Clone, Copy, PartialEq, Eq)]
		enum Mark {
			Visiting,
			Done,
		}

		fn visit<'a>(
			entry: &'a ComponentEntry, registry: &'a Registry, marks: &mut HashMap<&'a str, Mark>, stack: &mut Vec<&'a ComponentId>,
			cycles: &mut Vec<Vec<ComponentId>>,
		) {
			marks.insert(entry.id().as_str(), Mark::Visiting);
			stack.push(entry.id());
			for dep in entry.dependencies() {
				let Some(dep_entry) = registry.get(dep.as_str()) else {
					continue;
				};
				match marks.get(dep.as_str()) {
					Some(Mark::Done) => {}
					Some(Mark::Visiting) => {
						if let Some(start) = stack.iter().position(|id| *id == dep) {
							cycles.push(stack[start..].iter().map(|id| (*id).clone()).collect());
						}
					}
					None => visit(dep_entry, registry, marks, stack, cycles),
				}
			}
			stack.pop();
			marks.insert(entry.id().as_str(), Mark::Done);
		}

		let mut marks = HashMap::new();
		let mut stack = Vec::new();
		let mut cycles = Vec::new();
		for entry in &self.required {
			if !marks.contains_key(entry.id().as_str()) {
				visit(entry, registry, &mut marks, &mut stack, &mut cycles);
			}
		}
		cycles
	}
}

/// Computes the required set by fixed-point expansion.
///
/// Enabled components seed the set; every component that is not enabled is
/// hidden, so being pulled in as a dependency never makes it visible. Each
/// pass appends the resolvable, not yet required dependencies of every
/// required component, until a pass adds nothing. Unregistered dependency
/// identifiers are skipped.
pub fn resolve(registry: &Registry) -> Resolution {
	let mut required: Vec<Arc<ComponentEntry>> = Vec::new();
	let mut seen: HashSet<ComponentId> = HashSet::new();

	for entry in registry.all(None) {
		if entry.is_enabled() {
			seen.insert(entry.id().clone());
			required.push(Arc::clone(entry));
		} else {
			entry.hide();
		}
	}

	let mut passes = 0usize;
	loop {
		passes += 1;
		let before = required.len();
		let mut idx = 0;
		while idx < required.len() {
			let entry = Arc::clone(&required[idx]);
			for dep in entry.dependencies() {
				match registry.get(dep.as_str()) {
					Some(dep_entry) => {
						if seen.insert(dep.clone()) {
							required.push(Arc::clone(dep_entry));
						}
					}
					None => tracing::trace!(component = %entry.id(), dependency = %dep, "resolver.dependency.absent"),
				}
			}
			idx += 1;
		}
		if required.len() == before {
			break;
		}
	}

	tracing::debug!(required = required.len(), passes, "resolver.resolve");
	Resolution { required }
}
