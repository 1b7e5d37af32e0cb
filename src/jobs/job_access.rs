use crate::components::{Component, ComponentId};

/// How a unit of work uses a component type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AccessMode {
	ReadOnly,
	ReadWrite,
}

/// The component types a unit of work reads and writes.
///
/// Both lists are kept sorted and disjoint; declaring a write supersedes a read of the same type.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct JobAccess {
	reads: Vec<ComponentId>,
	writes: Vec<ComponentId>,
}

impl JobAccess {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn read<T: Component>(mut self) -> Self {
		self.add(T::component_id(), AccessMode::ReadOnly);
		self
	}

	#[must_use]
	pub fn write<T: Component>(mut self) -> Self {
		self.add(T::component_id(), AccessMode::ReadWrite);
		self
	}

	pub fn add(&mut self, id: ComponentId, mode: AccessMode) {
		if self.writes.binary_search(&id).is_ok() {
			return;
		}

		match mode {
			AccessMode::ReadOnly => {
				if let Err(position) = self.reads.binary_search(&id) {
					self.reads.insert(position, id);
				}
			},
			AccessMode::ReadWrite => {
				if let Ok(position) = self.reads.binary_search(&id) {
					self.reads.remove(position);
				}
				if let Err(position) = self.writes.binary_search(&id) {
					self.writes.insert(position, id);
				}
			},
		}
	}

	/// Add every access of `other` to this set.
	pub fn merge(&mut self, other: &JobAccess) {
		for id in &other.writes {
			self.add(*id, AccessMode::ReadWrite);
		}
		for id in &other.reads {
			self.add(*id, AccessMode::ReadOnly);
		}
	}

	pub fn reads(&self) -> &[ComponentId] {
		&self.reads
	}

	pub fn writes(&self) -> &[ComponentId] {
		&self.writes
	}

	pub fn mode(&self, id: ComponentId) -> Option<AccessMode> {
		if self.writes.binary_search(&id).is_ok() {
			Some(AccessMode::ReadWrite)
		} else if self.reads.binary_search(&id).is_ok() {
			Some(AccessMode::ReadOnly)
		} else {
			None
		}
	}

	pub fn is_empty(&self) -> bool {
		self.reads.is_empty() && self.writes.is_empty()
	}

	/// `true` if running both units of work concurrently could race.
	pub fn conflicts_with(&self, other: &JobAccess) -> bool {
		self.writes.iter().any(|id| other.mode(*id).is_some())
			|| other.writes.iter().any(|id| self.reads.binary_search(id).is_ok())
	}
}
