use crate::components::{Component, ComponentId, ComponentType, SharedComponent};
use crate::shared::SharedComponentStore;
use crate::jobs::{AccessMode, JobAccess};
use crate::data_structures::BitField;

/// A handle to a query over every archetype containing a set of required components
/// and none of a set of excluded components.
///
/// Groups are registered with [get_component_group](crate::entities::EntityStore::get_component_group)
/// and are only valid for the world that registered them.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ComponentGroup {
	pub(crate) world: u32,
	pub(crate) index: usize,
}

impl ComponentGroup {
	/// Start describing a new group.
	pub fn build() -> GroupBuilder {
		GroupBuilder::default()
	}
}

/// Describes the components of a [ComponentGroup] and how they are accessed.
#[derive(Clone, Debug, Default)]
pub struct GroupBuilder {
	required: Vec<(ComponentType, AccessMode)>,
	excluded: Vec<ComponentType>,
}

impl GroupBuilder {
	/// Require `T`, accessed read-only.
	#[must_use]
	pub fn read<T: Component>(self) -> Self {
		self.with(ComponentType::of::<T>(), AccessMode::ReadOnly)
	}

	/// Require `T`, accessed read-write.
	#[must_use]
	pub fn write<T: Component>(self) -> Self {
		self.with(ComponentType::of::<T>(), AccessMode::ReadWrite)
	}

	/// Skip archetypes containing `T`.
	#[must_use]
	pub fn exclude<T: Component>(self) -> Self {
		self.without(ComponentType::of::<T>())
	}

	#[must_use]
	pub fn with(mut self, component: ComponentType, mode: AccessMode) -> Self {
		match self.required.iter_mut().find(|(c, _)| *c == component) {
			Some((_, current)) => {
				if mode == AccessMode::ReadWrite {
					*current = mode;
				}
			},
			None => self.required.push((component, mode)),
		}
		self
	}

	#[must_use]
	pub fn without(mut self, component: ComponentType) -> Self {
		if !self.excluded.contains(&component) {
			self.excluded.push(component);
		}
		self
	}
}

/// Restricts a group to the chunks storing one shared value.
pub(crate) struct SharedFilter {
	component: ComponentId,
	resolve: Box<dyn Fn(&SharedComponentStore) -> Option<u32> + Send + Sync>,
}

impl SharedFilter {
	pub fn new<T: SharedComponent>(value: T) -> Self {
		Self {
			component: T::component_id(),
			resolve: Box::new(move |store| store.find(&value)),
		}
	}

	pub fn component(&self) -> ComponentId {
		self.component
	}

	/// The current index of the filtered value, `None` if no chunk stores it.
	pub fn resolve(&self, store: &SharedComponentStore) -> Option<u32> {
		(self.resolve)(store)
	}
}

pub(crate) struct GroupData {
	required: Vec<(ComponentType, AccessMode)>,
	excluded: Vec<ComponentType>,
	access: JobAccess,
	query: usize,
	filter: Option<SharedFilter>,
}

impl GroupData {
	pub fn new(builder: GroupBuilder, query: usize) -> Self {
		let GroupBuilder { mut required, mut excluded } = builder;
		required.sort_by_key(|(c, _)| c.id());
		excluded.sort_by_key(|c| c.id());

		let mut access = JobAccess::new();
		for (component, mode) in &required {
			access.add(component.id(), *mode);
		}

		Self { required, excluded, access, query, filter: None }
	}

	pub fn include_mask(builder: &GroupBuilder) -> BitField {
		builder.required.iter().map(|(c, _)| c.id().value()).collect()
	}

	pub fn exclude_mask(builder: &GroupBuilder) -> BitField {
		BitField::from(builder.excluded.as_slice())
	}

	#[inline(always)]
	pub fn required(&self) -> &[(ComponentType, AccessMode)] {
		&self.required
	}

	#[inline(always)]
	pub fn excluded(&self) -> &[ComponentType] {
		&self.excluded
	}

	#[inline(always)]
	pub fn access(&self) -> &JobAccess {
		&self.access
	}

	#[inline(always)]
	pub fn query(&self) -> usize {
		self.query
	}

	#[inline(always)]
	pub fn filter(&self) -> Option<&SharedFilter> {
		self.filter.as_ref()
	}

	pub fn set_filter(&mut self, filter: Option<SharedFilter>) {
		self.filter = filter;
	}

	pub fn mode(&self, id: ComponentId) -> Option<AccessMode> {
		self.access.mode(id)
	}
}
