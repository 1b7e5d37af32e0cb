use crate::components::{Component, ComponentType, SharedComponent};
use crate::entities::{Entity, EntityStore};
use crate::archetypes::Archetype;
use std::mem::{size_of, MaybeUninit};
use crate::error::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::ops::Range;

pub(crate) type SharedApply = Box<dyn FnOnce(&mut EntityStore, Entity) -> Result<()> + Send>;

pub(crate) enum Command {
	CreateEntity { archetype: Option<Archetype> },
	DestroyEntity { entity: Entity },
	AddComponent { entity: Entity, component: ComponentType, value: Option<Range<usize>> },
	SetComponent { entity: Entity, component: ComponentType, value: Range<usize> },
	RemoveComponent { entity: Entity, component: ComponentType },
	AddSharedComponent { entity: Entity, component: ComponentType, apply: SharedApply },
	SetSharedComponent { entity: Entity, component: ComponentType, apply: SharedApply },
}

static NEXT_TAG: AtomicU32 = AtomicU32::new(1);

/// The commands recorded by one producer, in recording order.
///
/// Component values are stored as raw bytes in `payload`. Placeholders created by the segment
/// carry its `tag`, unique among the segments alive in the process.
pub(crate) struct CommandSegment {
	pub key: u32,
	pub sequence: u64,
	pub tag: u32,
	pub commands: Vec<Command>,
	pub payload: Vec<MaybeUninit<u8>>,
	pub created: u32,
}

impl Default for CommandSegment {
	fn default() -> Self {
		Self::new(0, 0)
	}
}

impl CommandSegment {
	pub fn new(key: u32, sequence: u64) -> Self {
		Self {
			key,
			sequence,
			tag: NEXT_TAG.fetch_add(1, Ordering::Relaxed),
			commands: Vec::new(),
			payload: Vec::new(),
			created: 0,
		}
	}

	pub fn len(&self) -> usize {
		self.commands.len()
	}

	pub fn is_empty(&self) -> bool {
		self.commands.is_empty()
	}

	fn push_value<T: Component>(&mut self, value: &T) -> Range<usize> {
		let bytes = unsafe { std::slice::from_raw_parts(value as *const T as *const MaybeUninit<u8>, size_of::<T>()) };
		let start = self.payload.len();
		self.payload.extend_from_slice(bytes);
		start..self.payload.len()
	}

	pub fn create_entity(&mut self, archetype: Option<Archetype>) -> Entity {
		let entity = Entity::placeholder(self.tag, self.created);
		self.created += 1;
		self.commands.push(Command::CreateEntity { archetype });
		entity
	}

	pub fn destroy_entity(&mut self, entity: Entity) {
		self.commands.push(Command::DestroyEntity { entity });
	}

	pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) {
		let value = self.push_value(&value);
		self.commands.push(Command::AddComponent {
			entity,
			component: ComponentType::of::<T>(),
			value: Some(value),
		});
	}

	pub fn add_component_type(&mut self, entity: Entity, component: ComponentType) {
		self.commands.push(Command::AddComponent { entity, component, value: None });
	}

	pub fn set_component<T: Component>(&mut self, entity: Entity, value: T) {
		let value = self.push_value(&value);
		self.commands.push(Command::SetComponent {
			entity,
			component: ComponentType::of::<T>(),
			value,
		});
	}

	pub fn remove_component_type(&mut self, entity: Entity, component: ComponentType) {
		self.commands.push(Command::RemoveComponent { entity, component });
	}

	pub fn add_shared_component<T: SharedComponent>(&mut self, entity: Entity, value: T) {
		self.commands.push(Command::AddSharedComponent {
			entity,
			component: ComponentType::of::<T>(),
			apply: Box::new(move |world, entity| world.add_shared_component(entity, value)),
		});
	}

	pub fn set_shared_component<T: SharedComponent>(&mut self, entity: Entity, value: T) {
		self.commands.push(Command::SetSharedComponent {
			entity,
			component: ComponentType::of::<T>(),
			apply: Box::new(move |world, entity| world.set_shared_component(entity, value)),
		});
	}
}
