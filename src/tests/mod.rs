mod archetype_tests;
mod buffer_tests;
mod data_structure_tests;
mod group_tests;
mod shared_tests;
mod system_tests;

use crate::components::{Component, ComponentType};
use crate::entities::{Entity, EntityStore};
use crate::config::WorldConfig;
use bytemuck::{Pod, Zeroable};
use crate::EcsContext;

#[derive(Copy, Clone, Default, Debug, PartialEq, Component)]
pub struct Position {
	pub x: f32,
	pub y: f32,
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Component)]
pub struct Velocity {
	pub x: f32,
	pub y: f32,
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Component)]
pub struct Health(pub u32);

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Component)]
pub struct Frozen;

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash, Component)]
#[component(shared)]
pub struct Team(pub u32);

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash, Component)]
#[component(shared)]
pub struct Layer(pub u8);

#[repr(C)]
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Pod, Zeroable, Component)]
#[component(buffer, inline_capacity = 4)]
pub struct Sample(pub u32);

#[repr(C)]
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Pod, Zeroable, Component)]
#[component(buffer)]
pub struct Rgba(pub [u8; 4]);

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Component)]
#[component(system_state)]
pub struct Tracked(pub u32);

#[derive(Copy, Clone, Component)]
pub struct Oversized(pub [u8; 4096]);

impl Default for Oversized {
	fn default() -> Self {
		Self([0; 4096])
	}
}

/// A world whose chunks only hold a few dozen entities, so that tests span many chunks.
pub fn small_world() -> EcsContext {
	EcsContext::with_config(WorldConfig::default().with_chunk_size(1024))
}

pub fn types_of(world: &EntityStore, entity: Entity) -> Vec<ComponentType> {
	match world.component_types(entity) {
		Ok(types) => types,
		Err(error) => panic!("{entity} should be alive: {error}"),
	}
}

/// Check that every chunk stores its entities in a dense prefix, that every stored entity is
/// alive and located where the chunk says, and that the counts add up.
pub fn assert_storage_consistent(world: &EntityStore) {
	let mut total = 0;
	for archetype in world.archetype_store.iter() {
		let mut in_archetype = 0;
		for chunk in archetype.chunks() {
			assert!(!chunk.is_empty(), "Empty chunks must be released");
			assert!(chunk.count() <= chunk.capacity(), "Chunk count exceeds its capacity");
			assert_eq!(chunk.entities().len(), chunk.count(), "Entity stream is not a dense prefix");

			for entity in chunk.entities() {
				assert!(world.exists(*entity), "Stored entity {entity} is not alive");
				assert_eq!(
					world.archetype_of(*entity).ok(),
					Some(archetype.id()),
					"Entity {entity} is stored in an unexpected archetype"
				);
			}
			in_archetype += chunk.count();
		}
		assert_eq!(archetype.entity_count(), in_archetype, "Archetype entity count is out of sync");
		total += in_archetype;
	}
	assert_eq!(world.entity_count(), total, "Live entity count does not match stored rows");
}
