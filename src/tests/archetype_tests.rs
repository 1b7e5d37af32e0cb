use crate::tests::{small_world, Frozen, Health, Oversized, Position, Team, Velocity};
use crate::error::{CapacityError, EcsError};
use crate::components::{Component, ComponentType};
use crate::archetypes::Archetype;
use crate::create_archetype;
use crate::EcsContext;

#[test]
pub fn archetypes_ignore_component_order() {
	let mut ecs = EcsContext::new();
	let a = create_archetype!(ecs, [Position, Velocity, Health]).unwrap();
	let b = create_archetype!(ecs, [Health, Position, Velocity]).unwrap();
	let c = ecs.create_archetype_of::<(Velocity, Health, Position)>().unwrap();
	let d = create_archetype!(ecs, (Health, Velocity, Position)).unwrap();

	assert_eq!(a, b);
	assert_eq!(a, c);
	assert_eq!(a, d);
	assert_eq!(ecs.create_archetype(&[]).unwrap(), Archetype::EMPTY);

	let components = ecs.archetype_components(a).unwrap();
	assert!(components.windows(2).all(|w| w[0].id() < w[1].id()), "Components are sorted by id");
}

#[test]
pub fn duplicate_components_are_rejected() {
	let mut ecs = EcsContext::new();
	let before = ecs.archetype_count();
	let result = create_archetype!(ecs, [Position, Health, Position]);

	assert!(matches!(
		result,
		Err(EcsError::CapacityExceeded { reason: CapacityError::DuplicateComponent, .. })
	));
	assert_eq!(ecs.archetype_count(), before);
}

#[test]
pub fn oversized_components_are_rejected() {
	let mut ecs = small_world();
	let result = create_archetype!(ecs, [Oversized]);
	assert!(matches!(
		result,
		Err(EcsError::CapacityExceeded { reason: CapacityError::ComponentTooLarge { chunk_size: 1024, .. }, .. })
	));

	let mut ecs = EcsContext::new();
	let archetype = create_archetype!(ecs, [Oversized, Health]).unwrap();
	assert_eq!(ecs.archetype_store.get(archetype.index).layout().capacity(), 3);
}

#[test]
pub fn chunk_streams_are_aligned_and_disjoint() {
	let mut ecs = EcsContext::new();
	let archetype = create_archetype!(ecs, [Health, Position, Frozen, Velocity, Team]).unwrap();
	let layout = ecs.archetype_store.get(archetype.index).layout();

	assert_eq!(layout.streams().len(), 4, "Shared components don't occupy a stream");
	assert!(layout.stream(Team::component_id()).is_none());

	let capacity = layout.capacity();
	let mut end = std::mem::size_of::<crate::entities::Entity>() * capacity;
	for stream in layout.streams() {
		assert_eq!(stream.offset % stream.component.align(), 0, "Stream is misaligned");
		assert!(stream.offset >= end, "Streams overlap");
		end = stream.offset + stream.component.size() * capacity;
	}
	assert!(end <= layout.chunk_size());
}

#[test]
pub fn transitions_reuse_archetypes() {
	let mut ecs = EcsContext::new();
	let target = create_archetype!(ecs, [Position, Health]).unwrap();

	let entity = ecs.create_entity();
	ecs.add_component(entity, Health(1)).unwrap();
	ecs.add_component(entity, Position::default()).unwrap();
	assert_eq!(ecs.archetype_of(entity).unwrap(), target);

	let other = ecs.create_entity();
	ecs.add_component(other, Position::default()).unwrap();
	ecs.add_component(other, Health(2)).unwrap();
	assert_eq!(ecs.archetype_of(other).unwrap(), target);

	let count = ecs.archetype_count();
	for _ in 0..2 {
		let first = ecs.create_entity();
		ecs.add_component(first, Health(3)).unwrap();
		ecs.add_component(first, Position::default()).unwrap();
		let second = ecs.create_entity();
		ecs.add_component(second, Position::default()).unwrap();
		ecs.add_component(second, Health(4)).unwrap();
		assert_eq!(ecs.archetype_of(first).unwrap(), target);
		assert_eq!(ecs.archetype_of(second).unwrap(), target);
	}
	assert_eq!(ecs.archetype_count(), count, "No new archetype is created for an existing set");

	ecs.remove_component::<Position>(entity).unwrap();
	ecs.remove_component::<Health>(entity).unwrap();
	assert_eq!(ecs.archetype_of(entity).unwrap(), Archetype::EMPTY);
}

#[test]
pub fn empty_archetypes_are_retained() {
	let mut ecs = EcsContext::new();
	let archetype = create_archetype!(ecs, [Velocity]).unwrap();
	let entity = ecs.create_entity_from_archetype(archetype);
	ecs.destroy_entity(entity).unwrap();

	assert_eq!(ecs.archetype_entity_count(archetype), 0);
	assert_eq!(ecs.archetype_chunk_count(archetype), 0);
	assert_eq!(ecs.archetype_components(archetype), Some(&[ComponentType::of::<Velocity>()][..]));
	assert_eq!(create_archetype!(ecs, [Velocity]).unwrap(), archetype);
}
