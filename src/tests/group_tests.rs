use crate::tests::{small_world, Frozen, Health, Position, Sample, Team, Velocity};
use crate::error::{AccessHazard, EcsError, TypeMismatch};
use crate::entities::{ComponentGroup, Entity};
use crate::jobs::{AccessMode, JobHandle};
use crate::components::Component;
use crate::create_archetype;
use parking_lot::Mutex;
use std::sync::Arc;
use crate::EcsContext;

#[test]
pub fn group_matches_required_and_excluded() {
	let mut ecs = EcsContext::new();
	let group = ecs.get_component_group(ComponentGroup::build().read::<Position>().exclude::<Frozen>());

	let moving = create_archetype!(ecs, [Position, Velocity]).unwrap();
	let frozen = create_archetype!(ecs, [Position, Frozen]).unwrap();
	let other = create_archetype!(ecs, [Velocity]).unwrap();
	let mut entities = vec![Entity::default(); 10];
	for archetype in [moving, frozen, other] {
		ecs.create_entities_from_archetype(archetype, &mut entities);
	}

	assert_eq!(ecs.calculate_length(group), 10, "Archetypes created after the group are matched too");
	let view = ecs.group_view(group);
	assert!(view.entities().iter().all(|e| e.index() < 10));
}

#[test]
pub fn view_arrays_are_index_aligned() {
	let mut ecs = small_world();
	let archetypes = [
		create_archetype!(ecs, [Position, Health]).unwrap(),
		create_archetype!(ecs, [Position, Health, Velocity]).unwrap(),
	];

	let mut expected = Vec::new();
	for (a, archetype) in archetypes.iter().enumerate() {
		let mut entities = vec![Entity::default(); 150];
		ecs.create_entities_from_archetype(*archetype, &mut entities);
		for (i, entity) in entities.iter().enumerate() {
			let value = (a * 1000 + i) as u32;
			ecs.set_component(*entity, Health(value)).unwrap();
			ecs.set_component(*entity, Position { x: value as f32, y: 0.0 }).unwrap();
			expected.push((*entity, value));
		}
	}

	let group = ecs.get_component_group(ComponentGroup::build().read::<Health>().write::<Position>());
	let view = ecs.group_view(group);
	assert_eq!(view.len(), 300);
	assert!(view.chunk_count() > 2, "The view spans several chunks");

	let entities = view.entities();
	let health = view.read::<Health>().unwrap();
	let mut positions = view.write::<Position>().unwrap();
	assert_eq!(health.len(), entities.len());
	assert_eq!(health.chunks().map(|c| c.len()).sum::<usize>(), 300);

	for i in 0..view.len() {
		let entity = entities.get(i).unwrap();
		let value = expected.iter().find(|(e, _)| *e == entity).unwrap().1;
		assert_eq!(health[i], Health(value));
		assert_eq!(positions[i].x, value as f32);
		positions[i].y = value as f32;
	}
	assert!(entities.get(300).is_none());
	drop((health, positions));

	for (entity, value) in expected {
		assert_eq!(ecs.get_component::<Position>(entity).unwrap().y, value as f32, "Writes through the view are stored");
	}
}

#[test]
pub fn undeclared_and_conflicting_access_is_rejected() {
	let mut ecs = EcsContext::new();
	let archetype = create_archetype!(ecs, [Position, Health, Velocity]).unwrap();
	ecs.create_entity_from_archetype(archetype);

	let group = ecs.get_component_group(ComponentGroup::build().read::<Health>().write::<Position>());
	let view = ecs.group_view(group);

	assert!(matches!(
		view.read::<Velocity>(),
		Err(EcsError::ConcurrentMutationHazard { hazard: AccessHazard::Undeclared, .. })
	));
	assert!(matches!(
		view.write::<Health>(),
		Err(EcsError::ConcurrentMutationHazard { hazard: AccessHazard::ReadOnly, .. })
	));

	let first = view.read::<Health>().unwrap();
	let second = view.read::<Health>().unwrap();
	assert_eq!(first.len(), second.len(), "Read-only arrays can coexist");

	let writer = view.write::<Position>().unwrap();
	assert!(matches!(
		view.write::<Position>(),
		Err(EcsError::ConcurrentMutationHazard { hazard: AccessHazard::AlreadyBorrowed, .. })
	));
	assert!(matches!(
		view.read::<Position>(),
		Err(EcsError::ConcurrentMutationHazard { hazard: AccessHazard::AlreadyBorrowed, .. })
	));
	drop(writer);
	assert!(view.read::<Position>().is_ok(), "Borrows are released with their array");
}

#[test]
pub fn filters_select_chunks_by_shared_value() {
	let mut ecs = EcsContext::new();
	let archetype = create_archetype!(ecs, [Health, Team]).unwrap();
	let mut entities = vec![Entity::default(); 30];
	ecs.create_entities_from_archetype(archetype, &mut entities);
	for (i, entity) in entities.iter().enumerate() {
		ecs.set_component(*entity, Health(i as u32)).unwrap();
		ecs.set_shared_component(*entity, Team(i as u32 % 3)).unwrap();
	}

	let group = ecs.get_component_group(ComponentGroup::build().read::<Health>().read::<Team>());
	assert_eq!(ecs.calculate_length(group), 30);

	ecs.set_filter(group, Team(1)).unwrap();
	assert_eq!(ecs.calculate_length(group), 10);
	{
		let view = ecs.group_view(group);
		let health = view.read::<Health>().unwrap();
		let teams = view.shared::<Team>().unwrap();
		assert!(health.iter().all(|h| h.0 % 3 == 1));
		assert!(teams.iter().all(|t| t == Team(1)));
		assert_eq!(teams.len(), 10);
	}

	ecs.set_filter(group, Team(7)).unwrap();
	assert_eq!(ecs.calculate_length(group), 0, "Unknown values match nothing");

	ecs.set_filter(group, Team(0)).unwrap();
	assert_eq!(ecs.calculate_length(group), 10, "The default value is a valid filter");

	ecs.reset_filter(group);
	assert_eq!(ecs.calculate_length(group), 30);

	let other = ecs.get_component_group(ComponentGroup::build().read::<Health>());
	assert!(matches!(
		ecs.set_filter(other, Team(1)),
		Err(EcsError::TypeMismatch { mismatch: TypeMismatch::NotInGroup, .. })
	));
}

#[test]
pub fn groups_are_registered_independently() {
	let mut ecs = EcsContext::new();
	let a = ecs.get_component_group(ComponentGroup::build().read::<Health>().read::<Team>());
	let b = ecs.get_component_group(ComponentGroup::build().read::<Health>().read::<Team>());
	assert_ne!(a, b);

	let entity = ecs.create_entity();
	ecs.add_component(entity, Health(1)).unwrap();
	ecs.add_shared_component(entity, Team(2)).unwrap();

	ecs.set_filter(a, Team(5)).unwrap();
	assert_eq!(ecs.calculate_length(a), 0);
	assert_eq!(ecs.calculate_length(b), 1, "Filters belong to a single group");
	assert_eq!(ecs.group_access(a).mode(Health::component_id()), Some(AccessMode::ReadOnly));
}

#[test]
pub fn buffer_accessor_reaches_every_entity() {
	let mut ecs = small_world();
	let mut entities = Vec::new();
	for i in 0..40u32 {
		let entity = ecs.create_entity();
		ecs.add_buffer::<Sample>(entity).unwrap().push(Sample(i));
		entities.push(entity);
	}

	let group = ecs.get_component_group(ComponentGroup::build().write::<Sample>());
	{
		let view = ecs.group_view(group);
		let buffers = view.buffers::<Sample>().unwrap();
		assert_eq!(buffers.len(), 40);
		for i in 0..buffers.len() {
			let buffer = buffers.get(i).unwrap();
			let first = buffer.get(0).unwrap();
			buffer.extend_from_slice(&[first; 8]);
		}
		assert!(matches!(
			view.write::<Sample>(),
			Err(EcsError::TypeMismatch { mismatch: TypeMismatch::NotData, .. })
		));
	}

	for (i, entity) in entities.iter().enumerate() {
		assert_eq!(ecs.get_buffer::<Sample>(*entity).unwrap().to_vec(), vec![Sample(i as u32); 9]);
	}
}

#[test]
pub fn jobs_borrow_their_view() {
	let mut ecs = EcsContext::new();
	let archetype = create_archetype!(ecs, [Health]).unwrap();
	let mut entities = vec![Entity::default(); 12];
	ecs.create_entities_from_archetype(archetype, &mut entities);

	let group = ecs.get_component_group(ComponentGroup::build().read::<Health>());
	let seen: Arc<Mutex<Vec<Entity>>> = Arc::new(Mutex::new(Vec::new()));
	let handle = {
		let seen = seen.clone();
		ecs.schedule(group, JobHandle::completed(), move |view| *seen.lock() = view.entities().to_vec())
	};

	ecs.destroy_entity(entities[0]).unwrap();
	assert!(handle.is_completed());
	assert_eq!(*seen.lock(), entities);
}

#[test]
#[should_panic(expected = "structural change")]
pub fn version_guards_fail_after_structural_change() {
	let mut ecs = EcsContext::new();
	let guard = ecs.version_guard();
	guard.check();

	ecs.create_entity();
	guard.check();
}

#[test]
#[should_panic(expected = "structural change")]
pub fn version_guards_fail_once_the_world_is_dropped() {
	let ecs = EcsContext::new();
	let guard = ecs.version_guard();
	drop(ecs);
	guard.check();
}
