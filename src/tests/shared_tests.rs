use crate::tests::{assert_storage_consistent, small_world, Health, Layer, Position, Team};
use crate::shared::{SharedComponentStore, DEFAULT_SHARED_INDEX};
use crate::error::{EcsError, TypeMismatch};
use crate::components::Component;
use crate::entities::{Entity, EntityStore};
use crate::create_archetype;
use rand::prelude::*;
use crate::EcsContext;

/// Number of chunks, across every archetype, referencing `index` for the shared component `T`.
fn chunks_referencing<T: Component>(world: &EntityStore, index: u32) -> u32 {
	world
		.archetype_store
		.iter()
		.filter_map(|a| a.shared_position(T::component_id()).map(|p| (a, p)))
		.map(|(a, p)| a.chunks().iter().filter(|c| c.shared_indices()[p] == index).count() as u32)
		.sum()
}

#[test]
pub fn store_deduplicates_values() {
	let mut store = SharedComponentStore::new();
	let a = store.get_or_add(Team(1));
	let b = store.get_or_add(Team(1));
	let c = store.get_or_add(Team(2));
	let d = store.get_or_add(Layer(1));

	assert_eq!(a, b);
	assert_ne!(a, c);
	assert_ne!(a, d, "Equal payloads of different types are distinct");
	assert_eq!(store.ref_count(a), 2);
	assert_eq!(store.find(&Team(2)), Some(c));
	assert_eq!(store.find(&Team(3)), None);
	assert_eq!(store.get::<Team>(c), Some(Team(2)));
	assert_eq!(store.get::<Layer>(c), None);

	store.release(a);
	store.release(b);
	assert_eq!(store.find(&Team(1)), None, "Unreferenced values are freed");
	assert_eq!(store.get_or_add(Team(9)), a, "Freed slots are reused");
}

#[test]
pub fn default_value_is_never_counted() {
	let mut store = SharedComponentStore::new();
	assert_eq!(store.get_or_add(Team::default()), DEFAULT_SHARED_INDEX);
	assert_eq!(store.find(&Team(0)), Some(DEFAULT_SHARED_INDEX));
	assert_eq!(store.ref_count(DEFAULT_SHARED_INDEX), 0);
	assert_eq!(store.get_or_add(Team(0)), DEFAULT_SHARED_INDEX);
	assert_eq!(store.ref_count(DEFAULT_SHARED_INDEX), 0, "Adding the default twice still counts nothing");

	store.release(DEFAULT_SHARED_INDEX);
	assert_eq!(store.get::<Team>(DEFAULT_SHARED_INDEX), Some(Team(0)));
	assert_eq!(store.get::<Layer>(DEFAULT_SHARED_INDEX), Some(Layer(0)));
}

#[test]
pub fn entities_are_grouped_by_shared_value() {
	let mut ecs = EcsContext::new();
	let archetype = create_archetype!(ecs, [Health, Team]).unwrap();
	let mut entities = vec![Entity::default(); 6];
	ecs.create_entities_from_archetype(archetype, &mut entities);
	assert_eq!(ecs.archetype_chunk_count(archetype), 1);

	for entity in &entities[..3] {
		ecs.set_shared_component(*entity, Team(1)).unwrap();
	}
	assert_eq!(ecs.archetype_chunk_count(archetype), 2);

	let index = ecs.shared_components().find(&Team(1)).unwrap();
	assert_eq!(ecs.shared_components().ref_count(index), 1, "One chunk references the value");

	for entity in &entities {
		ecs.set_shared_component(*entity, Team(1)).unwrap();
	}
	assert_eq!(ecs.archetype_chunk_count(archetype), 1);
	assert_eq!(ecs.get_shared_component::<Team>(entities[5]).unwrap(), Team(1));
	assert_eq!(ecs.get_all_unique_shared_components::<Team>(), vec![Team(0), Team(1)]);
	assert_storage_consistent(&ecs);

	ecs.destroy_entities(&entities).unwrap();
	assert_eq!(ecs.shared_components().find(&Team(1)), None, "Value is freed with its last chunk");
	assert_eq!(ecs.get_all_unique_shared_components::<Team>(), vec![Team(0)]);
}

#[test]
pub fn add_and_remove_shared_components() {
	let mut ecs = EcsContext::new();
	let entity = ecs.create_entity();
	ecs.add_component(entity, Position { x: 1.0, y: 1.0 }).unwrap();
	ecs.add_shared_component(entity, Team(4)).unwrap();

	assert_eq!(ecs.get_shared_component::<Team>(entity).unwrap(), Team(4));
	assert_eq!(*ecs.get_component::<Position>(entity).unwrap(), Position { x: 1.0, y: 1.0 });

	let err = ecs.add_shared_component(entity, Team(5)).unwrap_err();
	assert!(matches!(err, EcsError::TypeMismatch { mismatch: TypeMismatch::AlreadyPresent(_), .. }));
	let fresh = ecs.create_entity();
	let err = ecs.set_shared_component(fresh, Team(5)).unwrap_err();
	assert!(matches!(err, EcsError::TypeMismatch { mismatch: TypeMismatch::Missing(_), .. }));
	let err = ecs.add_component(entity, Team(5)).unwrap_err();
	assert!(matches!(err, EcsError::TypeMismatch { mismatch: TypeMismatch::NotData, .. }));

	ecs.remove_component::<Team>(entity).unwrap();
	assert!(!ecs.has_component::<Team>(entity).unwrap());
	assert_eq!(ecs.shared_components().find(&Team(4)), None);
}

#[test]
pub fn reference_counts_match_chunks() {
	let mut ecs = small_world();
	let mut rng = StdRng::seed_from_u64(7);
	let archetype = create_archetype!(ecs, [Health, Position, Team, Layer]).unwrap();

	let mut live: Vec<Entity> = Vec::new();
	for _ in 0..3000 {
		match rng.gen_range(0..6) {
			0..=1 => live.push(ecs.create_entity_from_archetype(archetype)),
			2 if !live.is_empty() => {
				let entity = live.swap_remove(rng.gen_range(0..live.len()));
				ecs.destroy_entity(entity).unwrap();
			},
			3 if !live.is_empty() => {
				let entity = live[rng.gen_range(0..live.len())];
				ecs.set_shared_component(entity, Layer(rng.gen_range(0..3))).unwrap();
			},
			_ if !live.is_empty() => {
				let entity = live[rng.gen_range(0..live.len())];
				ecs.set_shared_component(entity, Team(rng.gen_range(0..5))).unwrap();
			},
			_ => {},
		}
	}
	assert_storage_consistent(&ecs);

	for team in 1..5 {
		match ecs.shared_components().find(&Team(team)) {
			Some(index) => {
				let chunks = chunks_referencing::<Team>(&ecs, index);
				assert!(chunks > 0, "Value without chunk was not freed");
				assert_eq!(ecs.shared_components().ref_count(index), chunks);
			},
			None => assert_eq!(
				live.iter().filter(|e| ecs.get_shared_component::<Team>(**e).unwrap() == Team(team)).count(),
				0
			),
		}
	}
	for layer in 1..3 {
		if let Some(index) = ecs.shared_components().find(&Layer(layer)) {
			assert_eq!(ecs.shared_components().ref_count(index), chunks_referencing::<Layer>(&ecs, index));
		}
	}

	for chunk in ecs.archetype_store.get(archetype.index).chunks() {
		let teams: Vec<Team> = chunk.entities().iter().map(|e| ecs.get_shared_component::<Team>(*e).unwrap()).collect();
		assert!(teams.windows(2).all(|w| w[0] == w[1]), "A chunk stores a single shared value");
	}
}
