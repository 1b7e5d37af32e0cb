use crate::config::{WorldConfig, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::components::{ComponentFlags, ComponentType};
use crate::tests::{Health, Position, Sample, Team, Tracked};
use crate::data_structures::BitField;
use std::collections::HashSet;
use crate::EcsContext;

#[test]
pub fn bit_field_set_and_iterate() {
	let mut bits = BitField::new();
	for i in [3, 64, 65, 200] {
		bits.set(i, true);
	}
	bits.set(64, false);
	bits.set(10_000, false);

	assert!(bits.get(3) && bits.get(65) && bits.get(200));
	assert!(!bits.get(64) && !bits.get(10_000));
	assert_eq!(bits.count_ones(), 3);
	assert_eq!(bits.iter_ones().collect::<Vec<_>>(), vec![3, 65, 200]);

	bits.clear();
	assert!(bits.is_empty());
}

#[test]
pub fn bit_field_set_relations() {
	let small: BitField = [1, 70].into_iter().collect();
	let large: BitField = [1, 5, 70, 300].into_iter().collect();
	let disjoint: BitField = [2, 600].into_iter().collect();

	assert!(small.is_subset_of(&large));
	assert!(!large.is_subset_of(&small));
	assert!(BitField::new().is_subset_of(&small));
	assert!(small.intersects(&large));
	assert!(!small.intersects(&disjoint));
}

#[test]
pub fn bit_field_equality_ignores_capacity() {
	let mut a: BitField = [4, 9].into_iter().collect();
	let b: BitField = [4, 9].into_iter().collect();
	a.ensure_capacity(4096);
	assert!(a.capacity() >= 4096);
	assert_eq!(a, b);

	let set: HashSet<BitField> = [a.clone(), b.clone()].into_iter().collect();
	assert_eq!(set.len(), 1, "Equal bit fields hash alike");

	let mut c = BitField::new();
	c.copy_from(&a);
	assert_eq!(c, b);

	let lower: BitField = [1, 2].into_iter().collect();
	let upper: BitField = [1, 3].into_iter().collect();
	assert!(lower < upper);
}

#[test]
pub fn component_types_describe_their_kind() {
	let health = ComponentType::of::<Health>();
	assert!(health.is_data());
	assert_eq!(health.size(), std::mem::size_of::<Health>());
	assert_eq!(health.flags(), ComponentFlags::NONE);

	let team = ComponentType::of::<Team>();
	assert!(team.is_shared() && !team.is_data());
	assert_eq!(team.size(), 0, "Shared components don't occupy chunk memory");

	assert!(ComponentType::of::<Tracked>().is_system_state());
	assert!(ComponentType::of::<Sample>().flags().contains(ComponentFlags::BUFFER));
	assert_ne!(ComponentType::of::<Position>(), health);
	assert_eq!(ComponentType::of::<Health>(), health);
}

#[test]
pub fn chunk_size_is_clamped() {
	let cases = [
		(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_SIZE),
		(3000, 4096),
		(16, MIN_CHUNK_SIZE),
		(MAX_CHUNK_SIZE * 4, MAX_CHUNK_SIZE),
	];

	for (requested, expected) in cases {
		let ecs = EcsContext::with_config(WorldConfig::new().with_chunk_size(requested));
		assert_eq!(ecs.config().chunk_size, expected, "Unexpected size class for {requested}");
	}

	let ecs = EcsContext::with_config(WorldConfig::default().with_initial_entity_capacity(256));
	assert_eq!(ecs.config().initial_entity_capacity, 256);
	assert_ne!(EcsContext::new().id(), ecs.id(), "Worlds get distinct ids");
}
