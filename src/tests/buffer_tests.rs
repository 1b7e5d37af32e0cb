use crate::tests::{small_world, Health, Rgba, Sample};
use crate::buffers::LIVE_HEAP_BLOCKS;
use crate::error::{CapacityError, EcsError, TypeMismatch};
use crate::components::ComponentType;
use crate::entities::Entity;
use crate::EcsContext;

#[test]
pub fn buffer_grows_out_of_line() {
	let mut ecs = EcsContext::new();
	let entity = ecs.create_entity();
	let buffer = ecs.add_buffer::<Sample>(entity).unwrap();

	assert!(buffer.is_empty());
	assert!(buffer.is_inline());
	assert_eq!(buffer.capacity(), 4);

	for i in 0..4 {
		buffer.push(Sample(i));
	}
	assert!(buffer.is_inline(), "Four elements fit inline");
	assert_eq!(buffer.capacity(), 4);

	buffer.push(Sample(4));
	assert!(!buffer.is_inline());
	assert_eq!(buffer.capacity(), 10, "First overflow reserves twice the required length");

	for i in 5..11 {
		buffer.push(Sample(i));
	}
	assert_eq!(buffer.capacity(), 20, "Later growth doubles");
	assert_eq!(buffer.to_vec(), (0..11).map(Sample).collect::<Vec<_>>());
}

#[test]
pub fn buffer_element_operations() {
	let mut ecs = EcsContext::new();
	let entity = ecs.create_entity();
	let buffer = ecs.add_buffer::<Sample>(entity).unwrap();

	buffer.extend_from_slice(&[Sample(1), Sample(2), Sample(3), Sample(4), Sample(5), Sample(6)]);
	assert_eq!(buffer.len(), 6);
	assert_eq!(buffer.remove_at(0), Sample(1));
	assert_eq!(buffer.get(0), Some(Sample(2)));
	assert_eq!(buffer.get(5), None);

	buffer.set(1, Sample(30));
	buffer.append(Sample(7));
	assert_eq!(buffer.iter().map(|s| s.0).collect::<Vec<_>>(), vec![2, 30, 4, 5, 6, 7]);

	let capacity = buffer.capacity();
	buffer.clear();
	assert!(buffer.is_empty());
	assert_eq!(buffer.capacity(), capacity, "Clearing keeps the storage");

	buffer.reserve(100);
	assert!(buffer.capacity() >= 100);
}

#[test]
pub fn buffers_survive_structural_changes() {
	let mut ecs = small_world();
	let mut entities = Vec::new();
	for i in 0..50u32 {
		let entity = ecs.create_entity();
		let buffer = ecs.add_buffer::<Sample>(entity).unwrap();
		for j in 0..i {
			buffer.push(Sample(j));
		}
		entities.push(entity);
	}

	for entity in entities.iter().step_by(3) {
		ecs.add_component(*entity, Health(1)).unwrap();
	}
	ecs.destroy_entity(entities[0]).unwrap();

	for (i, entity) in entities.iter().enumerate().skip(1) {
		let buffer = ecs.get_buffer::<Sample>(*entity).unwrap();
		assert_eq!(buffer.to_vec(), (0..i as u32).map(Sample).collect::<Vec<_>>(), "Buffer of entity {i} changed");
	}
}

#[test]
pub fn reinterpret_aliases_storage() {
	let mut ecs = EcsContext::new();
	let entity = ecs.create_entity();
	let buffer = ecs.add_buffer::<Sample>(entity).unwrap();
	buffer.push(Sample(1));

	let floats = buffer.reinterpret::<f32>().unwrap();
	floats.push(1.5);
	assert_eq!(buffer.len(), 2, "Both views share the same length");
	assert_eq!(buffer.get(1), Some(Sample(1.5f32.to_bits())));

	for _ in 0..10 {
		buffer.push(Sample(0));
	}
	assert!(!floats.is_inline(), "Growth is visible through every view");
	assert_eq!(floats.get(1), Some(1.5));

	assert!(matches!(
		buffer.reinterpret::<u64>(),
		Err(EcsError::CapacityExceeded { reason: CapacityError::ReinterpretSize { from: 4, to: 8 }, .. })
	));
	assert!(matches!(
		buffer.reinterpret::<u16>(),
		Err(EcsError::CapacityExceeded { reason: CapacityError::ReinterpretSize { .. }, .. })
	));
}

#[test]
pub fn reinterpret_allows_stricter_alignment_within_storage() {
	let mut ecs = EcsContext::new();
	let entity = ecs.create_entity();
	let colors = ecs.add_buffer::<Rgba>(entity).unwrap();
	colors.push(Rgba([1, 2, 3, 4]));

	let words = colors.reinterpret::<u32>().unwrap();
	assert_eq!(words.get(0), Some(u32::from_ne_bytes([1, 2, 3, 4])));
	words.set(0, u32::from_ne_bytes([5, 6, 7, 8]));
	assert_eq!(colors.get(0), Some(Rgba([5, 6, 7, 8])));

	for i in 0..100u8 {
		colors.push(Rgba([i; 4]));
	}
	assert!(!words.is_inline());
	assert_eq!(words.get(100), Some(u32::from_ne_bytes([99; 4])));
}

fn live_heap_blocks() -> isize {
	LIVE_HEAP_BLOCKS.with(|live| live.get())
}

#[test]
pub fn heap_blocks_are_freed_exactly_once() {
	let before = live_heap_blocks();
	{
		let mut ecs = EcsContext::new();
		let entity = ecs.create_entity();
		let buffer = ecs.add_buffer::<Sample>(entity).unwrap();
		buffer.extend_from_slice(&[Sample(1); 64]);
		buffer.extend_from_slice(&[Sample(2); 400]);
		assert_eq!(live_heap_blocks() - before, 1, "Growth frees the previous block");

		let inline = ecs.create_entity();
		ecs.add_buffer::<Sample>(inline).unwrap().push(Sample(3));
		assert_eq!(live_heap_blocks() - before, 1, "Inline buffers own no block");

		let mut clones = vec![Entity::default(); 3];
		ecs.instantiate_many(entity, &mut clones).unwrap();
		assert_eq!(live_heap_blocks() - before, 4);

		ecs.remove_component::<Sample>(clones[0]).unwrap();
		assert_eq!(live_heap_blocks() - before, 3);

		ecs.destroy_entity(clones[1]).unwrap();
		ecs.destroy_entity(inline).unwrap();
		assert_eq!(live_heap_blocks() - before, 2);

		ecs.add_component(entity, Health(1)).unwrap();
		assert_eq!(live_heap_blocks() - before, 2, "Moving a row keeps its block");
		assert_eq!(ecs.get_buffer::<Sample>(entity).unwrap().len(), 464);
	}
	assert_eq!(live_heap_blocks(), before, "Dropping the world frees the remaining blocks");
}

#[test]
pub fn removing_a_buffer_frees_it() {
	let mut ecs = EcsContext::new();
	let entity = ecs.create_entity();
	let buffer = ecs.add_buffer::<Sample>(entity).unwrap();
	buffer.extend_from_slice(&[Sample(1); 64]);

	ecs.remove_component::<Sample>(entity).unwrap();
	assert!(matches!(
		ecs.get_buffer::<Sample>(entity),
		Err(EcsError::TypeMismatch { mismatch: TypeMismatch::Missing(_), .. })
	));

	let buffer = ecs.add_buffer::<Sample>(entity).unwrap();
	assert!(buffer.is_empty());
	assert!(buffer.is_inline(), "A re-added buffer starts empty and inline");
}

#[test]
pub fn instantiate_deep_copies_buffers() {
	let mut ecs = EcsContext::new();
	let entity = ecs.create_entity();
	ecs.add_buffer::<Sample>(entity).unwrap().extend_from_slice(&[Sample(3); 16]);

	let mut clones = vec![Entity::default(); 3];
	ecs.instantiate_many(entity, &mut clones).unwrap();
	ecs.get_buffer::<Sample>(clones[0]).unwrap().set(0, Sample(99));
	ecs.destroy_entity(clones[1]).unwrap();

	assert_eq!(ecs.get_buffer::<Sample>(entity).unwrap().get(0), Some(Sample(3)));
	assert_eq!(ecs.get_buffer::<Sample>(clones[0]).unwrap().get(0), Some(Sample(99)));
	assert_eq!(ecs.get_buffer::<Sample>(clones[2]).unwrap().to_vec(), vec![Sample(3); 16]);
}

#[test]
pub fn buffer_component_types_are_distinct() {
	let sample = ComponentType::of::<Sample>();
	assert!(sample.is_buffer());
	assert!(!sample.is_data());
	assert_eq!(sample.inline_capacity(), 4);
	assert_eq!(sample.element_size(), 4);

	let mut ecs = EcsContext::new();
	let entity = ecs.create_entity();
	ecs.add_buffer::<Sample>(entity).unwrap();
	assert!(matches!(
		ecs.get_component::<Sample>(entity),
		Err(EcsError::TypeMismatch { mismatch: TypeMismatch::NotData, .. })
	));
}
