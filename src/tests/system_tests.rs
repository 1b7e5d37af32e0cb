use crate::tests::{small_world, Health, Position, Velocity};
use crate::systems::{System, SystemDependencies};
use crate::entities::{ComponentGroup, Entity, EntityStore};
use crate::components::ComponentType;
use crate::commands::Barrier;
use crate::jobs::JobHandle;
use crate::create_archetype;
use crate::EcsContext;

struct MoveSystem {
	group: Option<ComponentGroup>,
	dependencies: SystemDependencies,
}

impl System for MoveSystem {
	fn setup(&mut self, world: &mut EntityStore) {
		let group = world.get_component_group(ComponentGroup::build().write::<Position>().read::<Velocity>());
		self.dependencies.use_group(world, group);
		self.group = Some(group);
	}

	fn run(&mut self, world: &mut EntityStore) {
		let Some(group) = self.group else {
			return;
		};

		self.dependencies.schedule(world, group, |view| {
			let velocities = view.read::<Velocity>().unwrap();
			let mut positions = view.write::<Position>().unwrap();
			for (position, velocity) in positions.iter_mut().zip(velocities.iter()) {
				position.x += velocity.x;
				position.y += velocity.y;
			}
		});
	}
}

/// Spawns one entity per run through a barrier, and removes entities whose health reached zero.
struct SpawnSystem {
	barrier: Barrier,
	group: Option<ComponentGroup>,
}

impl System for SpawnSystem {
	fn setup(&mut self, world: &mut EntityStore) {
		self.group = Some(world.get_component_group(ComponentGroup::build().read::<Health>()));
	}

	fn run(&mut self, world: &mut EntityStore) {
		let Some(group) = self.group else {
			return;
		};

		let concurrent = self.barrier.create_command_buffer().to_concurrent();
		let handle = world.schedule(group, JobHandle::completed(), move |view| {
			let mut writer = concurrent.writer(0);
			let health = view.read::<Health>().unwrap();
			for (entity, health) in view.entities().iter().zip(health.iter()) {
				if health.0 == 0 {
					writer.destroy_entity(entity);
				}
			}

			let spawned = writer.create_entity();
			writer.add_component(spawned, Health(1));
		});
		self.barrier.add_job_handle_for_producer(handle);
	}
}

#[test]
pub fn systems_run_in_order() {
	let mut ecs = small_world();
	let archetype = create_archetype!(ecs, [Position, Velocity]).unwrap();
	let mut entities = vec![Entity::default(); 100];
	ecs.create_entities_from_archetype(archetype, &mut entities);
	for entity in &entities {
		ecs.set_component(*entity, Velocity { x: 1.0, y: 2.0 }).unwrap();
	}

	ecs.register_system(MoveSystem { group: None, dependencies: SystemDependencies::new() });
	ecs.setup_systems();
	for _ in 0..3 {
		ecs.run_systems();
	}

	for entity in &entities {
		assert_eq!(*ecs.get_component::<Position>(*entity).unwrap(), Position { x: 3.0, y: 6.0 });
	}
}

#[test]
#[should_panic(expected = "already been set up")]
pub fn systems_are_set_up_once() {
	let mut ecs = EcsContext::new();
	ecs.register_system(MoveSystem { group: None, dependencies: SystemDependencies::new() });
	ecs.setup_systems();
	ecs.setup_systems();
}

#[test]
pub fn barrier_plays_back_after_producers() {
	let mut ecs = EcsContext::new();
	let barrier = Barrier::new("end of frame");
	ecs.register_system(SpawnSystem { barrier: barrier.clone(), group: None });
	ecs.register_system(barrier.clone());
	ecs.setup_systems();

	ecs.run_systems();
	assert_eq!(ecs.entity_count(), 1);
	assert_eq!(barrier.pending_buffers(), 0);

	ecs.run_systems();
	assert_eq!(ecs.entity_count(), 2);

	let doomed = ecs.create_entity();
	ecs.add_component(doomed, Health(0)).unwrap();
	ecs.run_systems();
	assert!(!ecs.exists(doomed), "Commands recorded by the job were played back");
	assert_eq!(ecs.entity_count(), 3);
}

#[test]
pub fn barrier_reports_rejected_buffers() {
	let mut ecs = EcsContext::new();
	let barrier = Barrier::new("cleanup");
	let entity = ecs.create_entity();

	let mut first = barrier.create_command_buffer();
	first.add_component(entity, Health(1));
	let mut rejected = barrier.create_command_buffer();
	rejected.set_component(entity, Position::default());
	let mut last = barrier.create_command_buffer();
	last.add_component(entity, Velocity::default());

	assert_eq!(barrier.pending_buffers(), 3);
	assert!(barrier.update(&mut ecs).is_err());
	assert_eq!(barrier.name(), "cleanup");
	assert!(ecs.has_component::<Health>(entity).unwrap());
	assert!(!ecs.has_component::<Position>(entity).unwrap());
	assert!(ecs.has_component::<Velocity>(entity).unwrap(), "Later buffers are still played back");
	assert!(barrier.update(&mut ecs).is_ok());
}

#[test]
#[should_panic(expected = "played back")]
pub fn recording_after_playback_panics() {
	let mut ecs = EcsContext::new();
	let barrier = Barrier::new("frame");
	let mut buffer = barrier.create_command_buffer();
	barrier.update(&mut ecs).unwrap();
	buffer.create_entity();
}

#[test]
pub fn system_dependencies_chain_jobs() {
	let mut ecs = EcsContext::new();
	let archetype = create_archetype!(ecs, [Position, Velocity, Health]).unwrap();
	let mut entities = vec![Entity::default(); 10];
	ecs.create_entities_from_archetype(archetype, &mut entities);

	let health = ecs.get_component_group(ComponentGroup::build().write::<Health>());
	let position = ecs.get_component_group(ComponentGroup::build().read::<Position>());
	let mut dependencies = SystemDependencies::new();

	let first = dependencies.schedule(&mut ecs, health, |view| {
		view.write::<Health>().unwrap().iter_mut().for_each(|h| h.0 += 1);
	});
	let second = dependencies.schedule(&mut ecs, position, |view| {
		assert_eq!(view.len(), 10);
	});

	assert_eq!(dependencies.groups(), &[health, position]);
	assert!(dependencies.access().writes().contains(&ComponentType::of::<Health>().id()));
	assert_eq!(dependencies.output(), &second);

	dependencies.complete();
	assert!(first.is_completed() && second.is_completed());
	assert!(entities.iter().all(|e| ecs.get_component::<Health>(*e).unwrap().0 == 1));
}

#[test]
pub fn systems_are_listed_in_registration_order() {
	let mut ecs = EcsContext::new();
	ecs.register_system(MoveSystem { group: None, dependencies: SystemDependencies::new() });
	ecs.register_system(Barrier::new("late"));

	let names = ecs.system_names();
	assert_eq!(ecs.system_count(), 2);
	assert!(names[0].ends_with("MoveSystem"));
	assert!(names[1].ends_with("Barrier"));
}

#[test]
#[should_panic(expected = "was already registered")]
pub fn systems_are_registered_once_per_type() {
	let mut ecs = EcsContext::new();
	ecs.register_system(MoveSystem { group: None, dependencies: SystemDependencies::new() });
	ecs.register_system(MoveSystem { group: None, dependencies: SystemDependencies::new() });
}

#[test]
#[should_panic(expected = "once setup has started")]
pub fn systems_cannot_be_registered_after_setup() {
	let mut ecs = EcsContext::new();
	ecs.setup_systems();
	ecs.register_system(Barrier::new("late"));
}

#[test]
#[should_panic(expected = "must be set up")]
pub fn systems_cannot_run_before_setup() {
	let mut ecs = EcsContext::new();
	ecs.run_systems();
}

#[test]
pub fn closures_run_as_systems() {
	let mut ecs = EcsContext::new();
	ecs.register_system(|world: &mut EntityStore| {
		world.create_entity();
	});
	ecs.setup_systems();
	ecs.run_systems();
	ecs.run_systems();
	assert_eq!(ecs.entity_count(), 2);
}
