use crate::commands::{Command, CommandSegment};
use crate::components::{CleanupEntity, Component, ComponentType};
use crate::error::{EcsError, Result, TypeMismatch};
use crate::entities::{Entity, EntityStore};
use crate::data_structures::BitField;
use std::collections::{HashMap, HashSet};
use crate::chunks::ChunkLayout;
use tracing::trace;

/// Validate then apply `segments`, in (key, sequence) order.
/// Nothing is applied if any command would fail.
pub(crate) fn playback(world: &mut EntityStore, mut segments: Vec<CommandSegment>) -> Result<Vec<Entity>> {
	segments.retain(|s| !s.is_empty());
	segments.sort_by_key(|s| (s.key, s.sequence));

	Simulation::new(world).run(&segments)?;

	world.structural_change();
	let mut created = Vec::with_capacity(segments.iter().map(|s| s.created as usize).sum());
	for segment in segments {
		apply(world, segment, &mut created)?;
	}
	Ok(created)
}

/// Map a placeholder of the segment tagged `tag` to the entity created for it, given the
/// segment's first creation is `created[base]`.
fn resolve(created: &[Entity], base: usize, tag: u32, entity: Entity) -> Result<Entity> {
	match entity.is_placeholder() {
		true if entity.placeholder_tag() == tag => {
			created.get(base + entity.index() as usize).copied().ok_or(EcsError::stale(entity))
		},
		true => Err(EcsError::stale(entity)),
		false => Ok(entity),
	}
}

fn apply(world: &mut EntityStore, segment: CommandSegment, created: &mut Vec<Entity>) -> Result<()> {
	trace!(key = segment.key, sequence = segment.sequence, commands = segment.len(), "applying command segment");

	let base = created.len();
	let CommandSegment { commands, payload, tag, .. } = segment;

	for command in commands {
		match command {
			Command::CreateEntity { archetype } => {
				let entity = match archetype {
					Some(archetype) => world.create_entity_from_archetype(archetype),
					None => world.create_entity(),
				};
				created.push(entity);
			},
			Command::DestroyEntity { entity } => {
				world.destroy_entity(resolve(created, base, tag, entity)?)?;
			},
			Command::AddComponent { entity, component, value } => {
				let entity = resolve(created, base, tag, entity)?;
				world.add_component_type(entity, component)?;
				if let Some(value) = value {
					world.write_component_bytes(entity, &component, &payload[value])?;
				}
			},
			Command::SetComponent { entity, component, value } => {
				let entity = resolve(created, base, tag, entity)?;
				world.write_component_bytes(entity, &component, &payload[value])?;
			},
			Command::RemoveComponent { entity, component } => {
				world.remove_component_type(resolve(created, base, tag, entity)?, component)?;
			},
			Command::AddSharedComponent { entity, apply: shared, .. }
			| Command::SetSharedComponent { entity, apply: shared, .. } => {
				shared(world, resolve(created, base, tag, entity)?)?;
			},
		}
	}

	Ok(())
}

/// Where the placeholders of the segment being simulated start, and the segment's tag.
#[derive(Copy, Clone)]
struct Origin {
	base: u32,
	tag: u32,
}

/// The component sets the entities touched by a command buffer would have after each command.
/// `None` marks an entity that would no longer exist.
struct Simulation<'w> {
	world: &'w EntityStore,
	entities: HashMap<Entity, Option<Vec<ComponentType>>>,
	layouts: HashSet<BitField>,
	created: u32,
}

impl<'w> Simulation<'w> {
	fn new(world: &'w EntityStore) -> Self {
		Self {
			world,
			entities: HashMap::new(),
			layouts: HashSet::new(),
			created: 0,
		}
	}

	fn run(mut self, segments: &[CommandSegment]) -> Result<()> {
		for segment in segments {
			let origin = Origin { base: self.created, tag: segment.tag };
			for command in &segment.commands {
				self.simulate(origin, command)?;
			}
		}
		Ok(())
	}

	/// The simulation key of `entity`. Placeholders of different segments get distinct keys,
	/// and placeholders of another segment are rejected.
	fn key(&self, origin: Origin, entity: Entity) -> Result<Entity> {
		if !entity.is_placeholder() {
			return Ok(entity);
		}
		if entity.placeholder_tag() != origin.tag {
			return Err(EcsError::stale(entity));
		}

		match origin.base.checked_add(entity.index()) {
			Some(ordinal) if ordinal < self.created => Ok(Entity::placeholder(0, ordinal)),
			_ => Err(EcsError::stale(entity)),
		}
	}

	/// The simulated component set of a live entity.
	fn components(&mut self, origin: Origin, entity: Entity) -> Result<(Entity, &mut Vec<ComponentType>)> {
		let key = self.key(origin, entity)?;
		let world = self.world;
		let state = self
			.entities
			.entry(key)
			.or_insert_with(|| world.component_types(entity).ok());

		match state {
			Some(components) => Ok((key, components)),
			None => Err(EcsError::stale(entity)),
		}
	}

	fn simulate(&mut self, origin: Origin, command: &Command) -> Result<()> {
		match command {
			Command::CreateEntity { archetype } => {
				let components = match archetype {
					Some(archetype) => match self.world.archetype_components(*archetype) {
						Some(components) => components.to_vec(),
						None => panic!("archetype {} doesn't belong to this world", archetype.index),
					},
					None => Vec::new(),
				};
				self.entities.insert(Entity::placeholder(0, self.created), Some(components));
				self.created += 1;
			},
			Command::DestroyEntity { entity } => {
				let (key, components) = self.components(origin, *entity)?;
				let cleanup = CleanupEntity::component_id();
				let lingering = match components.iter().any(|t| t.is_system_state()) {
					true => {
						let mut lingering: Vec<ComponentType> =
							components.iter().filter(|t| t.is_system_state() && t.id() != cleanup).copied().collect();
						lingering.push(ComponentType::of::<CleanupEntity>());
						Some(lingering)
					},
					false => None,
				};
				self.entities.insert(key, lingering);
			},
			Command::AddComponent { entity, component, value } => {
				if value.is_some() && !component.is_data() {
					return Err(EcsError::mismatch(component.name(), TypeMismatch::NotData));
				}
				self.add(origin, *entity, *component)?;
			},
			Command::SetComponent { entity, component, .. } => {
				if !component.is_data() {
					return Err(EcsError::mismatch(component.name(), TypeMismatch::NotData));
				}
				self.require(origin, *entity, component)?;
			},
			Command::RemoveComponent { entity, component } => {
				let (key, components) = self.components(origin, *entity)?;
				let position = components
					.iter()
					.position(|t| t == component)
					.ok_or(EcsError::mismatch(component.name(), TypeMismatch::Missing(*entity)))?;
				components.remove(position);

				if matches!(components.as_slice(), [only] if only.id() == CleanupEntity::component_id()) {
					self.entities.insert(key, None);
				}
			},
			Command::AddSharedComponent { entity, component, .. } => {
				self.add(origin, *entity, *component)?;
			},
			Command::SetSharedComponent { entity, component, .. } => {
				self.require(origin, *entity, component)?;
			},
		}
		Ok(())
	}

	fn add(&mut self, origin: Origin, entity: Entity, component: ComponentType) -> Result<()> {
		let chunk_size = self.world.config().chunk_size;
		let (_, components) = self.components(origin, entity)?;
		if components.contains(&component) {
			return Err(EcsError::mismatch(component.name(), TypeMismatch::AlreadyPresent(entity)));
		}
		components.push(component);

		let mut sorted = components.clone();
		let mask = BitField::from(sorted.as_slice());
		if !self.layouts.contains(&mask) {
			sorted.sort_by_key(|t| t.id());
			ChunkLayout::new(&sorted, chunk_size)?;
			self.layouts.insert(mask);
		}
		Ok(())
	}

	fn require(&mut self, origin: Origin, entity: Entity, component: &ComponentType) -> Result<()> {
		let (_, components) = self.components(origin, entity)?;
		match components.contains(component) {
			true => Ok(()),
			false => Err(EcsError::mismatch(component.name(), TypeMismatch::Missing(entity))),
		}
	}
}
