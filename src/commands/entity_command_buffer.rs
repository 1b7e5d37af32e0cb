use crate::components::{BufferElement, Component, ComponentType, SharedComponent};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use crate::commands::{playback, CommandSegment};
use crate::entities::{Entity, EntityStore};
use crate::archetypes::Archetype;
use crate::error::Result;
use std::sync::Arc;
use tracing::warn;

/// Segments recorded into one command buffer, waiting for playback.
#[derive(Default)]
pub(crate) struct CommandQueue {
	main: CommandSegment,
	segments: Vec<CommandSegment>,
	next_sequence: u64,
	closed: bool,
}

impl CommandQueue {
	fn new() -> Self {
		Self {
			next_sequence: 1,
			..Self::default()
		}
	}

	fn len(&self) -> usize {
		self.main.len() + self.segments.iter().map(|s| s.len()).sum::<usize>()
	}

	/// Close the queue and take every recorded segment.
	fn drain(&mut self) -> Vec<CommandSegment> {
		self.closed = true;
		let mut segments = std::mem::take(&mut self.segments);
		segments.push(std::mem::take(&mut self.main));
		segments
	}
}

macro_rules! impl_command_recording {
	($t: ty) => {
		impl $t {
			/// Record the creation of an entity without components.
			/// The returned placeholder can be used by later commands of the same recorder.
			pub fn create_entity(&mut self) -> Entity {
				self.segment().create_entity(None)
			}

			/// Record the creation of an entity of `archetype`.
			pub fn create_entity_from_archetype(&mut self, archetype: Archetype) -> Entity {
				self.segment().create_entity(Some(archetype))
			}

			pub fn destroy_entity(&mut self, entity: Entity) {
				self.segment().destroy_entity(entity)
			}

			pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) {
				self.segment().add_component(entity, value)
			}

			pub fn set_component<T: Component>(&mut self, entity: Entity, value: T) {
				self.segment().set_component(entity, value)
			}

			pub fn remove_component<T: Component>(&mut self, entity: Entity) {
				self.segment().remove_component_type(entity, ComponentType::of::<T>())
			}

			pub fn add_shared_component<T: SharedComponent>(&mut self, entity: Entity, value: T) {
				self.segment().add_shared_component(entity, value)
			}

			pub fn set_shared_component<T: SharedComponent>(&mut self, entity: Entity, value: T) {
				self.segment().set_shared_component(entity, value)
			}

			/// Record the addition of an empty dynamic buffer of `T`.
			pub fn add_buffer<T: BufferElement>(&mut self, entity: Entity) {
				self.segment().add_component_type(entity, ComponentType::of::<T>())
			}
		}
	};
}

/// Records structural changes to be applied later on the sequencing thread.
///
/// Commands are validated as a whole before any of them is applied: if one of them would fail,
/// [playback](EntityCommandBuffer::playback) returns the error and leaves the world untouched.
pub struct EntityCommandBuffer {
	queue: Arc<Mutex<CommandQueue>>,
}

impl Default for EntityCommandBuffer {
	fn default() -> Self {
		Self::new()
	}
}

impl EntityCommandBuffer {
	pub fn new() -> Self {
		Self {
			queue: Arc::new(Mutex::new(CommandQueue::new())),
		}
	}

	/// Another handle to the same queue.
	pub(crate) fn share(&self) -> Self {
		Self { queue: self.queue.clone() }
	}

	fn segment(&mut self) -> MappedMutexGuard<'_, CommandSegment> {
		MutexGuard::map(self.queue.lock(), |queue| {
			assert!(!queue.closed, "command buffer has already been played back");
			&mut queue.main
		})
	}

	/// A handle for recording into this buffer from several threads at once.
	pub fn to_concurrent(&self) -> ConcurrentCommandBuffer {
		ConcurrentCommandBuffer { queue: self.queue.clone() }
	}

	/// Number of recorded commands.
	pub fn len(&self) -> usize {
		self.queue.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Validate and apply every recorded command, returning the entities created, in order.
	///
	/// Commands recorded directly into the buffer run first, then the commands of each
	/// [CommandWriter] ordered by ascending key, then by writer creation order.
	pub fn playback(self, world: &mut EntityStore) -> Result<Vec<Entity>> {
		let segments = self.queue.lock().drain();
		playback::playback(world, segments)
	}
}

impl_command_recording!(EntityCommandBuffer);

/// A shareable handle to an [EntityCommandBuffer], handing out one [CommandWriter] per producer.
#[derive(Clone)]
pub struct ConcurrentCommandBuffer {
	queue: Arc<Mutex<CommandQueue>>,
}

impl ConcurrentCommandBuffer {
	/// A writer recording under `key`.
	///
	/// The key decides the playback order relative to other writers; use a stable key
	/// (such as the index of the work item) to make playback deterministic.
	pub fn writer(&self, key: u32) -> CommandWriter {
		let sequence = {
			let mut queue = self.queue.lock();
			queue.next_sequence += 1;
			queue.next_sequence - 1
		};
		CommandWriter {
			queue: self.queue.clone(),
			segment: CommandSegment::new(key, sequence),
		}
	}
}

/// Records commands on a single thread. The commands are handed to the buffer when the writer is dropped.
pub struct CommandWriter {
	queue: Arc<Mutex<CommandQueue>>,
	segment: CommandSegment,
}

impl CommandWriter {
	fn segment(&mut self) -> &mut CommandSegment {
		&mut self.segment
	}

	pub fn key(&self) -> u32 {
		self.segment.key
	}

	pub fn len(&self) -> usize {
		self.segment.len()
	}

	pub fn is_empty(&self) -> bool {
		self.segment.is_empty()
	}
}

impl_command_recording!(CommandWriter);

impl Drop for CommandWriter {
	fn drop(&mut self) {
		if self.segment.is_empty() {
			return;
		}

		let mut queue = self.queue.lock();
		match queue.closed {
			true => warn!(
				key = self.segment.key,
				commands = self.segment.len(),
				"dropping commands recorded after playback"
			),
			false => queue.segments.push(std::mem::take(&mut self.segment)),
		}
	}
}
