use crate::commands::EntityCommandBuffer;
use crate::entities::EntityStore;
use tracing::{debug, warn};
use crate::jobs::JobHandle;
use crate::systems::System;
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct BarrierState {
	buffers: Vec<EntityCommandBuffer>,
	producers: Vec<JobHandle>,
}

/// A point in the frame where the command buffers handed out since the previous update are replayed.
///
/// Cloning a barrier yields another handle to the same pending buffers.
#[derive(Clone)]
pub struct Barrier {
	name: Arc<str>,
	state: Arc<Mutex<BarrierState>>,
}

impl Barrier {
	pub fn new(name: &str) -> Self {
		Self {
			name: Arc::from(name),
			state: Arc::default(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// A new command buffer, played back by the next [update](Self::update).
	/// Buffers are played back in creation order.
	pub fn create_command_buffer(&self) -> EntityCommandBuffer {
		let buffer = EntityCommandBuffer::new();
		self.state.lock().buffers.push(buffer.share());
		buffer
	}

	/// Register a job recording into one of this barrier's buffers.
	/// The next [update](Self::update) waits for it before playing anything back.
	pub fn add_job_handle_for_producer(&self, handle: JobHandle) {
		self.state.lock().producers.push(handle);
	}

	/// Number of buffers waiting for playback.
	pub fn pending_buffers(&self) -> usize {
		self.state.lock().buffers.len()
	}

	/// Complete the producer jobs and play back every pending buffer.
	///
	/// A rejected buffer applies none of its commands; the remaining buffers are still played
	/// back and the first error is returned.
	pub fn update(&self, world: &mut EntityStore) -> Result<()> {
		let (buffers, producers) = {
			let mut state = self.state.lock();
			(std::mem::take(&mut state.buffers), std::mem::take(&mut state.producers))
		};

		producers.iter().for_each(JobHandle::complete);

		let mut result = Ok(());
		for (index, buffer) in buffers.into_iter().enumerate() {
			let commands = buffer.len();
			match buffer.playback(world) {
				Ok(created) => debug!(
					barrier = &*self.name,
					buffer = index,
					commands,
					created = created.len(),
					"played back command buffer"
				),
				Err(error) => {
					warn!(barrier = &*self.name, buffer = index, commands, %error, "rejected command buffer");
					if result.is_ok() {
						result = Err(error);
					}
				},
			}
		}
		result
	}
}

impl System for Barrier {
	fn run(&mut self, world: &mut EntityStore) {
		// rejected buffers are logged by update
		let _ = self.update(world);
	}
}
