//! World construction settings.

use tracing::warn;

/// Default chunk size class: 16 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;
pub const MIN_CHUNK_SIZE: usize = 1024;
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Settings applied when an [EcsContext](crate::EcsContext) is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldConfig {
	/// Size in bytes of every chunk allocation. Must be a power of two.
	pub chunk_size: usize,
	/// Number of entity slots reserved up front.
	pub initial_entity_capacity: usize,
}

impl Default for WorldConfig {
	fn default() -> Self {
		Self {
			chunk_size: DEFAULT_CHUNK_SIZE,
			initial_entity_capacity: 0,
		}
	}
}

impl WorldConfig {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
		self.chunk_size = chunk_size;
		self
	}

	#[must_use]
	pub fn with_initial_entity_capacity(mut self, capacity: usize) -> Self {
		self.initial_entity_capacity = capacity;
		self
	}

	/// Clamps the chunk size into the supported range of power-of-two size classes.
	pub(crate) fn validated(mut self) -> Self {
		let requested = self.chunk_size;
		let clamped = requested.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE).next_power_of_two().min(MAX_CHUNK_SIZE);
		if clamped != requested {
			warn!(requested, chunk_size = clamped, "unsupported chunk size, using the nearest size class");
			self.chunk_size = clamped;
		}
		self
	}
}
