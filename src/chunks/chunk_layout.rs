use crate::error::{CapacityError, EcsError, Result};
use crate::buffers::align_up;
use crate::components::{ComponentId, ComponentType};
use crate::entities::Entity;
use crate::chunks::CHUNK_ALIGN;
use std::mem::size_of;

/// The position of one component stream inside a chunk.
#[derive(Copy, Clone, Debug)]
pub struct StreamLayout {
	pub component: ComponentType,
	pub offset: usize,
}

/// How the streams of an archetype are laid out in a chunk.
///
/// The [Entity] stream always starts at offset 0, followed by one stream per
/// non-shared component in ascending [ComponentId] order.
#[derive(Clone, Debug)]
pub struct ChunkLayout {
	chunk_size: usize,
	capacity: usize,
	streams: Vec<StreamLayout>,
}

impl ChunkLayout {
	/// Compute the layout of `components` for chunks of `chunk_size` bytes.
	/// Shared components are skipped, as they don't occupy stream memory.
	pub fn new(components: &[ComponentType], chunk_size: usize) -> Result<Self> {
		let components: Vec<ComponentType> = components.iter().filter(|c| !c.is_shared()).copied().collect();
		debug_assert!(components.windows(2).all(|w| w[0].id() < w[1].id()));

		if let Some(c) = components.iter().find(|c| c.align() > CHUNK_ALIGN) {
			return Err(EcsError::capacity(c.name(), CapacityError::AlignmentTooLarge { align: c.align() }));
		}

		let stride = size_of::<Entity>() + components.iter().map(|c| c.size()).sum::<usize>();
		let mut capacity = chunk_size / stride;
		loop {
			if capacity == 0 {
				let name = components.last().map_or("Entity", |c| c.name());
				return Err(EcsError::capacity(name, CapacityError::ComponentTooLarge { size: stride, chunk_size }));
			}

			let (streams, end) = Self::place(&components, capacity);
			if end <= chunk_size {
				return Ok(Self { chunk_size, capacity, streams });
			}
			capacity -= 1;
		}
	}

	fn place(components: &[ComponentType], capacity: usize) -> (Vec<StreamLayout>, usize) {
		let mut offset = size_of::<Entity>() * capacity;
		let streams = components
			.iter()
			.map(|component| {
				let start = align_up(offset, component.align());
				offset = start + component.size() * capacity;
				StreamLayout { component: *component, offset: start }
			})
			.collect();
		(streams, offset)
	}

	#[inline(always)]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	#[inline(always)]
	pub fn chunk_size(&self) -> usize {
		self.chunk_size
	}

	#[inline(always)]
	pub fn streams(&self) -> &[StreamLayout] {
		&self.streams
	}

	/// Find the stream holding the component `id`.
	#[inline(always)]
	pub fn stream(&self, id: ComponentId) -> Option<&StreamLayout> {
		self.streams
			.binary_search_by_key(&id, |s| s.component.id())
			.ok()
			.map(|i| &self.streams[i])
	}
}
