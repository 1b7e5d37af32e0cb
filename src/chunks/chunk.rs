use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use crate::chunks::{ChunkLayout, StreamLayout};
use crate::entities::Entity;
use std::ptr::NonNull;

/// Alignment of every chunk allocation.
pub const CHUNK_ALIGN: usize = 64;

/// A single allocation holding the streams of up to `capacity` entities.
///
/// Entities always occupy the dense prefix `0..count`. Every chunk also records,
/// for each shared component of its archetype, the index of the shared value it uses.
pub struct Chunk {
	memory: NonNull<u8>,
	layout: Layout,
	count: usize,
	capacity: usize,
	shared: Box<[u32]>,
}

// Chunk memory is only accessed by the sequencing thread or by jobs whose
// access has been ordered by the dependency tracker.
unsafe impl Send for Chunk {}
unsafe impl Sync for Chunk {}

pub(crate) enum RowCopy {
	/// Transfer ownership; components missing from the destination are disposed.
	Move,
	/// Deep-copy; the source is left untouched.
	Clone,
}

impl Chunk {
	pub(crate) fn allocate(layout: &ChunkLayout, shared: Box<[u32]>) -> Self {
		let memory_layout = match Layout::from_size_align(layout.chunk_size(), CHUNK_ALIGN) {
			Ok(memory_layout) => memory_layout,
			Err(_) => panic!("invalid chunk size {}", layout.chunk_size()),
		};

		let memory = unsafe { alloc_zeroed(memory_layout) };
		let memory = match NonNull::new(memory) {
			Some(memory) => memory,
			None => handle_alloc_error(memory_layout),
		};

		Self {
			memory,
			layout: memory_layout,
			count: 0,
			capacity: layout.capacity(),
			shared,
		}
	}

	#[inline(always)]
	pub fn count(&self) -> usize {
		self.count
	}

	#[inline(always)]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	#[inline(always)]
	pub fn is_full(&self) -> bool {
		self.count == self.capacity
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.count == 0
	}

	/// The shared-value index of each shared component, in archetype order.
	#[inline(always)]
	pub fn shared_indices(&self) -> &[u32] {
		&self.shared
	}

	pub(crate) fn take_shared(&mut self) -> Box<[u32]> {
		std::mem::take(&mut self.shared)
	}

	/// The entities stored in this chunk.
	#[inline(always)]
	pub fn entities(&self) -> &[Entity] {
		unsafe { std::slice::from_raw_parts(self.memory.as_ptr() as *const Entity, self.count) }
	}

	#[inline(always)]
	pub(crate) fn base(&self) -> *mut u8 {
		self.memory.as_ptr()
	}

	#[inline(always)]
	pub(crate) fn stream_ptr(&self, stream: &StreamLayout) -> *mut u8 {
		unsafe { self.base().add(stream.offset) }
	}

	#[inline(always)]
	pub(crate) fn component_ptr(&self, stream: &StreamLayout, slot: usize) -> *mut u8 {
		debug_assert!(slot < self.capacity);
		unsafe { self.stream_ptr(stream).add(slot * stream.component.size()) }
	}

	/// Append `entity` to the dense prefix and return its slot.
	/// With `init` set, every stream is default-initialized; otherwise the caller must fill the row.
	pub(crate) fn append(&mut self, layout: &ChunkLayout, entity: Entity, init: bool) -> usize {
		assert!(!self.is_full(), "chunk is full");
		let slot = self.count;
		unsafe {
			(self.base() as *mut Entity).add(slot).write(entity);
			if init {
				for stream in layout.streams() {
					stream.component.init_at(self.component_ptr(stream, slot));
				}
			}
		}
		self.count += 1;
		slot
	}

	/// Remove the entity at `slot` by moving the last entity into it.
	/// Components are not disposed. Returns the entity that was moved, if any.
	///
	/// # Safety
	/// `slot` must be in `0..count` and `layout` must be this chunk's layout.
	pub(crate) unsafe fn swap_remove(&mut self, layout: &ChunkLayout, slot: usize) -> Option<Entity> {
		debug_assert!(slot < self.count);
		let last = self.count - 1;
		self.count -= 1;
		if slot == last {
			return None;
		}

		for stream in layout.streams() {
			let size = stream.component.size();
			let src = self.component_ptr(stream, last);
			let dst = self.component_ptr(stream, slot);
			std::ptr::copy_nonoverlapping(src, dst, size);
		}

		let entities = self.base() as *mut Entity;
		let moved = entities.add(last).read();
		entities.add(slot).write(moved);
		Some(moved)
	}

	/// Dispose the components at `slot`.
	///
	/// # Safety
	/// `slot` must hold an initialized row of `layout`.
	pub(crate) unsafe fn dispose_row(&self, layout: &ChunkLayout, slot: usize) {
		for stream in layout.streams().iter().filter(|s| s.component.needs_dispose()) {
			stream.component.dispose_at(self.component_ptr(stream, slot));
		}
	}

	/// Dispose every row of the chunk.
	///
	/// # Safety
	/// `layout` must be this chunk's layout.
	pub(crate) unsafe fn dispose_all(&mut self, layout: &ChunkLayout) {
		for slot in 0..self.count {
			self.dispose_row(layout, slot);
		}
	}
}

impl Drop for Chunk {
	fn drop(&mut self) {
		unsafe { dealloc(self.memory.as_ptr(), self.layout) }
	}
}

/// Copy the components of one row into a row of another chunk.
///
/// Both layouts are sorted by component id; destination streams missing from the
/// source are default-initialized.
///
/// # Safety
/// Both rows must be valid, distinct and described by their respective layouts.
pub(crate) unsafe fn copy_row(
	src: &Chunk, src_layout: &ChunkLayout, src_slot: usize, dst: &Chunk, dst_layout: &ChunkLayout, dst_slot: usize,
	mode: RowCopy,
) {
	let mut source = src_layout.streams().iter().peekable();
	for stream in dst_layout.streams() {
		let id = stream.component.id();
		let dst_ptr = dst.component_ptr(stream, dst_slot);

		while let Some(s) = source.next_if(|s| s.component.id() < id) {
			if let RowCopy::Move = mode {
				s.component.dispose_at(src.component_ptr(s, src_slot));
			}
		}

		match source.next_if(|s| s.component.id() == id) {
			Some(s) => {
				let src_ptr = src.component_ptr(s, src_slot);
				match mode {
					RowCopy::Move => std::ptr::copy_nonoverlapping(src_ptr, dst_ptr, stream.component.size()),
					RowCopy::Clone => stream.component.clone_at(src_ptr, dst_ptr),
				}
			},
			None => stream.component.init_at(dst_ptr),
		}
	}

	if let RowCopy::Move = mode {
		for s in source {
			s.component.dispose_at(src.component_ptr(s, src_slot));
		}
	}
}
