use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::mem::{align_of, size_of};
use crate::components::Component;
use std::ptr::null_mut;

/// Alignment of every heap block. Fixed so that any same-sized view of a buffer frees it identically.
pub(crate) const HEAP_ALIGN: usize = 16;

/// Inline storage budget used when a buffer element doesn't specify an inline capacity.
const DEFAULT_INLINE_BYTES: usize = 128;

/// The number of elements of `element_size` bytes stored inline by default.
pub const fn default_inline_capacity(element_size: usize) -> usize {
	if element_size == 0 || element_size > DEFAULT_INLINE_BYTES {
		1
	} else {
		DEFAULT_INLINE_BYTES / element_size
	}
}

/// Stored at the start of every buffer slot. A null `heap` means the elements are inline.
#[repr(C)]
pub(crate) struct BufferHeader {
	pub heap: *mut u8,
	pub length: u32,
	pub capacity: u32,
}

/// Placement of a buffer slot inside a chunk stream.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct InlineLayout {
	pub size: usize,
	pub align: usize,
	pub data_offset: usize,
}

impl InlineLayout {
	pub const fn of<T: Component>() -> Self {
		Self::new(size_of::<T>(), align_of::<T>(), T::INLINE_CAPACITY)
	}

	pub const fn new(element_size: usize, element_align: usize, inline_capacity: usize) -> Self {
		let header_align = align_of::<BufferHeader>();
		let align = if element_align > header_align { element_align } else { header_align };
		let data_offset = align_up(size_of::<BufferHeader>(), element_align);
		let size = align_up(data_offset + element_size * inline_capacity, align);
		Self { size, align, data_offset }
	}
}

#[inline(always)]
pub(crate) const fn align_up(value: usize, align: usize) -> usize {
	(value + align - 1) & !(align - 1)
}

pub(crate) fn heap_layout(capacity: usize, element_size: usize) -> Layout {
	match capacity.checked_mul(element_size).map(|size| Layout::from_size_align(size, HEAP_ALIGN)) {
		Some(Ok(layout)) => layout,
		_ => panic!("buffer capacity overflow"),
	}
}

#[cfg(test)]
thread_local! {
	/// Heap blocks allocated and not yet freed by the current thread.
	pub(crate) static LIVE_HEAP_BLOCKS: std::cell::Cell<isize> = std::cell::Cell::new(0);
}

#[inline(always)]
fn count_heap_block(_delta: isize) {
	#[cfg(test)]
	LIVE_HEAP_BLOCKS.with(|live| live.set(live.get() + _delta));
}

/// Allocate a heap block for `capacity` elements.
///
/// # Safety
/// `capacity * element_size` must be greater than zero.
pub(crate) unsafe fn allocate_heap(capacity: usize, element_size: usize) -> *mut u8 {
	let layout = heap_layout(capacity, element_size);
	let heap = alloc(layout);
	if heap.is_null() {
		handle_alloc_error(layout);
	}
	count_heap_block(1);
	heap
}

/// Free a block returned by [allocate_heap] with the same `capacity` and `element_size`.
///
/// # Safety
/// `heap` must not be used or freed again.
pub(crate) unsafe fn free_heap(heap: *mut u8, capacity: usize, element_size: usize) {
	dealloc(heap, heap_layout(capacity, element_size));
	count_heap_block(-1);
}

/// Alignment guaranteed for the elements of a buffer slot described by `layout`, wherever they are stored.
pub(crate) const fn storage_align(layout: &InlineLayout) -> usize {
	let offset_align = layout.data_offset & layout.data_offset.wrapping_neg();
	let inline = if offset_align < layout.align { offset_align } else { layout.align };
	if inline < HEAP_ALIGN {
		inline
	} else {
		HEAP_ALIGN
	}
}

pub(crate) unsafe fn init_buffer<T: Component>(dst: *mut u8) {
	std::ptr::write(
		dst as *mut BufferHeader,
		BufferHeader {
			heap: null_mut(),
			length: 0,
			capacity: T::INLINE_CAPACITY as u32,
		},
	);
}

/// Frees the heap block, if any, and leaves an empty inline buffer behind.
pub(crate) unsafe fn dispose_buffer<T: Component>(dst: *mut u8) {
	let header = &mut *(dst as *mut BufferHeader);
	if !header.heap.is_null() {
		free_heap(header.heap, header.capacity as usize, size_of::<T>());
		header.heap = null_mut();
	}
	header.length = 0;
	header.capacity = T::INLINE_CAPACITY as u32;
}

/// Copies the slot at `src` into `dst`, giving `dst` its own heap block.
pub(crate) unsafe fn clone_buffer<T: Component>(src: *const u8, dst: *mut u8) {
	let layout = InlineLayout::of::<T>();
	std::ptr::copy_nonoverlapping(src, dst, layout.size);

	let source = &*(src as *const BufferHeader);
	if !source.heap.is_null() {
		let heap = allocate_heap(source.capacity as usize, size_of::<T>());
		std::ptr::copy_nonoverlapping(source.heap, heap, source.length as usize * size_of::<T>());
		(*(dst as *mut BufferHeader)).heap = heap;
	}
}
