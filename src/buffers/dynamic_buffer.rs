use crate::buffers::{allocate_heap, free_heap, storage_align, BufferHeader, InlineLayout};
use crate::error::{CapacityError, EcsError, Result};
use crate::components::ComponentType;
use std::mem::{align_of, size_of};
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::fmt;

/// A view over the variable-length array stored by a buffer component.
///
/// Elements are accessed by value, so several views of the same buffer (including
/// [reinterpreted](DynamicBuffer::reinterpret) ones) may coexist on one thread and always
/// observe each other's changes.
pub struct DynamicBuffer<'a, T: Copy + 'static> {
	header: NonNull<BufferHeader>,
	data_offset: usize,
	storage_align: usize,
	read_only: bool,
	_marker: PhantomData<(&'a mut BufferHeader, *mut T)>,
}

impl<'a, T: Copy + 'static> DynamicBuffer<'a, T> {
	/// # Safety
	/// `slot` must point to an initialized buffer slot of `component`, whose element type is `T`,
	/// that stays valid and unaliased by other threads for `'a`.
	pub(crate) unsafe fn from_raw(slot: *mut u8, component: &ComponentType, read_only: bool) -> Self {
		debug_assert!(component.is_buffer());
		debug_assert_eq!(component.element_size(), size_of::<T>());
		let layout = InlineLayout::new(component.element_size(), component.element_align(), component.inline_capacity());
		Self {
			header: NonNull::new_unchecked(slot as *mut BufferHeader),
			data_offset: layout.data_offset,
			storage_align: storage_align(&layout),
			read_only,
			_marker: PhantomData,
		}
	}

	#[inline(always)]
	fn raw(&self) -> *mut BufferHeader {
		self.header.as_ptr()
	}

	#[inline(always)]
	fn data(&self) -> *mut T {
		unsafe {
			let heap = (*self.raw()).heap;
			if heap.is_null() {
				(self.raw() as *mut u8).add(self.data_offset) as *mut T
			} else {
				heap as *mut T
			}
		}
	}

	fn assert_writable(&self) {
		assert!(!self.read_only, "buffer was obtained through read-only access");
	}

	/// Number of elements.
	#[inline(always)]
	pub fn len(&self) -> usize {
		unsafe { (*self.raw()).length as usize }
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Number of elements that fit before the next reallocation.
	pub fn capacity(&self) -> usize {
		unsafe { (*self.raw()).capacity as usize }
	}

	/// `true` while the elements are stored inside the chunk.
	pub fn is_inline(&self) -> bool {
		unsafe { (*self.raw()).heap.is_null() }
	}

	pub fn get(&self, index: usize) -> Option<T> {
		match index < self.len() {
			true => Some(unsafe { self.data().add(index).read() }),
			false => None,
		}
	}

	/// Overwrite the element at `index`.
	///
	/// # Panics
	/// If `index` is out of bounds.
	pub fn set(&self, index: usize, value: T) {
		self.assert_writable();
		let len = self.len();
		assert!(index < len, "index {index} out of bounds for a buffer of length {len}");
		unsafe { self.data().add(index).write(value) }
	}

	/// Append an element, moving the buffer to the heap if the inline capacity is exceeded.
	pub fn push(&self, value: T) {
		self.assert_writable();
		let len = self.len();
		self.grow(len + 1);
		unsafe {
			self.data().add(len).write(value);
			(*self.raw()).length += 1;
		}
	}

	/// Alias of [push](Self::push).
	#[inline(always)]
	pub fn append(&self, value: T) {
		self.push(value)
	}

	pub fn extend_from_slice(&self, values: &[T]) {
		self.assert_writable();
		let len = self.len();
		self.grow(len + values.len());
		unsafe {
			std::ptr::copy_nonoverlapping(values.as_ptr(), self.data().add(len), values.len());
			(*self.raw()).length += values.len() as u32;
		}
	}

	/// Remove the element at `index`, shifting the following elements down.
	///
	/// # Panics
	/// If `index` is out of bounds.
	pub fn remove_at(&self, index: usize) -> T {
		self.assert_writable();
		let len = self.len();
		assert!(index < len, "index {index} out of bounds for a buffer of length {len}");
		unsafe {
			let data = self.data();
			let value = data.add(index).read();
			std::ptr::copy(data.add(index + 1), data.add(index), len - index - 1);
			(*self.raw()).length -= 1;
			value
		}
	}

	/// Remove every element. The capacity is retained.
	pub fn clear(&self) {
		self.assert_writable();
		unsafe { (*self.raw()).length = 0 }
	}

	/// Make room for at least `additional` more elements.
	pub fn reserve(&self, additional: usize) {
		self.assert_writable();
		self.grow(self.len() + additional);
	}

	pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
		let mut index = 0;
		std::iter::from_fn(move || {
			let value = self.get(index)?;
			index += 1;
			Some(value)
		})
	}

	pub fn to_vec(&self) -> Vec<T> {
		let len = self.len();
		let mut values = Vec::with_capacity(len);
		unsafe {
			std::ptr::copy_nonoverlapping(self.data(), values.as_mut_ptr(), len);
			values.set_len(len);
		}
		values
	}

	/// View the same storage as a buffer of `U`.
	///
	/// `U` must have the same size as `T`, and its alignment must not exceed the alignment
	/// guaranteed by the buffer's storage (inline slot and heap block alike).
	pub fn reinterpret<U>(&self) -> Result<DynamicBuffer<'_, U>>
	where
		T: bytemuck::Pod,
		U: bytemuck::Pod,
	{
		let name = std::any::type_name::<T>();
		if size_of::<U>() != size_of::<T>() {
			return Err(EcsError::capacity(
				name,
				CapacityError::ReinterpretSize { from: size_of::<T>(), to: size_of::<U>() },
			));
		}
		if align_of::<U>() > self.storage_align {
			return Err(EcsError::capacity(
				name,
				CapacityError::ReinterpretAlign { from: self.storage_align, to: align_of::<U>() },
			));
		}

		Ok(DynamicBuffer {
			header: self.header,
			data_offset: self.data_offset,
			storage_align: self.storage_align,
			read_only: self.read_only,
			_marker: PhantomData,
		})
	}

	fn grow(&self, required: usize) {
		let capacity = self.capacity();
		if required <= capacity {
			return;
		}

		let new_capacity = match self.is_inline() {
			true => required * 2,
			false => (capacity * 2).max(required),
		};
		assert!(new_capacity <= u32::MAX as usize, "buffer capacity overflow");

		unsafe {
			let heap = allocate_heap(new_capacity, size_of::<T>());
			std::ptr::copy_nonoverlapping(self.data() as *const u8, heap, self.len() * size_of::<T>());

			let header = self.raw();
			if !(*header).heap.is_null() {
				free_heap((*header).heap, capacity, size_of::<T>());
			}
			(*header).heap = heap;
			(*header).capacity = new_capacity as u32;
		}
	}
}

impl<T: Copy + fmt::Debug + 'static> fmt::Debug for DynamicBuffer<'_, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}
