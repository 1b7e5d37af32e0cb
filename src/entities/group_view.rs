use crate::components::{BufferElement, Component, ComponentType, SharedComponent};
use crate::error::{AccessHazard, EcsError, Result, TypeMismatch};
use std::sync::atomic::{AtomicU64, Ordering};
use std::ops::{Index, IndexMut};
use crate::buffers::DynamicBuffer;
use crate::jobs::AccessMode;
use crate::entities::Entity;
use std::marker::PhantomData;
use std::cell::Cell;
use std::any::Any;
use std::sync::Arc;

/// Snapshot of the world's structural version, taken when a view is created.
pub(crate) struct VersionGuard {
	counter: Arc<AtomicU64>,
	expected: u64,
}

impl VersionGuard {
	pub fn new(counter: Arc<AtomicU64>) -> Self {
		let expected = counter.load(Ordering::Acquire);
		Self { counter, expected }
	}

	#[inline(always)]
	pub fn check(&self) {
		assert_eq!(
			self.counter.load(Ordering::Acquire),
			self.expected,
			"component data accessed after a structural change"
		);
	}
}

pub(crate) enum ColumnData {
	Stream(Vec<*mut u8>),
	Shared(Vec<Option<Arc<dyn Any + Send + Sync>>>),
}

pub(crate) struct Column {
	component: ComponentType,
	mode: AccessMode,
	data: ColumnData,
	borrow: Cell<isize>,
}

impl Column {
	pub fn new(component: ComponentType, mode: AccessMode, chunks: usize) -> Self {
		let data = match component.is_shared() {
			true => ColumnData::Shared(Vec::with_capacity(chunks)),
			false => ColumnData::Stream(Vec::with_capacity(chunks)),
		};
		Self { component, mode, data, borrow: Cell::new(0) }
	}

	pub fn component(&self) -> &ComponentType {
		&self.component
	}

	pub fn push_stream(&mut self, ptr: *mut u8) {
		if let ColumnData::Stream(ptrs) = &mut self.data {
			ptrs.push(ptr);
		}
	}

	pub fn push_shared(&mut self, value: Option<Arc<dyn Any + Send + Sync>>) {
		if let ColumnData::Shared(values) = &mut self.data {
			values.push(value);
		}
	}

	fn streams(&self) -> &[*mut u8] {
		match &self.data {
			ColumnData::Stream(ptrs) => ptrs,
			ColumnData::Shared(_) => &[],
		}
	}
}

/// Releases a column borrow when the array holding it is dropped.
struct BorrowRelease<'v> {
	cell: &'v Cell<isize>,
}

impl Drop for BorrowRelease<'_> {
	fn drop(&mut self) {
		match self.cell.get() {
			-1 => self.cell.set(0),
			readers => self.cell.set(readers - 1),
		}
	}
}

/// Index-aligned access to the entities and components matched by a
/// [ComponentGroup](crate::entities::ComponentGroup).
///
/// Index `i` refers to the same entity in every array obtained from the same view.
/// A component declared read-only can be read through any number of arrays at once;
/// a component declared read-write can be borrowed by one writable array at a time.
pub struct GroupView<'w> {
	starts: Vec<usize>,
	entities: Vec<*mut u8>,
	columns: Vec<Column>,
	version: VersionGuard,
	_world: PhantomData<&'w mut ()>,
}

// Views handed to jobs only touch the columns their access declares, which the
// dependency tracker keeps from overlapping with other jobs.
unsafe impl Send for GroupView<'_> {}

impl<'w> GroupView<'w> {
	pub(crate) fn new(starts: Vec<usize>, entities: Vec<*mut u8>, columns: Vec<Column>, version: VersionGuard) -> Self {
		debug_assert_eq!(starts.len(), entities.len() + 1);
		Self { starts, entities, columns, version, _world: PhantomData }
	}

	/// Number of entities in the view.
	#[inline(always)]
	pub fn len(&self) -> usize {
		self.starts.last().copied().unwrap_or(0)
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Number of chunks the view spans.
	pub fn chunk_count(&self) -> usize {
		self.entities.len()
	}

	pub fn entities(&self) -> EntityArray<'_> {
		self.version.check();
		EntityArray { segments: Segments::new(&self.starts, &self.entities, &self.version) }
	}

	/// Read-only access to a data component.
	pub fn read<T: Component>(&self) -> Result<ReadOnlyDataArray<'_, T>> {
		let column = self.column::<T>()?;
		data_kind(column)?;
		let borrow = self.borrow(column, AccessMode::ReadOnly)?;
		Ok(ReadOnlyDataArray {
			segments: Segments::new(&self.starts, column.streams(), &self.version),
			_borrow: borrow,
			_marker: PhantomData,
		})
	}

	/// Read-write access to a data component declared with [write](crate::entities::GroupBuilder::write).
	pub fn write<T: Component>(&self) -> Result<ComponentDataArray<'_, T>> {
		let column = self.column::<T>()?;
		data_kind(column)?;
		let borrow = self.borrow(column, AccessMode::ReadWrite)?;
		Ok(ComponentDataArray {
			segments: Segments::new(&self.starts, column.streams(), &self.version),
			_borrow: borrow,
			_marker: PhantomData,
		})
	}

	/// Access to the dynamic buffers of every entity. The buffers are writable
	/// only if the element type was declared read-write.
	pub fn buffers<T: BufferElement>(&self) -> Result<BufferAccessor<'_, T>> {
		let column = self.column::<T>()?;
		if !column.component.is_buffer() {
			return Err(EcsError::mismatch(column.component.name(), TypeMismatch::NotBuffer));
		}
		let borrow = self.borrow(column, column.mode)?;
		Ok(BufferAccessor {
			segments: Segments::new(&self.starts, column.streams(), &self.version),
			component: column.component,
			read_only: column.mode == AccessMode::ReadOnly,
			_borrow: borrow,
			_marker: PhantomData,
		})
	}

	/// The shared value of every entity.
	pub fn shared<T: SharedComponent>(&self) -> Result<SharedComponentArray<T>> {
		self.version.check();
		let column = self.column::<T>()?;
		let values = match &column.data {
			ColumnData::Shared(values) => values
				.iter()
				.map(|v| v.as_ref().and_then(|v| v.downcast_ref::<T>()).copied().unwrap_or_default())
				.collect(),
			ColumnData::Stream(_) => return Err(EcsError::mismatch(column.component.name(), TypeMismatch::NotShared)),
		};
		Ok(SharedComponentArray { starts: self.starts.clone(), values })
	}

	fn column<T: Component>(&self) -> Result<&Column> {
		let id = T::component_id();
		self.columns
			.iter()
			.find(|c| c.component.id() == id)
			.ok_or_else(|| EcsError::hazard(std::any::type_name::<T>(), AccessHazard::Undeclared))
	}

	fn borrow<'v>(&'v self, column: &'v Column, mode: AccessMode) -> Result<BorrowRelease<'v>> {
		self.version.check();
		let name = column.component.name();
		match (mode, column.mode, column.borrow.get()) {
			(AccessMode::ReadWrite, AccessMode::ReadOnly, _) => Err(EcsError::hazard(name, AccessHazard::ReadOnly)),
			(AccessMode::ReadWrite, _, 0) => {
				column.borrow.set(-1);
				Ok(BorrowRelease { cell: &column.borrow })
			},
			(AccessMode::ReadOnly, _, readers) if readers >= 0 => {
				column.borrow.set(readers + 1);
				Ok(BorrowRelease { cell: &column.borrow })
			},
			_ => Err(EcsError::hazard(name, AccessHazard::AlreadyBorrowed)),
		}
	}
}

fn data_kind(column: &Column) -> Result<()> {
	match column.component.is_data() {
		true => Ok(()),
		false => Err(EcsError::mismatch(column.component.name(), TypeMismatch::NotData)),
	}
}

/// Per-chunk base pointers of one stream, plus the running entity count at each chunk.
struct Segments<'v> {
	starts: &'v [usize],
	ptrs: &'v [*mut u8],
	version: &'v VersionGuard,
}

impl<'v> Segments<'v> {
	fn new(starts: &'v [usize], ptrs: &'v [*mut u8], version: &'v VersionGuard) -> Self {
		Self { starts, ptrs, version }
	}

	#[inline(always)]
	fn len(&self) -> usize {
		self.starts.last().copied().unwrap_or(0)
	}

	/// The chunk and slot of element `index`.
	#[inline(always)]
	fn locate(&self, index: usize) -> Option<(usize, usize)> {
		if index >= self.len() {
			return None;
		}
		let chunk = self.starts.partition_point(|start| *start <= index) - 1;
		Some((chunk, index - self.starts[chunk]))
	}

	#[inline(always)]
	fn element<T>(&self, index: usize) -> Option<*mut T> {
		self.version.check();
		let (chunk, slot) = self.locate(index)?;
		Some(unsafe { (self.ptrs[chunk] as *mut T).add(slot) })
	}

	fn chunk<T>(&self, chunk: usize) -> (*mut T, usize) {
		(self.ptrs[chunk] as *mut T, self.starts[chunk + 1] - self.starts[chunk])
	}

	fn chunk_count(&self) -> usize {
		self.ptrs.len()
	}
}

/// The entities of a [GroupView].
pub struct EntityArray<'v> {
	segments: Segments<'v>,
}

impl EntityArray<'_> {
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Option<Entity> {
		self.segments.element::<Entity>(index).map(|e| unsafe { *e })
	}

	pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
		self.segments.version.check();
		(0..self.segments.chunk_count()).flat_map(move |c| {
			let (ptr, len) = self.segments.chunk::<Entity>(c);
			unsafe { std::slice::from_raw_parts(ptr as *const Entity, len) }.iter().copied()
		})
	}

	pub fn to_vec(&self) -> Vec<Entity> {
		self.iter().collect()
	}
}

/// Read-only, index-aligned access to one component of a [GroupView].
pub struct ReadOnlyDataArray<'v, T> {
	segments: Segments<'v>,
	_borrow: BorrowRelease<'v>,
	_marker: PhantomData<&'v T>,
}

impl<'v, T: Component> ReadOnlyDataArray<'v, T> {
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Option<&T> {
		self.segments.element::<T>(index).map(|p| unsafe { &*p })
	}

	/// The component values chunk by chunk.
	pub fn chunks(&self) -> impl Iterator<Item = &[T]> + '_ {
		self.segments.version.check();
		(0..self.segments.chunk_count()).map(move |c| {
			let (ptr, len) = self.segments.chunk::<T>(c);
			unsafe { std::slice::from_raw_parts(ptr as *const T, len) }
		})
	}

	pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
		self.chunks().flatten()
	}
}

impl<T: Component> Index<usize> for ReadOnlyDataArray<'_, T> {
	type Output = T;

	fn index(&self, index: usize) -> &T {
		match self.get(index) {
			Some(value) => value,
			None => panic!("index {index} out of bounds for a view of length {}", self.len()),
		}
	}
}

/// Read-write, index-aligned access to one component of a [GroupView].
pub struct ComponentDataArray<'v, T> {
	segments: Segments<'v>,
	_borrow: BorrowRelease<'v>,
	_marker: PhantomData<&'v mut T>,
}

impl<'v, T: Component> ComponentDataArray<'v, T> {
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Option<&T> {
		self.segments.element::<T>(index).map(|p| unsafe { &*p })
	}

	pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
		self.segments.element::<T>(index).map(|p| unsafe { &mut *p })
	}

	/// # Panics
	/// If `index` is out of bounds.
	pub fn set(&mut self, index: usize, value: T) {
		self[index] = value;
	}

	pub fn chunks(&self) -> impl Iterator<Item = &[T]> + '_ {
		self.segments.version.check();
		(0..self.segments.chunk_count()).map(move |c| {
			let (ptr, len) = self.segments.chunk::<T>(c);
			unsafe { std::slice::from_raw_parts(ptr as *const T, len) }
		})
	}

	pub fn chunks_mut(&mut self) -> impl Iterator<Item = &mut [T]> + '_ {
		self.segments.version.check();
		let segments = &self.segments;
		(0..segments.chunk_count()).map(move |c| {
			let (ptr, len) = segments.chunk::<T>(c);
			unsafe { std::slice::from_raw_parts_mut(ptr, len) }
		})
	}

	pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
		self.chunks().flatten()
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
		self.chunks_mut().flatten()
	}
}

impl<T: Component> Index<usize> for ComponentDataArray<'_, T> {
	type Output = T;

	fn index(&self, index: usize) -> &T {
		match self.get(index) {
			Some(value) => value,
			None => panic!("index {index} out of bounds for a view of length {}", self.len()),
		}
	}
}

impl<T: Component> IndexMut<usize> for ComponentDataArray<'_, T> {
	fn index_mut(&mut self, index: usize) -> &mut T {
		let len = self.len();
		match self.get_mut(index) {
			Some(value) => value,
			None => panic!("index {index} out of bounds for a view of length {len}"),
		}
	}
}

/// Index-aligned access to the dynamic buffers of a [GroupView].
pub struct BufferAccessor<'v, T> {
	segments: Segments<'v>,
	component: ComponentType,
	read_only: bool,
	_borrow: BorrowRelease<'v>,
	_marker: PhantomData<&'v mut T>,
}

impl<'v, T: BufferElement> BufferAccessor<'v, T> {
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Option<DynamicBuffer<'_, T>> {
		self.segments.version.check();
		let (chunk, slot) = self.segments.locate(index)?;
		let ptr = unsafe { self.segments.ptrs[chunk].add(slot * self.component.size()) };
		Some(unsafe { DynamicBuffer::from_raw(ptr, &self.component, self.read_only) })
	}
}

/// The shared value of every entity of a [GroupView], stored once per chunk.
pub struct SharedComponentArray<T> {
	starts: Vec<usize>,
	values: Vec<T>,
}

impl<T: SharedComponent> SharedComponentArray<T> {
	pub fn len(&self) -> usize {
		self.starts.last().copied().unwrap_or(0)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Option<T> {
		if index >= self.len() {
			return None;
		}
		let chunk = self.starts.partition_point(|start| *start <= index) - 1;
		Some(self.values[chunk])
	}

	/// One value per chunk of the view.
	pub fn chunk_values(&self) -> &[T] {
		&self.values
	}

	pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
		self.values
			.iter()
			.enumerate()
			.flat_map(move |(c, v)| std::iter::repeat(*v).take(self.starts[c + 1] - self.starts[c]))
	}
}
