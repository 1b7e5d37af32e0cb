use crate::components::ComponentId;
use crate::data_structures::BitField;
use std::hash::{Hash, Hasher};
use std::mem::{align_of, size_of};
use std::ops::BitOr;
use std::fmt;
use crate::buffers;

/// Storage rules attached to a [Component] type.
#[derive(Default, Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ComponentFlags(u8);

impl ComponentFlags {
	pub const NONE: Self = Self(0);
	/// One deduplicated value per chunk instead of one value per entity.
	pub const SHARED: Self = Self(1);
	/// The type is the element of a [DynamicBuffer](crate::buffers::DynamicBuffer).
	pub const BUFFER: Self = Self(1 << 1);
	/// The component survives [entity destruction](crate::entities::EntityStore::destroy_entity).
	pub const SYSTEM_STATE: Self = Self(1 << 2);

	pub const fn union(self, other: Self) -> Self {
		Self(self.0 | other.0)
	}

	pub const fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}
}

impl BitOr for ComponentFlags {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		self.union(rhs)
	}
}

/// Plain data attached to an [Entity](crate::entities::Entity).
///
/// Implemented through #\[derive([`Component`])], which also selects the storage rules
/// through `#[component(shared)]`, `#[component(system_state)]` and `#[component(buffer)]`.
pub trait Component
where
	Self: 'static + Copy + Default + Send + Sync,
{
	const FLAGS: ComponentFlags = ComponentFlags::NONE;
	/// Number of buffer elements stored inside the chunk before spilling to the heap.
	const INLINE_CAPACITY: usize = 0;

	fn component_id() -> ComponentId;
}

/// A [Component] whose value is stored once per chunk and deduplicated across the world.
pub trait SharedComponent: Component + Eq + Hash {}

/// A [Component] used as the element type of a per-entity dynamic buffer.
pub trait BufferElement: Component {}

/// A [Component] that keeps a destroyed entity alive until it is removed.
pub trait SystemStateComponent: Component {}

/// A runtime representation of a type implementing the [`Component`] trait.
#[derive(Copy, Clone)]
pub struct ComponentType {
	id: ComponentId,
	name: &'static str,
	size: usize,
	align: usize,
	element_size: usize,
	element_align: usize,
	inline_capacity: usize,
	flags: ComponentFlags,
	init: unsafe fn(*mut u8),
	clone: unsafe fn(*const u8, *mut u8),
	dispose: Option<unsafe fn(*mut u8)>,
}

impl ComponentType {
	/// Returns the [`ComponentType`] of T.
	pub fn of<T: Component>() -> Self {
		let flags = T::FLAGS;
		let name = std::any::type_name::<T>();
		assert!(
			!(flags.contains(ComponentFlags::SHARED) && flags.contains(ComponentFlags::BUFFER)),
			"{name} cannot be both shared and a buffer element"
		);

		if flags.contains(ComponentFlags::BUFFER) {
			assert!(size_of::<T>() > 0, "buffer element {name} must not be zero sized");
			assert!(
				align_of::<T>() <= buffers::HEAP_ALIGN,
				"buffer element {name} is aligned above {} bytes",
				buffers::HEAP_ALIGN
			);
			let layout = buffers::InlineLayout::of::<T>();
			Self {
				id: T::component_id(),
				name,
				size: layout.size,
				align: layout.align,
				element_size: size_of::<T>(),
				element_align: align_of::<T>(),
				inline_capacity: T::INLINE_CAPACITY,
				flags,
				init: buffers::init_buffer::<T>,
				clone: buffers::clone_buffer::<T>,
				dispose: Some(buffers::dispose_buffer::<T>),
			}
		} else if flags.contains(ComponentFlags::SHARED) {
			Self {
				id: T::component_id(),
				name,
				size: 0,
				align: 1,
				element_size: size_of::<T>(),
				element_align: align_of::<T>(),
				inline_capacity: 0,
				flags,
				init: init_nothing,
				clone: clone_nothing,
				dispose: None,
			}
		} else {
			Self {
				id: T::component_id(),
				name,
				size: size_of::<T>(),
				align: align_of::<T>(),
				element_size: size_of::<T>(),
				element_align: align_of::<T>(),
				inline_capacity: 0,
				flags,
				init: init_value::<T>,
				clone: clone_value::<T>,
				dispose: None,
			}
		}
	}

	#[inline(always)]
	pub const fn id(&self) -> ComponentId {
		self.id
	}

	pub const fn name(&self) -> &'static str {
		self.name
	}

	/// Bytes used per entity in the chunk stream. Zero for shared components.
	#[inline(always)]
	pub const fn size(&self) -> usize {
		self.size
	}

	#[inline(always)]
	pub const fn align(&self) -> usize {
		self.align
	}

	/// Size of the Rust type itself; differs from [size](Self::size) for buffers.
	pub const fn element_size(&self) -> usize {
		self.element_size
	}

	pub const fn element_align(&self) -> usize {
		self.element_align
	}

	pub const fn inline_capacity(&self) -> usize {
		self.inline_capacity
	}

	pub const fn flags(&self) -> ComponentFlags {
		self.flags
	}

	#[inline(always)]
	pub const fn is_shared(&self) -> bool {
		self.flags.contains(ComponentFlags::SHARED)
	}

	#[inline(always)]
	pub const fn is_buffer(&self) -> bool {
		self.flags.contains(ComponentFlags::BUFFER)
	}

	#[inline(always)]
	pub const fn is_system_state(&self) -> bool {
		self.flags.contains(ComponentFlags::SYSTEM_STATE)
	}

	/// Plain per-entity data, neither shared nor a buffer.
	#[inline(always)]
	pub const fn is_data(&self) -> bool {
		!self.is_shared() && !self.is_buffer()
	}

	/// Write the default value of the component to `dst`.
	///
	/// # Safety
	/// `dst` must point to [size](Self::size) writable bytes aligned to [align](Self::align).
	#[inline(always)]
	pub(crate) unsafe fn init_at(&self, dst: *mut u8) {
		(self.init)(dst)
	}

	/// Deep-copy the component at `src` into the uninitialized slot at `dst`.
	///
	/// # Safety
	/// Both pointers must reference distinct slots of this component type.
	#[inline(always)]
	pub(crate) unsafe fn clone_at(&self, src: *const u8, dst: *mut u8) {
		(self.clone)(src, dst)
	}

	/// Release whatever the component at `dst` owns outside of the chunk.
	///
	/// # Safety
	/// `dst` must reference an initialized slot of this component type.
	#[inline(always)]
	pub(crate) unsafe fn dispose_at(&self, dst: *mut u8) {
		if let Some(dispose) = self.dispose {
			dispose(dst)
		}
	}

	pub(crate) const fn needs_dispose(&self) -> bool {
		self.dispose.is_some()
	}
}

unsafe fn init_value<T: Component>(dst: *mut u8) {
	std::ptr::write(dst as *mut T, T::default());
}

unsafe fn clone_value<T: Component>(src: *const u8, dst: *mut u8) {
	std::ptr::copy_nonoverlapping(src as *const T, dst as *mut T, 1);
}

unsafe fn init_nothing(_: *mut u8) {}

unsafe fn clone_nothing(_: *const u8, _: *mut u8) {}

impl Eq for ComponentType {}

impl PartialEq<Self> for ComponentType {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Hash for ComponentType {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state)
	}
}

impl fmt::Debug for ComponentType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentType")
			.field("name", &self.name)
			.field("id", &self.id.value())
			.field("size", &self.size)
			.field("align", &self.align)
			.field("flags", &self.flags)
			.finish()
	}
}

impl From<&[ComponentType]> for BitField {
	fn from(types: &[ComponentType]) -> Self {
		types.iter().map(|ty| ty.id().value()).collect()
	}
}

/// Zero-sized marker carried by destroyed entities that still own
/// [system state components](SystemStateComponent).
#[derive(Default, Copy, Clone, Debug, Eq, PartialEq)]
pub struct CleanupEntity;

lazy_static::lazy_static! {
	static ref CLEANUP_ENTITY_ID: ComponentId = unsafe { crate::components::allocate_component_id() };
}

impl Component for CleanupEntity {
	const FLAGS: ComponentFlags = ComponentFlags::SYSTEM_STATE;

	#[inline(always)]
	fn component_id() -> ComponentId {
		*CLEANUP_ENTITY_ID
	}
}
