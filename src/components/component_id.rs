//! Process-wide identifiers of [Component] types.
//!
//! Ids are handed out on first use of a type and are not stable between program runs.
//! They order the component streams of a chunk and index the
//! [bitfields](crate::data_structures::BitField) used to match archetypes against
//! [component groups](crate::entities::ComponentGroup). Id 0 is never allocated.

use std::sync::atomic::{AtomicU32, Ordering};
use crate::components::Component;
use std::fmt;

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies a type implementing [Component] for the lifetime of the process.
#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Debug)]
pub struct ComponentId(u32);

impl ComponentId {
	#[inline(always)]
	pub fn of<T: Component>() -> ComponentId {
		T::component_id()
	}

	/// Bit index of the component in archetype and group masks.
	#[inline(always)]
	pub(crate) const fn value(&self) -> usize {
		self.0 as usize
	}
}

impl fmt::Display for ComponentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Allocates the id of a newly seen component type. Called by `#[derive(Component)]`.
///
/// # Safety
/// Must be called exactly once per component type; the result is cached by the caller.
#[doc(hidden)]
pub unsafe fn allocate_component_id() -> ComponentId {
	let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
	assert_ne!(id, u32::MAX, "component id space exhausted");
	ComponentId(id)
}
