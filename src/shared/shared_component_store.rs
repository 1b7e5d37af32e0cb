use std::collections::hash_map::DefaultHasher;
use crate::components::{ComponentId, SharedComponent};
use std::hash::{BuildHasherDefault, Hash, Hasher};
use nohash_hasher::NoHashHasher;
use std::collections::HashMap;
use std::any::Any;
use std::sync::Arc;

type HashLookup = HashMap<u64, Vec<u32>, BuildHasherDefault<NoHashHasher<u64>>>;

/// Index of the reserved slot standing for the default value of every shared component.
/// It is never reference counted nor freed.
pub const DEFAULT_SHARED_INDEX: u32 = 0;

struct SharedSlot {
	component: Option<ComponentId>,
	hash: u64,
	ref_count: u32,
	value: Option<Arc<dyn Any + Send + Sync>>,
}

impl SharedSlot {
	const fn vacant() -> Self {
		Self {
			component: None,
			hash: 0,
			ref_count: 0,
			value: None,
		}
	}
}

/// Content-addressed, reference-counted table of shared component values.
///
/// Identical values (same component type, equal content) map to the same index.
/// References are held by the chunks storing the value; when the last reference is
/// released the slot is freed and may be reused by a different value.
pub struct SharedComponentStore {
	slots: Vec<SharedSlot>,
	free: Vec<u32>,
	lookup: HashLookup,
}

impl Default for SharedComponentStore {
	fn default() -> Self {
		Self::new()
	}
}

impl SharedComponentStore {
	pub fn new() -> Self {
		Self {
			slots: vec![SharedSlot::vacant()],
			free: Vec::new(),
			lookup: HashLookup::default(),
		}
	}

	fn hash_of<T: SharedComponent>(value: &T) -> u64 {
		let mut hasher = DefaultHasher::new();
		T::component_id().hash(&mut hasher);
		value.hash(&mut hasher);
		hasher.finish()
	}

	/// Get the index of `value` without adding a reference.
	/// The default value always maps to [DEFAULT_SHARED_INDEX].
	pub fn find<T: SharedComponent>(&self, value: &T) -> Option<u32> {
		if *value == T::default() {
			return Some(DEFAULT_SHARED_INDEX);
		}

		let hash = Self::hash_of(value);
		let candidates = self.lookup.get(&hash)?;
		candidates.iter().copied().find(|index| {
			let slot = &self.slots[*index as usize];
			slot.component == Some(T::component_id())
				&& slot.value.as_ref().and_then(|v| v.downcast_ref::<T>()) == Some(value)
		})
	}

	/// Get the index of `value`, inserting it if needed, and add one reference to it.
	///
	/// `T::default()` is the exception: it always maps to [DEFAULT_SHARED_INDEX], which is never
	/// reference counted, so [ref_count](Self::ref_count) stays 0 for it however often it is added.
	pub fn get_or_add<T: SharedComponent>(&mut self, value: T) -> u32 {
		if let Some(index) = self.find(&value) {
			self.add_reference(index);
			return index;
		}

		let hash = Self::hash_of(&value);
		let slot = SharedSlot {
			component: Some(T::component_id()),
			hash,
			ref_count: 1,
			value: Some(Arc::new(value)),
		};

		let index = match self.free.pop() {
			Some(index) => {
				self.slots[index as usize] = slot;
				index
			},
			None => {
				self.slots.push(slot);
				(self.slots.len() - 1) as u32
			},
		};

		self.lookup.entry(hash).or_default().push(index);
		index
	}

	pub fn add_reference(&mut self, index: u32) {
		if index == DEFAULT_SHARED_INDEX {
			return;
		}

		let slot = &mut self.slots[index as usize];
		assert!(slot.value.is_some(), "shared value {index} has been released");
		slot.ref_count += 1;
	}

	/// Drop one reference to `index`, freeing the slot when none remain.
	pub fn release(&mut self, index: u32) {
		if index == DEFAULT_SHARED_INDEX {
			return;
		}

		let slot = &mut self.slots[index as usize];
		assert!(slot.ref_count > 0, "shared value {index} has been released");
		slot.ref_count -= 1;
		if slot.ref_count > 0 {
			return;
		}

		let hash = slot.hash;
		*slot = SharedSlot::vacant();
		if let Some(candidates) = self.lookup.get_mut(&hash) {
			candidates.retain(|i| *i != index);
			if candidates.is_empty() {
				self.lookup.remove(&hash);
			}
		}
		self.free.push(index);
	}

	/// Number of chunks referencing `index`. Always 0 for the default slot and for freed slots.
	pub fn ref_count(&self, index: u32) -> u32 {
		self.slots.get(index as usize).map_or(0, |s| s.ref_count)
	}

	/// Get the value stored at `index`, or `None` if the slot is free or holds a different type.
	pub fn get<T: SharedComponent>(&self, index: u32) -> Option<T> {
		if index == DEFAULT_SHARED_INDEX {
			return Some(T::default());
		}

		let slot = self.slots.get(index as usize)?;
		slot.value.as_ref()?.downcast_ref::<T>().copied()
	}

	pub(crate) fn get_erased(&self, index: u32) -> Option<Arc<dyn Any + Send + Sync>> {
		self.slots.get(index as usize)?.value.clone()
	}

	/// Every distinct value of `T` currently stored, starting with the default value.
	pub fn all_unique_values<T: SharedComponent>(&self) -> Vec<T> {
		let id = T::component_id();
		let mut values = vec![T::default()];
		values.extend(
			self.slots
				.iter()
				.filter(|s| s.component == Some(id))
				.filter_map(|s| s.value.as_ref()?.downcast_ref::<T>().copied()),
		);
		values
	}

	/// Number of live, non-default values.
	pub fn len(&self) -> usize {
		self.slots.len() - 1 - self.free.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
