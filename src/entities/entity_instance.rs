use std::iter::repeat;
use std::fmt;

/// Set in the version of placeholder entities; the remaining bits identify the recorder.
const PLACEHOLDER_BIT: u32 = 1 << 31;

/// A unique handle to an `Entity`.
///
/// Live entities always carry a version in `1..2^31`; destroying an entity increments the
/// version stored for its index, so older handles stop resolving.
#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Entity {
	pub(crate) index: u32,
	pub(crate) version: u32,
}

impl Entity {
	#[inline(always)]
	pub const fn index(&self) -> u32 {
		self.index
	}

	#[inline(always)]
	pub const fn version(&self) -> u32 {
		self.version
	}

	/// The `ordinal`-th entity created by the command recorder tagged `tag`, which doesn't
	/// exist until playback.
	pub(crate) const fn placeholder(tag: u32, ordinal: u32) -> Self {
		Self { index: ordinal, version: PLACEHOLDER_BIT | (tag & !PLACEHOLDER_BIT) }
	}

	#[inline(always)]
	pub const fn is_placeholder(&self) -> bool {
		self.version & PLACEHOLDER_BIT != 0
	}

	/// The tag of the recorder that created a placeholder.
	#[inline(always)]
	pub(crate) const fn placeholder_tag(&self) -> u32 {
		self.version & !PLACEHOLDER_BIT
	}
}

impl fmt::Display for Entity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.is_placeholder() {
			true => write!(f, "deferred entity #{} of recorder {}", self.index, self.placeholder_tag()),
			false => write!(f, "entity {}v{}", self.index, self.version),
		}
	}
}

/// Where the data of a live entity is stored.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct EntityLocation {
	pub archetype: u32,
	pub chunk: u32,
	pub slot: u32,
}

/// Maps entity indices to their version and storage location.
#[derive(Default)]
pub(crate) struct EntityTable {
	alive: Vec<bool>,
	versions: Vec<u32>,
	archetypes: Vec<u32>,
	chunks: Vec<u32>,
	slots: Vec<u32>,
	free: Vec<u32>,
}

impl EntityTable {
	pub fn with_capacity(capacity: usize) -> Self {
		let mut table = Self::default();
		table.reserve(capacity);
		table
	}

	/// Reserve `count` free indices, handed out in ascending order.
	pub fn reserve(&mut self, count: usize) {
		let start = self.versions.len();
		self.alive.extend(repeat(false).take(count));
		self.versions.extend(repeat(1).take(count));
		self.archetypes.extend(repeat(0).take(count));
		self.chunks.extend(repeat(0).take(count));
		self.slots.extend(repeat(0).take(count));
		self.free.extend((start..start + count).rev().map(|i| i as u32));
	}

	/// Take a free index and mark it alive.
	pub fn allocate(&mut self, location: EntityLocation) -> Entity {
		if self.free.is_empty() {
			let grow = usize::max(16, self.versions.len());
			self.reserve(grow);
		}

		let index = match self.free.pop() {
			Some(index) => index,
			None => unreachable!(),
		};
		let i = index as usize;
		self.alive[i] = true;
		self.set_location(index, location);
		Entity { index, version: self.versions[i] }
	}

	/// Free the index of `entity`, invalidating every outstanding handle to it.
	pub fn free(&mut self, entity: Entity) {
		let i = entity.index as usize;
		debug_assert!(self.is_alive(entity));
		self.alive[i] = false;
		self.versions[i] = match self.versions[i] + 1 {
			PLACEHOLDER_BIT => 1,
			version => version,
		};
		self.free.push(entity.index);
	}

	#[inline(always)]
	pub fn is_alive(&self, entity: Entity) -> bool {
		let i = entity.index as usize;
		!entity.is_placeholder() && i < self.versions.len() && self.alive[i] && self.versions[i] == entity.version
	}

	#[inline(always)]
	pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
		match self.is_alive(entity) {
			true => {
				let i = entity.index as usize;
				Some(EntityLocation {
					archetype: self.archetypes[i],
					chunk: self.chunks[i],
					slot: self.slots[i],
				})
			},
			false => None,
		}
	}

	#[inline(always)]
	pub fn set_location(&mut self, index: u32, location: EntityLocation) {
		let i = index as usize;
		self.archetypes[i] = location.archetype;
		self.chunks[i] = location.chunk;
		self.slots[i] = location.slot;
	}

	#[inline(always)]
	pub fn set_chunk_slot(&mut self, index: u32, chunk: u32, slot: u32) {
		let i = index as usize;
		self.chunks[i] = chunk;
		self.slots[i] = slot;
	}

	/// Number of live entities, including destroyed entities awaiting cleanup.
	pub fn alive_count(&self) -> usize {
		self.alive.iter().filter(|a| **a).count()
	}
}
