use crate::components::{ComponentId, ComponentType};
use crate::chunks::{Chunk, ChunkLayout};
use crate::data_structures::BitField;
use crate::entities::Entity;
use crate::error::Result;
use tracing::debug;

/// A handle to a set of [component types](ComponentType) shared by one or more entities.
#[derive(Default, Eq, PartialEq, Copy, Clone, Debug, Hash)]
pub struct Archetype {
	pub(crate) index: usize,
}

impl Archetype {
	/// The archetype without any component.
	pub const EMPTY: Archetype = Archetype { index: 0 };
}

/// A chunk that was released because it became empty.
pub(crate) struct ReleasedChunk {
	pub shared: Box<[u32]>,
	/// Set when the archetype's last chunk took the released chunk's position.
	pub relocated: Option<usize>,
}

/// The storage of every entity of an [Archetype].
pub(crate) struct ArchetypeInstance {
	id: Archetype,
	components: BitField,
	types: Vec<ComponentType>,
	shared: Vec<ComponentType>,
	layout: ChunkLayout,
	chunks: Vec<Chunk>,
	entity_count: usize,
	lingering: bool,
}

impl ArchetypeInstance {
	/// `types` must be sorted by id and free of duplicates.
	pub(crate) fn new(id: Archetype, types: Vec<ComponentType>, chunk_size: usize) -> Result<Self> {
		let layout = ChunkLayout::new(&types, chunk_size)?;
		let shared = types.iter().filter(|t| t.is_shared()).copied().collect();
		let lingering = types.iter().any(|t| t.is_system_state());
		debug!(
			archetype = id.index,
			components = ?types.iter().map(|t| t.name()).collect::<Vec<_>>(),
			capacity = layout.capacity(),
			"created archetype"
		);

		Ok(Self {
			id,
			components: BitField::from(types.as_slice()),
			types,
			shared,
			layout,
			chunks: Vec::new(),
			entity_count: 0,
			lingering,
		})
	}

	#[inline(always)]
	pub fn id(&self) -> Archetype {
		self.id
	}

	#[inline(always)]
	pub fn component_bitfield(&self) -> &BitField {
		&self.components
	}

	#[inline(always)]
	pub fn components(&self) -> &[ComponentType] {
		&self.types
	}

	#[inline(always)]
	pub fn shared_components(&self) -> &[ComponentType] {
		&self.shared
	}

	#[inline(always)]
	pub fn has_component(&self, id: ComponentId) -> bool {
		self.components.get(id.value())
	}

	/// `true` if entities of this archetype outlive their destruction.
	#[inline(always)]
	pub fn has_system_state(&self) -> bool {
		self.lingering
	}

	#[inline(always)]
	pub fn layout(&self) -> &ChunkLayout {
		&self.layout
	}

	#[inline(always)]
	pub fn chunks(&self) -> &[Chunk] {
		&self.chunks
	}

	#[inline(always)]
	pub fn chunk(&self, index: usize) -> &Chunk {
		&self.chunks[index]
	}

	#[inline(always)]
	pub fn entity_count(&self) -> usize {
		self.entity_count
	}

	/// Position of the shared component `id` inside each chunk's shared-index list.
	pub fn shared_position(&self, id: ComponentId) -> Option<usize> {
		self.shared.binary_search_by_key(&id, |t| t.id()).ok()
	}

	pub fn matches(&self, include: &BitField, exclude: &BitField) -> bool {
		include.is_subset_of(&self.components) && !exclude.intersects(&self.components)
	}

	/// Find a chunk with free space and the requested shared values, searching from the most recent.
	pub fn find_chunk_with_capacity(&self, shared: &[u32]) -> Option<usize> {
		self.chunks.iter().rposition(|c| !c.is_full() && c.shared_indices() == shared)
	}

	/// Allocate an empty chunk. The caller owns the shared-value references of `shared`.
	pub fn allocate_chunk(&mut self, shared: &[u32]) -> usize {
		debug_assert_eq!(shared.len(), self.shared.len());
		self.chunks.push(Chunk::allocate(&self.layout, shared.into()));
		debug!(
			archetype = self.id.index,
			chunk = self.chunks.len() - 1,
			capacity = self.layout.capacity(),
			"allocated chunk"
		);
		self.chunks.len() - 1
	}

	/// Returns the chunk index and whether it was freshly allocated.
	pub fn get_or_allocate_chunk(&mut self, shared: &[u32]) -> (usize, bool) {
		match self.find_chunk_with_capacity(shared) {
			Some(chunk) => (chunk, false),
			None => (self.allocate_chunk(shared), true),
		}
	}

	pub fn append_entity(&mut self, chunk: usize, entity: Entity, init: bool) -> usize {
		let slot = self.chunks[chunk].append(&self.layout, entity, init);
		self.entity_count += 1;
		slot
	}

	/// Swap-remove the row at `slot`; components are not disposed.
	/// Returns the entity that now occupies `slot`, if any.
	///
	/// # Safety
	/// `slot` must hold a live row of `chunk`.
	pub unsafe fn remove_entity(&mut self, chunk: usize, slot: usize) -> Option<Entity> {
		self.entity_count -= 1;
		self.chunks[chunk].swap_remove(&self.layout, slot)
	}

	/// Dispose the components of the row at `slot`.
	///
	/// # Safety
	/// `slot` must hold a live row of `chunk`.
	pub unsafe fn dispose_entity(&mut self, chunk: usize, slot: usize) {
		self.chunks[chunk].dispose_row(&self.layout, slot)
	}

	/// Free `chunk` if it holds no entity.
	pub fn release_chunk_if_empty(&mut self, chunk: usize) -> Option<ReleasedChunk> {
		if !self.chunks[chunk].is_empty() {
			return None;
		}

		let mut released = self.chunks.swap_remove(chunk);
		let shared = released.take_shared();
		debug!(archetype = self.id.index, chunk, "released chunk");
		Some(ReleasedChunk {
			shared,
			relocated: (chunk < self.chunks.len()).then_some(chunk),
		})
	}
}

impl Drop for ArchetypeInstance {
	fn drop(&mut self) {
		for chunk in self.chunks.iter_mut() {
			unsafe { chunk.dispose_all(&self.layout) }
		}
	}
}
