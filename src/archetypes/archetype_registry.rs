use crate::error::{CapacityError, EcsError, Result};
use crate::archetypes::{Archetype, ArchetypeInstance};
use std::hash::{BuildHasherDefault, Hash};
use crate::data_structures::BitField;
use crate::components::ComponentType;
use nohash_hasher::NoHashHasher;
use std::collections::HashMap;

type Hasher = BuildHasherDefault<NoHashHasher<usize>>;

/// Owns every [archetype](ArchetypeInstance) of a world, along with the cached
/// add/remove transitions between them and the archetype lists of registered queries.
pub(crate) struct ArchetypeStore {
	bf: BitField,
	chunk_size: usize,
	vec: Vec<ArchetypeInstance>,
	map: HashMap<BitField, Archetype>,
	queries: Vec<ArchetypeQuery>,
	transitions: HashMap<ArchetypeTransition, Archetype, Hasher>,
}

/// The archetypes matching an include/exclude pair, extended as archetypes are created.
pub(crate) struct ArchetypeQuery {
	include: BitField,
	exclude: BitField,
	archetypes: Vec<usize>,
}

#[derive(Copy, Clone)]
pub(crate) struct ArchetypeTransition {
	pub archetype: Archetype,
	pub component: ComponentType,
	pub kind: ArchetypeTransitionKind,
}

#[repr(usize)]
#[derive(Copy, Clone, Hash, Eq, PartialEq)]
pub(crate) enum ArchetypeTransitionKind {
	Add = 0,
	Remove = 1,
}

impl ArchetypeStore {
	pub fn new(chunk_size: usize) -> Self {
		let empty = match ArchetypeInstance::new(Archetype::EMPTY, Vec::new(), chunk_size) {
			Ok(empty) => empty,
			Err(error) => panic!("cannot lay out the empty archetype: {error}"),
		};

		Self {
			bf: BitField::new(),
			chunk_size,
			vec: vec![empty],
			map: HashMap::from([(BitField::new(), Archetype::EMPTY)]),
			queries: Vec::new(),
			transitions: HashMap::default(),
		}
	}

	/// Get or create the [archetype](crate::archetypes::Archetype) containing exactly the specified
	/// [components](crate::components::Component). The order of `components` is irrelevant.
	#[inline(never)]
	pub fn create_archetype(&mut self, components: &[ComponentType]) -> Result<Archetype> {
		let bitfield = &mut self.bf;
		bitfield.clear();

		for t in components {
			if bitfield.get(t.id().value()) {
				return Err(EcsError::capacity(t.name(), CapacityError::DuplicateComponent));
			}
			bitfield.set(t.id().value(), true);
		}

		if let Some(archetype) = self.map.get(bitfield) {
			return Ok(*archetype);
		}

		let mut types = components.to_vec();
		types.sort_by_key(|t| t.id());

		let archetype = Archetype { index: self.vec.len() };
		let instance = ArchetypeInstance::new(archetype, types, self.chunk_size)?;

		for query in self.queries.iter_mut() {
			if instance.matches(&query.include, &query.exclude) {
				query.archetypes.push(archetype.index);
			}
		}

		self.map.insert(instance.component_bitfield().clone(), archetype);
		self.vec.push(instance);
		Ok(archetype)
	}

	/// Get the archetype reached by adding or removing a single component.
	/// The caller must check that the component is respectively absent or present.
	pub fn transition(&mut self, transition: ArchetypeTransition) -> Result<Archetype> {
		if let Some(archetype) = self.transitions.get(&transition) {
			return Ok(*archetype);
		}

		let src = &self.vec[transition.archetype.index];
		let id = transition.component.id();
		let components: Vec<ComponentType> = match transition.kind {
			ArchetypeTransitionKind::Add => {
				debug_assert!(!src.has_component(id));
				let mut components = Vec::with_capacity(src.components().len() + 1);
				components.extend_from_slice(src.components());
				components.push(transition.component);
				components
			},
			ArchetypeTransitionKind::Remove => {
				debug_assert!(src.has_component(id));
				src.components().iter().filter(|t| t.id() != id).copied().collect()
			},
		};

		let archetype = self.create_archetype(&components)?;
		self.transitions.insert(transition, archetype);
		Ok(archetype)
	}

	/// Register a query and return its index.
	pub fn add_query(&mut self, include: BitField, exclude: BitField) -> usize {
		let archetypes = self
			.vec
			.iter()
			.enumerate()
			.filter(|(_, a)| a.matches(&include, &exclude))
			.map(|(i, _)| i)
			.collect();

		self.queries.push(ArchetypeQuery { include, exclude, archetypes });
		self.queries.len() - 1
	}

	/// The archetypes currently matching the query.
	#[inline(always)]
	pub fn query(&self, query: usize) -> &[usize] {
		&self.queries[query].archetypes
	}

	#[inline(always)]
	pub fn get(&self, index: usize) -> &ArchetypeInstance {
		&self.vec[index]
	}

	#[inline(always)]
	pub fn get_mut(&mut self, index: usize) -> &mut ArchetypeInstance {
		&mut self.vec[index]
	}

	#[inline(always)]
	pub fn try_get(&self, archetype: Archetype) -> Option<&ArchetypeInstance> {
		self.vec.get(archetype.index)
	}

	pub fn len(&self) -> usize {
		self.vec.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = &ArchetypeInstance> {
		self.vec.iter()
	}
}

impl Eq for ArchetypeTransition {}

impl PartialEq<Self> for ArchetypeTransition {
	fn eq(&self, other: &Self) -> bool {
		(self.component == other.component) & (self.archetype == other.archetype) & (self.kind == other.kind)
	}
}

impl Hash for ArchetypeTransition {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		let kind = self.kind as usize;
		let archetype = self.archetype.index << 33;
		let component = self.component.id().value() << 1;
		state.write_usize(kind | archetype | component);
	}
}
