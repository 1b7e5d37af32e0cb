use crate::archetypes::{Archetype, ArchetypeInstance, ArchetypeStore, ArchetypeTransition, ArchetypeTransitionKind};
use crate::components::{
	BufferElement, CleanupEntity, Component, ComponentFlags, ComponentId, ComponentSet, ComponentType, SharedComponent,
};
use crate::entities::{Column, ComponentGroup, Entity, EntityLocation, EntityTable, GroupBuilder, GroupData, GroupView};
use crate::jobs::{ComponentDependencyManager, JobAccess, JobHandle};
use crate::shared::{SharedComponentStore, DEFAULT_SHARED_INDEX};
use crate::entities::{SharedFilter, VersionGuard};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use crate::error::{EcsError, Result, TypeMismatch};
use crate::chunks::{copy_row, RowCopy};
use crate::data_structures::BitField;
use crate::buffers::DynamicBuffer;
use crate::config::WorldConfig;
use std::mem::MaybeUninit;
use tracing::{debug, trace};
use std::sync::Arc;

static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(1);

/// Owns every entity, archetype, chunk and shared value of a world, and the
/// dependency records of the jobs scheduled against it.
///
/// Structural operations (creating or destroying entities, adding or removing components,
/// changing shared values) first complete every in-flight job. Reading or writing a single
/// component only completes the jobs conflicting with that access.
pub struct EntityStore {
	id: u32,
	config: WorldConfig,
	entities: EntityTable,
	pub(crate) archetype_store: ArchetypeStore,
	shared_store: SharedComponentStore,
	groups: Vec<GroupData>,
	dependencies: ComponentDependencyManager,
	version: Arc<AtomicU64>,
	shared_scratch: Vec<u32>,
}

impl EntityStore {
	pub(crate) fn new(config: WorldConfig) -> Self {
		let config = config.validated();
		let id = NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed);
		debug!(world = id, chunk_size = config.chunk_size, "created world");

		Self {
			id,
			entities: EntityTable::with_capacity(config.initial_entity_capacity),
			archetype_store: ArchetypeStore::new(config.chunk_size),
			shared_store: SharedComponentStore::new(),
			groups: Vec::new(),
			dependencies: ComponentDependencyManager::new(),
			version: Arc::new(AtomicU64::new(0)),
			shared_scratch: Vec::new(),
			config,
		}
	}

	/// Unique identifier of this world within the process.
	pub fn id(&self) -> u32 {
		self.id
	}

	pub fn config(&self) -> &WorldConfig {
		&self.config
	}

	/// Incremented by every structural change. Arrays created under an older version panic when used.
	pub fn structural_version(&self) -> u64 {
		self.version.load(Ordering::Acquire)
	}

	/// Complete every tracked job and invalidate outstanding component arrays.
	/// Snapshot of the structural version, checked by every array of a view.
	pub(crate) fn version_guard(&self) -> VersionGuard {
		VersionGuard::new(self.version.clone())
	}

	pub(crate) fn structural_change(&mut self) {
		self.dependencies.complete_all();
		self.version.fetch_add(1, Ordering::AcqRel);
	}

	#[inline(always)]
	fn locate(&self, entity: Entity) -> Result<EntityLocation> {
		self.entities.location(entity).ok_or(EcsError::stale(entity))
	}

	/// Creates an [`archetype`](Archetype) containing the specified [`components`](Component).
	///
	/// Returns the existing archetype if one with the same set of components already exists.
	pub fn create_archetype(&mut self, components: &[ComponentType]) -> Result<Archetype> {
		self.archetype_store.create_archetype(components)
	}

	/// Creates an [`archetype`](Archetype) from a tuple of [`components`](Component).
	pub fn create_archetype_of<S: ComponentSet>(&mut self) -> Result<Archetype> {
		self.archetype_store.create_archetype(&S::component_types())
	}

	/// The components of `archetype`, sorted by id. `None` if the archetype belongs to another world.
	pub fn archetype_components(&self, archetype: Archetype) -> Option<&[ComponentType]> {
		self.archetype_store.try_get(archetype).map(|a| a.components())
	}

	/// Number of entities stored with `archetype`.
	pub fn archetype_entity_count(&self, archetype: Archetype) -> usize {
		self.archetype_store.try_get(archetype).map_or(0, |a| a.entity_count())
	}

	/// Number of chunks allocated for `archetype`.
	pub fn archetype_chunk_count(&self, archetype: Archetype) -> usize {
		self.archetype_store.try_get(archetype).map_or(0, |a| a.chunks().len())
	}

	pub fn archetype_count(&self) -> usize {
		self.archetype_store.len()
	}

	/// Creates a single [`entity`](Entity) with no [`components`](Component) attached.
	pub fn create_entity(&mut self) -> Entity {
		self.create_entity_from_archetype(Archetype::EMPTY)
	}

	/// Creates a single [`entity`](Entity) belonging to the specified [`archetype`](Archetype),
	/// with every component set to its default value.
	///
	/// # Panics
	/// If `archetype` wasn't created by this world.
	#[inline(never)]
	pub fn create_entity_from_archetype(&mut self, archetype: Archetype) -> Entity {
		let mut entity = [Entity::default()];
		self.create_entities_from_archetype(archetype, &mut entity);
		entity[0]
	}

	/// Creates a series of [`entities`](Entity) belonging to the specified [`archetype`](Archetype).
	/// # Arguments
	/// * `archetype` - The [`archetype`](Archetype) from which to construct the [`entity`](Entity) instances.
	/// * `entities` - The slice in which to output the [`entity`](Entity) instances.
	///
	/// # Panics
	/// If `archetype` wasn't created by this world.
	#[inline(never)]
	pub fn create_entities_from_archetype(&mut self, archetype: Archetype, entities: &mut [Entity]) {
		self.structural_change();

		let instance = self.archetype_store.get_mut(archetype.index);
		self.shared_scratch.clear();
		self.shared_scratch.resize(instance.shared_components().len(), DEFAULT_SHARED_INDEX);

		let mut written = 0;
		while written < entities.len() {
			let (chunk, _) = instance.get_or_allocate_chunk(&self.shared_scratch);
			let free = instance.chunk(chunk).capacity() - instance.chunk(chunk).count();
			let count = free.min(entities.len() - written);

			for out in &mut entities[written..written + count] {
				let location = EntityLocation { archetype: archetype.index as u32, chunk: chunk as u32, slot: 0 };
				let entity = self.entities.allocate(location);
				let slot = instance.append_entity(chunk, entity, true);
				self.entities.set_chunk_slot(entity.index, chunk as u32, slot as u32);
				*out = entity;
			}
			written += count;
		}
	}

	/// Check whether `entity` refers to a live entity.
	/// Destroyed entities still holding system state components exist until those are removed.
	#[inline(always)]
	pub fn exists(&self, entity: Entity) -> bool {
		self.entities.is_alive(entity)
	}

	/// Number of live entities.
	pub fn entity_count(&self) -> usize {
		self.entities.alive_count()
	}

	/// Destroys `entity`.
	///
	/// If the entity holds [system state components](crate::components::SystemStateComponent), every
	/// other component is removed and the entity is kept alive, tagged with [CleanupEntity],
	/// until the system state components are removed as well.
	pub fn destroy_entity(&mut self, entity: Entity) -> Result<()> {
		let location = self.locate(entity)?;
		self.structural_change();
		self.destroy_located(entity, location)
	}

	/// Destroys the provided [`entities`](Entity).
	///
	/// Nothing is destroyed if any of them is stale or listed twice.
	#[inline(never)]
	pub fn destroy_entities(&mut self, entities: &[Entity]) -> Result<()> {
		let mut seen = BitField::new();
		for entity in entities {
			if !self.exists(*entity) || seen.get(entity.index as usize) {
				return Err(EcsError::stale(*entity));
			}
			seen.set(entity.index as usize, true);
		}

		self.structural_change();
		for entity in entities {
			let location = self.locate(*entity)?;
			self.destroy_located(*entity, location)?;
		}
		Ok(())
	}

	fn destroy_located(&mut self, entity: Entity, location: EntityLocation) -> Result<()> {
		let instance = self.archetype_store.get(location.archetype as usize);
		if instance.has_system_state() {
			let cleanup = ComponentType::of::<CleanupEntity>();
			let mut lingering: Vec<ComponentType> =
				instance.components().iter().filter(|t| t.is_system_state() && **t != cleanup).copied().collect();
			lingering.push(cleanup);

			let target = self.archetype_store.create_archetype(&lingering)?;
			if target.index != location.archetype as usize {
				let shared = self.shared_for(location, target.index, None);
				self.move_entity(entity, location, target.index, &shared);
			}
			return Ok(());
		}

		unsafe {
			self.archetype_store
				.get_mut(location.archetype as usize)
				.dispose_entity(location.chunk as usize, location.slot as usize);
		}
		self.remove_row(location);
		self.entities.free(entity);
		Ok(())
	}

	/// Creates a copy of `entity`, deep-copying its buffers. System state components are not copied.
	pub fn instantiate(&mut self, entity: Entity) -> Result<Entity> {
		let mut clone = [Entity::default()];
		self.instantiate_many(entity, &mut clone)?;
		Ok(clone[0])
	}

	/// Creates `clones.len()` copies of `entity`.
	#[inline(never)]
	pub fn instantiate_many(&mut self, entity: Entity, clones: &mut [Entity]) -> Result<()> {
		let location = self.locate(entity)?;
		self.structural_change();

		let src = self.archetype_store.get(location.archetype as usize);
		let target = match src.has_system_state() {
			true => {
				let types: Vec<ComponentType> =
					src.components().iter().filter(|t| !t.is_system_state()).copied().collect();
				self.archetype_store.create_archetype(&types)?.index
			},
			false => location.archetype as usize,
		};
		let shared = self.shared_for(location, target, None);

		for out in clones.iter_mut() {
			let (chunk, created) = self.archetype_store.get_mut(target).get_or_allocate_chunk(&shared);
			if created {
				shared.iter().for_each(|i| self.shared_store.add_reference(*i));
			}

			let clone = self.entities.allocate(EntityLocation { archetype: target as u32, chunk: chunk as u32, slot: 0 });
			let slot = self.archetype_store.get_mut(target).append_entity(chunk, clone, false);
			self.entities.set_chunk_slot(clone.index, chunk as u32, slot as u32);

			let src = self.archetype_store.get(location.archetype as usize);
			let dst = self.archetype_store.get(target);
			unsafe {
				copy_row(
					src.chunk(location.chunk as usize),
					src.layout(),
					location.slot as usize,
					dst.chunk(chunk),
					dst.layout(),
					slot,
					RowCopy::Clone,
				);
			}
			*out = clone;
		}
		Ok(())
	}

	/// The [archetype](Archetype) currently storing `entity`.
	pub fn archetype_of(&self, entity: Entity) -> Result<Archetype> {
		let location = self.locate(entity)?;
		Ok(Archetype { index: location.archetype as usize })
	}

	/// The [component types](ComponentType) of `entity`, sorted by id.
	pub fn component_types(&self, entity: Entity) -> Result<Vec<ComponentType>> {
		let location = self.locate(entity)?;
		Ok(self.archetype_store.get(location.archetype as usize).components().to_vec())
	}

	pub fn has_component<T: Component>(&self, entity: Entity) -> Result<bool> {
		let location = self.locate(entity)?;
		Ok(self.archetype_store.get(location.archetype as usize).has_component(T::component_id()))
	}

	/// Adds a [`component`](Component) of type `T` to `entity`.
	pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<()> {
		data_kind::<T>()?;
		self.add_component_type(entity, ComponentType::of::<T>())?;
		*self.component_mut::<T>(entity)? = value;
		Ok(())
	}

	/// Adds a component of the given type to `entity`, initialized to its default value.
	pub fn add_component_type(&mut self, entity: Entity, component: ComponentType) -> Result<()> {
		let location = self.locate(entity)?;
		let src = self.archetype_store.get(location.archetype as usize);
		if src.has_component(component.id()) {
			return Err(EcsError::mismatch(component.name(), TypeMismatch::AlreadyPresent(entity)));
		}

		self.structural_change();
		let target = self.archetype_store.transition(ArchetypeTransition {
			archetype: Archetype { index: location.archetype as usize },
			component,
			kind: ArchetypeTransitionKind::Add,
		})?;

		let shared = self.shared_for(location, target.index, None);
		self.move_entity(entity, location, target.index, &shared);
		Ok(())
	}

	/// Removes the [`component`](Component) of type `T` from `entity`.
	pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<()> {
		self.remove_component_type(entity, ComponentType::of::<T>())
	}

	/// Removes a component from `entity`. Removing a buffer frees its heap storage.
	///
	/// Removing the last system state component of a destroyed entity completes its destruction.
	pub fn remove_component_type(&mut self, entity: Entity, component: ComponentType) -> Result<()> {
		let location = self.locate(entity)?;
		let src = self.archetype_store.get(location.archetype as usize);
		if !src.has_component(component.id()) {
			return Err(EcsError::mismatch(component.name(), TypeMismatch::Missing(entity)));
		}

		self.structural_change();
		let target = self.archetype_store.transition(ArchetypeTransition {
			archetype: Archetype { index: location.archetype as usize },
			component,
			kind: ArchetypeTransitionKind::Remove,
		})?;

		let shared = self.shared_for(location, target.index, None);
		let location = self.move_entity(entity, location, target.index, &shared);

		if is_cleanup_only(self.archetype_store.get(target.index)) {
			self.remove_row(location);
			self.entities.free(entity);
		}
		Ok(())
	}

	/// Gets a reference to the [`component`](Component) of type `T` bound to `entity`.
	///
	/// Waits for any job writing `T`.
	pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T> {
		data_kind::<T>()?;
		let location = self.locate(entity)?;
		self.dependencies.complete_read_dependency(T::component_id());
		let ptr = self.component_ptr(entity, location, T::component_id(), std::any::type_name::<T>())?;
		Ok(unsafe { &*(ptr as *const T) })
	}

	/// Gets a mutable reference to the [`component`](Component) of type `T` bound to `entity`.
	///
	/// Waits for any job reading or writing `T`.
	pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
		data_kind::<T>()?;
		self.component_mut::<T>(entity)
	}

	/// Overwrites the [`component`](Component) of type `T` bound to `entity`.
	pub fn set_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<()> {
		*self.get_component_mut::<T>(entity)? = value;
		Ok(())
	}

	fn component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
		let location = self.locate(entity)?;
		self.dependencies.complete_write_dependency(T::component_id());
		let ptr = self.component_ptr(entity, location, T::component_id(), std::any::type_name::<T>())?;
		Ok(unsafe { &mut *(ptr as *mut T) })
	}

	fn component_ptr(&self, entity: Entity, location: EntityLocation, id: ComponentId, name: &'static str) -> Result<*mut u8> {
		let instance = self.archetype_store.get(location.archetype as usize);
		let stream = instance
			.layout()
			.stream(id)
			.ok_or(EcsError::mismatch(name, TypeMismatch::Missing(entity)))?;
		Ok(instance.chunk(location.chunk as usize).component_ptr(stream, location.slot as usize))
	}

	/// Overwrite a component with raw bytes recorded by a command buffer.
	pub(crate) fn write_component_bytes(
		&mut self, entity: Entity, component: &ComponentType, bytes: &[MaybeUninit<u8>],
	) -> Result<()> {
		let location = self.locate(entity)?;
		self.dependencies.complete_write_dependency(component.id());
		let ptr = self.component_ptr(entity, location, component.id(), component.name())?;
		debug_assert_eq!(bytes.len(), component.size());
		unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const u8, ptr, component.size()) }
		Ok(())
	}

	/// Adds the [shared component](SharedComponent) `value` to `entity`.
	pub fn add_shared_component<T: SharedComponent>(&mut self, entity: Entity, value: T) -> Result<()> {
		let location = self.locate(entity)?;
		let src = self.archetype_store.get(location.archetype as usize);
		if src.has_component(T::component_id()) {
			return Err(EcsError::mismatch(std::any::type_name::<T>(), TypeMismatch::AlreadyPresent(entity)));
		}

		self.structural_change();
		let target = self.archetype_store.transition(ArchetypeTransition {
			archetype: Archetype { index: location.archetype as usize },
			component: ComponentType::of::<T>(),
			kind: ArchetypeTransitionKind::Add,
		})?;

		let index = self.shared_store.get_or_add(value);
		let shared = self.shared_for(location, target.index, Some((T::component_id(), index)));
		self.move_entity(entity, location, target.index, &shared);
		self.shared_store.release(index);
		Ok(())
	}

	/// Changes the shared value of `entity`, moving it to a chunk storing the new value.
	pub fn set_shared_component<T: SharedComponent>(&mut self, entity: Entity, value: T) -> Result<()> {
		let location = self.locate(entity)?;
		let instance = self.archetype_store.get(location.archetype as usize);
		let position = instance
			.shared_position(T::component_id())
			.ok_or(EcsError::mismatch(std::any::type_name::<T>(), TypeMismatch::Missing(entity)))?;

		let current = instance.chunk(location.chunk as usize).shared_indices()[position];
		if self.shared_store.find(&value) == Some(current) {
			return Ok(());
		}

		self.structural_change();
		let index = self.shared_store.get_or_add(value);
		let archetype = location.archetype as usize;
		let shared = self.shared_for(location, archetype, Some((T::component_id(), index)));
		self.move_entity(entity, location, archetype, &shared);
		self.shared_store.release(index);
		Ok(())
	}

	/// Gets the shared value of type `T` of `entity`.
	pub fn get_shared_component<T: SharedComponent>(&self, entity: Entity) -> Result<T> {
		let location = self.locate(entity)?;
		let instance = self.archetype_store.get(location.archetype as usize);
		let name = std::any::type_name::<T>();
		let position = instance
			.shared_position(T::component_id())
			.ok_or(EcsError::mismatch(name, TypeMismatch::Missing(entity)))?;

		let index = instance.chunk(location.chunk as usize).shared_indices()[position];
		self.shared_store.get::<T>(index).ok_or(EcsError::mismatch(name, TypeMismatch::NotShared))
	}

	/// Every distinct value of `T` in use, starting with the default value.
	pub fn get_all_unique_shared_components<T: SharedComponent>(&self) -> Vec<T> {
		self.shared_store.all_unique_values::<T>()
	}

	pub fn shared_components(&self) -> &SharedComponentStore {
		&self.shared_store
	}

	/// Adds an empty dynamic buffer of `T` to `entity` and returns it.
	pub fn add_buffer<T: BufferElement>(&mut self, entity: Entity) -> Result<DynamicBuffer<'_, T>> {
		self.add_component_type(entity, ComponentType::of::<T>())?;
		self.get_buffer::<T>(entity)
	}

	/// Gets the dynamic buffer of `T` bound to `entity`.
	///
	/// Waits for any job reading or writing `T`.
	pub fn get_buffer<T: BufferElement>(&mut self, entity: Entity) -> Result<DynamicBuffer<'_, T>> {
		let name = std::any::type_name::<T>();
		if !T::FLAGS.contains(ComponentFlags::BUFFER) {
			return Err(EcsError::mismatch(name, TypeMismatch::NotBuffer));
		}

		let location = self.locate(entity)?;
		self.dependencies.complete_write_dependency(T::component_id());

		let instance = self.archetype_store.get(location.archetype as usize);
		let stream = instance
			.layout()
			.stream(T::component_id())
			.ok_or(EcsError::mismatch(name, TypeMismatch::Missing(entity)))?;
		let ptr = instance.chunk(location.chunk as usize).component_ptr(stream, location.slot as usize);
		Ok(unsafe { DynamicBuffer::from_raw(ptr, &stream.component, false) })
	}

	/// Registers a [ComponentGroup] matching every archetype that contains the required components
	/// of `builder` and none of its excluded ones.
	pub fn get_component_group(&mut self, builder: GroupBuilder) -> ComponentGroup {
		let query = self
			.archetype_store
			.add_query(GroupData::include_mask(&builder), GroupData::exclude_mask(&builder));
		let data = GroupData::new(builder, query);
		debug!(
			group = self.groups.len(),
			required = ?data.required().iter().map(|(c, m)| (c.name(), *m)).collect::<Vec<_>>(),
			excluded = ?data.excluded().iter().map(|c| c.name()).collect::<Vec<_>>(),
			archetypes = self.archetype_store.query(query).len(),
			"registered component group"
		);

		self.groups.push(data);
		ComponentGroup { world: self.id, index: self.groups.len() - 1 }
	}

	fn group(&self, group: ComponentGroup) -> &GroupData {
		assert_eq!(group.world, self.id, "component group belongs to a different world");
		&self.groups[group.index]
	}

	/// The access declared by `group`.
	pub fn group_access(&self, group: ComponentGroup) -> &JobAccess {
		self.group(group).access()
	}

	/// Restrict `group` to the entities whose shared component `T` equals `value`.
	///
	/// Views created afterwards only span the chunks storing that value.
	pub fn set_filter<T: SharedComponent>(&mut self, group: ComponentGroup, value: T) -> Result<()> {
		let data = self.group(group);
		if data.mode(T::component_id()).is_none() {
			return Err(EcsError::mismatch(std::any::type_name::<T>(), TypeMismatch::NotInGroup));
		}

		self.groups[group.index].set_filter(Some(SharedFilter::new(value)));
		Ok(())
	}

	pub fn reset_filter(&mut self, group: ComponentGroup) {
		self.group(group);
		self.groups[group.index].set_filter(None);
	}

	/// Number of entities currently matched by `group`, filter included.
	pub fn calculate_length(&self, group: ComponentGroup) -> usize {
		self.matching_chunks(group)
			.into_iter()
			.map(|(a, c)| self.archetype_store.get(a).chunk(c).count())
			.sum()
	}

	fn matching_chunks(&self, group: ComponentGroup) -> Vec<(usize, usize)> {
		let data = self.group(group);
		let filter = data.filter().map(|f| (f.component(), f.resolve(&self.shared_store)));

		let mut chunks = Vec::new();
		for &archetype in self.archetype_store.query(data.query()) {
			let instance = self.archetype_store.get(archetype);
			match filter {
				None => chunks.extend((0..instance.chunks().len()).map(|c| (archetype, c))),
				Some((_, None)) => {},
				Some((component, Some(index))) => {
					if let Some(position) = instance.shared_position(component) {
						chunks.extend(
							instance
								.chunks()
								.iter()
								.enumerate()
								.filter(|(_, c)| c.shared_indices()[position] == index)
								.map(|(c, _)| (archetype, c)),
						);
					}
				},
			}
		}
		chunks
	}

	fn build_view(&self, group: ComponentGroup) -> GroupView<'static> {
		let chunks = self.matching_chunks(group);
		let data = self.group(group);

		let mut starts = Vec::with_capacity(chunks.len() + 1);
		let mut entities = Vec::with_capacity(chunks.len());
		let mut columns: Vec<Column> =
			data.required().iter().map(|(c, m)| Column::new(*c, *m, chunks.len())).collect();

		starts.push(0);
		for (archetype, chunk) in chunks {
			let instance = self.archetype_store.get(archetype);
			let chunk = instance.chunk(chunk);
			starts.push(starts[starts.len() - 1] + chunk.count());
			entities.push(chunk.base());

			for column in columns.iter_mut() {
				let id = column.component().id();
				match column.component().is_shared() {
					true => {
						let index = instance.shared_position(id).map(|p| chunk.shared_indices()[p]);
						column.push_shared(index.and_then(|i| self.shared_store.get_erased(i)));
					},
					false => {
						if let Some(stream) = instance.layout().stream(id) {
							column.push_stream(chunk.stream_ptr(stream));
						}
					},
				}
			}
		}

		GroupView::new(starts, entities, columns, self.version_guard())
	}

	/// Index-aligned arrays over every entity matched by `group`.
	///
	/// Waits for the jobs conflicting with the group's declared access.
	pub fn group_view(&mut self, group: ComponentGroup) -> GroupView<'_> {
		let access = self.group(group).access();
		for id in access.writes() {
			self.dependencies.complete_write_dependency(*id);
		}
		for id in access.reads() {
			self.dependencies.complete_read_dependency(*id);
		}
		self.build_view(group)
	}

	/// Run `job` on the thread pool over a view of `group`. The view is lent to the job and
	/// cannot outlive it.
	///
	/// The job starts once `dependency` and every tracked job conflicting with the group's access have
	/// completed. The returned handle is recorded as a reader or writer of every type in the group.
	pub fn schedule<F>(&mut self, group: ComponentGroup, dependency: JobHandle, job: F) -> JobHandle
	where
		F: FnOnce(&GroupView<'_>) + Send + 'static,
	{
		let access = self.group(group).access().clone();
		self.schedule_with_access(&access, group, dependency, job)
	}

	/// Like [schedule](Self::schedule), declaring `access` on top of the group's own access.
	pub fn schedule_with_access<F>(
		&mut self, access: &JobAccess, group: ComponentGroup, dependency: JobHandle, job: F,
	) -> JobHandle
	where
		F: FnOnce(&GroupView<'_>) + Send + 'static,
	{
		let mut access = access.clone();
		access.merge(self.group(group).access());

		let view = self.build_view(group);
		let entities = view.len();
		let handle = self.schedule_job(&access, dependency, move || job(&view));
		trace!(job = handle.id(), group = group.index, entities, "scheduled group job");
		handle
	}

	/// Run `job` on the thread pool, ordered against the tracked jobs by `access`.
	pub fn schedule_job<F>(&mut self, access: &JobAccess, dependency: JobHandle, job: F) -> JobHandle
	where
		F: FnOnce() + Send + 'static,
	{
		let mut wait = self.dependencies.wait_set(access);
		wait.push(dependency);
		let handle = JobHandle::schedule(&JobHandle::combine(&wait), job);
		self.dependencies.add_dependency(access, &handle);
		handle
	}

	pub fn dependencies(&self) -> &ComponentDependencyManager {
		&self.dependencies
	}

	pub fn dependencies_mut(&mut self) -> &mut ComponentDependencyManager {
		&mut self.dependencies
	}

	/// Block until every tracked job has completed.
	pub fn complete_all_jobs(&mut self) {
		self.dependencies.complete_all();
	}

	/// The shared indices the entity at `from` needs once stored with `target`.
	fn shared_for(&self, from: EntityLocation, target: usize, replace: Option<(ComponentId, u32)>) -> Vec<u32> {
		let src = self.archetype_store.get(from.archetype as usize);
		let src_shared = src.chunk(from.chunk as usize).shared_indices();
		self.archetype_store
			.get(target)
			.shared_components()
			.iter()
			.map(|t| match replace {
				Some((id, index)) if id == t.id() => index,
				_ => src.shared_position(t.id()).map_or(DEFAULT_SHARED_INDEX, |p| src_shared[p]),
			})
			.collect()
	}

	/// Move the row of `entity` into a chunk of `target` storing `shared`, and return its new location.
	fn move_entity(&mut self, entity: Entity, from: EntityLocation, target: usize, shared: &[u32]) -> EntityLocation {
		let (chunk, created) = self.archetype_store.get_mut(target).get_or_allocate_chunk(shared);
		if created {
			shared.iter().for_each(|i| self.shared_store.add_reference(*i));
		}
		let slot = self.archetype_store.get_mut(target).append_entity(chunk, entity, false);

		let src = self.archetype_store.get(from.archetype as usize);
		let dst = self.archetype_store.get(target);
		unsafe {
			copy_row(
				src.chunk(from.chunk as usize),
				src.layout(),
				from.slot as usize,
				dst.chunk(chunk),
				dst.layout(),
				slot,
				RowCopy::Move,
			);
		}

		let to = EntityLocation { archetype: target as u32, chunk: chunk as u32, slot: slot as u32 };
		self.entities.set_location(entity.index, to);
		self.remove_row(from);

		match self.entities.location(entity) {
			Some(location) => location,
			None => unreachable!("moved entity must stay alive"),
		}
	}

	/// Swap-remove the row at `location` and release its chunk if it became empty.
	fn remove_row(&mut self, location: EntityLocation) {
		let archetype = location.archetype as usize;
		let chunk = location.chunk as usize;

		let instance = self.archetype_store.get_mut(archetype);
		if let Some(moved) = unsafe { instance.remove_entity(chunk, location.slot as usize) } {
			self.entities.set_chunk_slot(moved.index, location.chunk, location.slot);
		}

		if let Some(released) = instance.release_chunk_if_empty(chunk) {
			released.shared.iter().for_each(|i| self.shared_store.release(*i));
			if let Some(position) = released.relocated {
				let instance = self.archetype_store.get(archetype);
				for (slot, entity) in instance.chunk(position).entities().iter().enumerate() {
					self.entities.set_chunk_slot(entity.index, position as u32, slot as u32);
				}
			}
		}
	}
}

impl Drop for EntityStore {
	fn drop(&mut self) {
		self.structural_change();
	}
}

fn data_kind<T: Component>() -> Result<()> {
	let flags = T::FLAGS;
	match flags.contains(ComponentFlags::SHARED) || flags.contains(ComponentFlags::BUFFER) {
		true => Err(EcsError::mismatch(std::any::type_name::<T>(), TypeMismatch::NotData)),
		false => Ok(()),
	}
}

fn is_cleanup_only(instance: &ArchetypeInstance) -> bool {
	matches!(instance.components(), [only] if only.id() == CleanupEntity::component_id())
}
