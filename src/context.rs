use crate::systems::{System, SystemStore};
use crate::entities::EntityStore;
use std::ops::{Deref, DerefMut};
use crate::config::WorldConfig;

/// A container for [`entities`](crate::entities::Entity) and systems.
///
/// All [`entities`](crate::entities::Entity) can be referenced using a unique identifier of type
/// [`Entity`](crate::entities::Entity) and can contain an arbitrary selection of
/// [`components`](crate::components::Component) based on their [`archetype`](crate::Archetype).
/// Every operation of [EntityStore] is available through [Deref].
pub struct EcsContext {
	entity_store: EntityStore,
	system_store: SystemStore,
}

impl EcsContext {
	pub fn new() -> Self {
		Self::with_config(WorldConfig::default())
	}

	pub fn with_config(config: WorldConfig) -> Self {
		Self {
			entity_store: EntityStore::new(config),
			system_store: SystemStore::new(),
		}
	}

	/// Add a new [system](System) to the [EcsContext].
	pub fn register_system<T: 'static + System>(&mut self, system: T) {
		self.system_store.add_system(system);
	}

	pub fn system_count(&self) -> usize {
		self.system_store.len()
	}

	/// Type names of the registered [systems](System), in execution order.
	pub fn system_names(&self) -> Vec<&'static str> {
		self.system_store.names().collect()
	}

	/// Run the setup of every [system](System) once, in registration order.
	///
	/// # Panics
	/// If called more than once, or from inside a system's setup.
	pub fn setup_systems(&mut self) {
		self.system_store.setup_systems(&mut self.entity_store);
	}

	/// Execute all [systems](System) in registration order.
	///
	/// # Panics
	/// If [setup_systems](Self::setup_systems) has not been called.
	pub fn run_systems(&mut self) {
		self.system_store.run_systems(&mut self.entity_store);
	}
}

impl Default for EcsContext {
	fn default() -> Self {
		Self::new()
	}
}

impl Deref for EcsContext {
	type Target = EntityStore;

	#[inline(always)]
	fn deref(&self) -> &Self::Target {
		&self.entity_store
	}
}

impl DerefMut for EcsContext {
	#[inline(always)]
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.entity_store
	}
}
