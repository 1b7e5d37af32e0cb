use crate::entities::EntityStore;
use crate::systems::System;
use std::any::{type_name, TypeId};
use tracing::{debug, debug_span};

struct SystemEntry {
	type_id: TypeId,
	name: &'static str,
	system: Box<dyn System>,
}

/// Registration, setup and execution of the systems of a context, in registration order.
pub(crate) struct SystemStore {
	phase: Phase,
	entries: Vec<SystemEntry>,
}

#[derive(Copy, Clone, Default, Eq, PartialEq, Debug)]
enum Phase {
	#[default]
	Registering,
	SettingUp,
	Ready,
}

impl SystemStore {
	pub fn new() -> Self {
		Self { phase: Phase::default(), entries: Vec::new() }
	}

	pub fn add_system<T: 'static + System>(&mut self, system: T) {
		assert!(
			self.phase == Phase::Registering,
			"cannot register systems once setup has started ({:?})",
			self.phase
		);

		let type_id = TypeId::of::<T>();
		let name = type_name::<T>();
		assert!(
			self.entries.iter().all(|e| e.type_id != type_id),
			"system {name} was already registered"
		);

		debug!(system = name, index = self.entries.len(), "registered system");
		self.entries.push(SystemEntry { type_id, name, system: Box::new(system) });
	}

	pub fn setup_systems(&mut self, world: &mut EntityStore) {
		match self.phase {
			Phase::Registering => {},
			Phase::SettingUp => panic!("recursive call to setup_systems"),
			Phase::Ready => panic!("systems have already been set up"),
		}

		self.phase = Phase::SettingUp;
		for entry in self.entries.iter_mut() {
			let _span = debug_span!("setup", system = entry.name).entered();
			entry.system.setup(world);
		}
		self.phase = Phase::Ready;
	}

	pub fn run_systems(&mut self, world: &mut EntityStore) {
		assert!(self.phase == Phase::Ready, "systems must be set up before they can run");
		for entry in self.entries.iter_mut() {
			let _span = debug_span!("run", system = entry.name).entered();
			entry.system.run(world);
		}
	}

	pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.entries.iter().map(|e| e.name)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}
}
