use crate::entities::{ComponentGroup, EntityStore, GroupView};
use crate::jobs::{JobAccess, JobHandle};

/// The dependency bookkeeping of a single system.
///
/// Every job scheduled through it declares the union of the access of every group the
/// system has used so far, and is chained after the system's previous jobs.
#[derive(Default)]
pub struct SystemDependencies {
	access: JobAccess,
	groups: Vec<ComponentGroup>,
	output: JobHandle,
}

impl SystemDependencies {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record `group` as used by the system.
	pub fn use_group(&mut self, world: &EntityStore, group: ComponentGroup) {
		if !self.groups.contains(&group) {
			self.access.merge(world.group_access(group));
			self.groups.push(group);
		}
	}

	/// Union of the access of every group used so far.
	pub fn access(&self) -> &JobAccess {
		&self.access
	}

	pub fn groups(&self) -> &[ComponentGroup] {
		&self.groups
	}

	/// Handle completing once every job scheduled by the system has completed.
	pub fn output(&self) -> &JobHandle {
		&self.output
	}

	/// Schedule `job` over `group` after the system's previous jobs.
	pub fn schedule<F>(&mut self, world: &mut EntityStore, group: ComponentGroup, job: F) -> JobHandle
	where
		F: FnOnce(&GroupView<'_>) + Send + 'static,
	{
		self.use_group(world, group);
		let handle = world.schedule_with_access(&self.access, group, self.output.clone(), job);
		self.output = handle.clone();
		handle
	}

	/// Block until every job scheduled by the system has completed.
	pub fn complete(&mut self) {
		self.output.complete();
		self.output = JobHandle::completed();
	}
}
