use crate::components::ComponentId;
use std::hash::BuildHasherDefault;
use crate::jobs::{JobAccess, JobHandle};
use nohash_hasher::NoHashHasher;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::trace;

type Hasher = BuildHasherDefault<NoHashHasher<usize>>;

#[derive(Default)]
struct DependencyRecord {
	writer: Option<JobHandle>,
	readers: Vec<JobHandle>,
}

/// What is currently known to touch a component type.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DependencyState {
	Idle,
	/// Read by this many units of work since the last write.
	ReadBy(usize),
	/// Written by the unit of work with this id.
	WrittenBy(u64),
}

/// Tracks, per component type, the last unit of work writing it and the units of work
/// reading it since, so that new work can be ordered after everything it conflicts with.
///
/// Every tracked unit of work is also kept regardless of its access, so that a sync point
/// waits for work that declared no component types at all.
#[derive(Default)]
pub struct ComponentDependencyManager {
	records: HashMap<ComponentId, DependencyRecord, Hasher>,
	pending: Vec<JobHandle>,
}

impl ComponentDependencyManager {
	pub fn new() -> Self {
		Self::default()
	}

	/// The handles a unit of work declaring `access` has to wait for: the writer of every type
	/// it touches, plus the readers of every type it writes.
	pub fn wait_set(&self, access: &JobAccess) -> Vec<JobHandle> {
		let mut handles: Vec<JobHandle> = Vec::new();
		let mut push = |handle: &JobHandle| {
			if handle.id() != 0 && !handles.contains(handle) {
				handles.push(handle.clone());
			}
		};

		for id in access.reads().iter().chain(access.writes()) {
			if let Some(writer) = self.records.get(id).and_then(|r| r.writer.as_ref()) {
				push(writer);
			}
		}
		for id in access.writes() {
			if let Some(record) = self.records.get(id) {
				record.readers.iter().for_each(&mut push);
			}
		}
		handles
	}

	/// A single handle completing once the whole [wait set](Self::wait_set) has.
	pub fn get_dependency(&self, access: &JobAccess) -> JobHandle {
		JobHandle::combine(&self.wait_set(access))
	}

	/// Record `handle` as the latest reader or writer of the types in `access`.
	pub fn add_dependency(&mut self, access: &JobAccess, handle: &JobHandle) {
		trace!(job = handle.id(), reads = access.reads().len(), writes = access.writes().len(), "tracking job");
		self.pending.retain(|p| !p.is_settled());
		if handle.id() != 0 && !self.pending.contains(handle) {
			self.pending.push(handle.clone());
		}

		for id in access.writes() {
			let record = self.records.entry(*id).or_default();
			record.writer = Some(handle.clone());
			record.readers.clear();
		}
		for id in access.reads() {
			let record = self.records.entry(*id).or_default();
			record.readers.retain(|r| !r.is_completed());
			if !record.readers.contains(handle) {
				record.readers.push(handle.clone());
			}
		}
	}

	/// Block until no unit of work is writing `id`.
	pub fn complete_read_dependency(&self, id: ComponentId) {
		if let Some(writer) = self.records.get(&id).and_then(|r| r.writer.as_ref()) {
			writer.complete();
		}
	}

	/// Block until no unit of work is reading or writing `id`.
	pub fn complete_write_dependency(&self, id: ComponentId) {
		if let Some(record) = self.records.get(&id) {
			if let Some(writer) = &record.writer {
				writer.complete();
			}
			record.readers.iter().for_each(JobHandle::complete);
		}
	}

	/// Block until every tracked unit of work has finished, then forget them all.
	pub fn complete_all(&mut self) {
		let records = std::mem::take(&mut self.records);
		let pending = std::mem::take(&mut self.pending);
		if !pending.is_empty() {
			trace!(types = records.len(), jobs = pending.len(), "sync point");
		}

		// Every job has finished before a panic is reported.
		let mut panic = None;
		for handle in &pending {
			if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handle.complete())) {
				panic.get_or_insert(payload);
			}
		}
		if let Some(payload) = panic {
			panic::resume_unwind(payload);
		}
	}

	/// Number of tracked units of work that have not been seen completing yet.
	pub fn pending_jobs(&self) -> usize {
		self.pending.iter().filter(|p| !p.is_completed()).count()
	}

	pub fn state(&self, id: ComponentId) -> DependencyState {
		match self.records.get(&id) {
			None => DependencyState::Idle,
			Some(record) if !record.readers.is_empty() => DependencyState::ReadBy(record.readers.len()),
			Some(DependencyRecord { writer: Some(writer), .. }) => DependencyState::WrittenBy(writer.id()),
			Some(_) => DependencyState::Idle,
		}
	}
}
