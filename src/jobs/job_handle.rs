use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::panic::{self, AssertUnwindSafe};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::fmt;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

type Continuation = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct JobStatus {
	done: bool,
	panicked: bool,
	continuations: Vec<Continuation>,
}

struct JobState {
	id: u64,
	status: Mutex<JobStatus>,
	finished: Condvar,
}

impl JobState {
	fn new() -> Self {
		Self {
			id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
			status: Mutex::new(JobStatus::default()),
			finished: Condvar::new(),
		}
	}

	fn is_done(&self) -> bool {
		self.status.lock().done
	}

	fn finish(&self, panicked: bool) {
		let continuations = {
			let mut status = self.status.lock();
			status.done = true;
			status.panicked = panicked;
			std::mem::take(&mut status.continuations)
		};

		self.finished.notify_all();
		for continuation in continuations {
			continuation();
		}
	}

	/// Run `continuation` once the job is done, immediately if it already is.
	fn on_complete(&self, continuation: Continuation) {
		let mut status = self.status.lock();
		if status.done {
			drop(status);
			continuation();
		} else {
			status.continuations.push(continuation);
		}
	}
}

/// A handle to the completion of a unit of work.
///
/// The default handle is already complete. Handles are cheap to clone; every clone refers to
/// the same unit of work.
#[derive(Clone, Default)]
pub struct JobHandle {
	state: Option<Arc<JobState>>,
}

impl JobHandle {
	/// A handle that is already complete.
	pub fn completed() -> Self {
		Self::default()
	}

	/// Run `job` on the thread pool once `dependency` has completed.
	///
	/// The job is launched by the thread completing its dependency; no pool thread blocks waiting for it.
	pub fn schedule<F>(dependency: &JobHandle, job: F) -> JobHandle
	where
		F: FnOnce() + Send + 'static,
	{
		let state = Arc::new(JobState::new());
		let task = state.clone();
		let launch = move || {
			rayon::spawn(move || {
				let result = panic::catch_unwind(AssertUnwindSafe(job));
				task.finish(result.is_err());
			});
		};

		match &dependency.state {
			Some(dependency) => dependency.on_complete(Box::new(launch)),
			None => launch(),
		}

		JobHandle { state: Some(state) }
	}

	/// A handle that completes once every handle in `handles` has completed.
	pub fn combine(handles: &[JobHandle]) -> JobHandle {
		let mut pending: Vec<Arc<JobState>> = Vec::new();
		for state in handles.iter().filter_map(|h| h.state.as_ref()) {
			if !state.is_done() && !pending.iter().any(|p| Arc::ptr_eq(p, state)) {
				pending.push(state.clone());
			}
		}

		match pending.len() {
			0 => JobHandle::completed(),
			1 => JobHandle { state: pending.pop() },
			count => {
				let state = Arc::new(JobState::new());
				let remaining = Arc::new(AtomicUsize::new(count));
				for dependency in pending {
					let state = state.clone();
					let remaining = remaining.clone();
					dependency.on_complete(Box::new(move || {
						if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
							state.finish(false);
						}
					}));
				}
				JobHandle { state: Some(state) }
			},
		}
	}

	/// Identifier of the unit of work, 0 for the completed handle.
	pub fn id(&self) -> u64 {
		self.state.as_ref().map_or(0, |s| s.id)
	}

	/// Poll for completion without blocking.
	pub fn is_completed(&self) -> bool {
		self.state.as_ref().map_or(true, |s| s.is_done())
	}

	/// Finished, with no panic left to report.
	pub(crate) fn is_settled(&self) -> bool {
		self.state.as_ref().map_or(true, |s| {
			let status = s.status.lock();
			status.done && !status.panicked
		})
	}

	/// Block until the unit of work has finished.
	///
	/// # Panics
	/// If the unit of work panicked. The panic is reported once.
	pub fn complete(&self) {
		let Some(state) = &self.state else {
			return;
		};

		let mut status = state.status.lock();
		while !status.done {
			state.finished.wait(&mut status);
		}

		if status.panicked {
			status.panicked = false;
			drop(status);
			panic!("job {} panicked", state.id);
		}
	}
}

impl PartialEq for JobHandle {
	fn eq(&self, other: &Self) -> bool {
		self.id() == other.id()
	}
}

impl Eq for JobHandle {}

impl fmt::Debug for JobHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("JobHandle")
			.field("id", &self.id())
			.field("completed", &self.is_completed())
			.finish()
	}
}
