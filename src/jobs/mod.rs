//! Units of work running on the rayon thread pool, and the bookkeeping that orders
//! them by the component types they read and write.

mod job_access;
mod job_handle;
mod dependency_tracker;

pub use job_access::*;
pub use job_handle::*;
pub use dependency_tracker::*;
