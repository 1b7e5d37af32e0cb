//! Deferred structural changes.
//!
//! Jobs can't create or destroy entities nor change their archetype while they run. Instead they
//! record commands into an [EntityCommandBuffer], or into a [CommandWriter] obtained from a
//! [ConcurrentCommandBuffer], and the commands are replayed on the sequencing thread, usually
//! by a [Barrier].

mod barrier;
mod playback;
mod command_segment;
mod entity_command_buffer;

pub use barrier::*;
pub use entity_command_buffer::*;

pub(crate) use command_segment::*;
