//! Fixed-size blocks of memory holding the component streams of up to
//! [capacity](ChunkLayout::capacity) entities of one archetype.

mod chunk;
mod chunk_layout;

pub use chunk::*;
pub use chunk_layout::*;
