//! Variable-length per-entity arrays.
//!
//! A buffer component stores a [BufferHeader] followed by a fixed number of inline elements in
//! its chunk stream. Once the inline capacity is exceeded the elements move to a heap block owned
//! by the header; the heap block is released when the component is removed, when its entity is
//! destroyed or when the world is dropped.

mod buffer_header;
mod dynamic_buffer;

pub use dynamic_buffer::*;
pub use buffer_header::default_inline_capacity;
pub(crate) use buffer_header::*;
