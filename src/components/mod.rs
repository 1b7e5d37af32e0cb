//! [Components](Component) are plain data attached to [entities](crate::entities::Entity).
//!
//! Every component type is described at runtime by a [ComponentType], which records how its
//! values are laid out in chunk memory and whether it is shared, a buffer element or system state.

mod component_id;
mod component_set;
mod component_type;

pub use component_id::*;
pub use component_set::*;
pub use component_type::*;
pub use chunk_ecs_derive::Component;
