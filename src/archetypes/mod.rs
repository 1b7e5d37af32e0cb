//! [Archetypes](Archetype) are sets of [components](crate::components::Component)
//! tied to one or more [entities](crate::entities::Entity).
//!
//! Every archetype owns the [chunks](crate::chunks::Chunk) storing its entities. Archetypes are
//! created on demand and live as long as the world, even once empty.

mod archetype_macros;
mod archetype_instance;
mod archetype_registry;

pub use archetype_instance::Archetype;

pub(crate) use archetype_instance::*;
pub(crate) use archetype_registry::*;
