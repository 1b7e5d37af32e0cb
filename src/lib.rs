//! A chunked, archetype-based entity component system.
//!
//! Entities with the same set of [components](components::Component) share an
//! [archetype](Archetype) and live in fixed-size chunks, one contiguous stream per
//! component type. Work scheduled through [`EcsContext::schedule`](entities::EntityStore::schedule)
//! is ordered by its declared component access, and structural changes either run immediately
//! (after completing every in-flight job) or are deferred through [command buffers](commands).

extern crate self as chunk_ecs;

pub mod buffers;
pub mod chunks;
pub mod commands;
pub mod components;
pub mod config;
pub mod data_structures;
pub mod entities;
pub mod error;
pub mod jobs;
pub mod shared;
pub mod systems;
mod archetypes;
mod context;

pub use lazy_static::lazy_static;

pub mod prelude {
	pub use crate::systems::*;
	pub use crate::components::*;
	pub use crate::context::EcsContext;
	pub use crate::config::WorldConfig;
	pub use crate::error::{EcsError, Result};
	pub use crate::archetypes::Archetype;
	pub use crate::buffers::DynamicBuffer;
	pub use crate::commands::{Barrier, ConcurrentCommandBuffer, CommandWriter, EntityCommandBuffer};
	pub use crate::jobs::{AccessMode, ComponentDependencyManager, DependencyState, JobAccess, JobHandle};
	pub use crate::entities::{
		ComponentDataArray, ComponentGroup, Entity, EntityStore, GroupBuilder, GroupView, ReadOnlyDataArray,
	};
}

pub use archetypes::Archetype;
pub use context::EcsContext;

#[cfg(test)]
mod tests;
