//! [Entities](Entity) represent the individual "things" in your game or application.
//!
//! An [Entity] doesn't store any data and has no associated behaviour;  
//! instead, it identifies which pieces of data ([Components](crate::components::Component)) belong together.
//!
//! The [EntityStore] owns every entity of a world; [component groups](ComponentGroup) select the
//! entities to iterate over and [views](GroupView) expose their components as index-aligned arrays.

mod group_view;
mod entity_store;
mod entity_instance;
mod component_group;

pub use group_view::{
	BufferAccessor, ComponentDataArray, EntityArray, GroupView, ReadOnlyDataArray, SharedComponentArray,
};
pub use entity_store::*;
pub use entity_instance::Entity;
pub use component_group::{ComponentGroup, GroupBuilder};

pub(crate) use group_view::{Column, VersionGuard};
pub(crate) use entity_instance::{EntityLocation, EntityTable};
pub(crate) use component_group::{GroupData, SharedFilter};
