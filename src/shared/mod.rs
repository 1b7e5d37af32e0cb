//! Deduplicated storage for [shared components](crate::components::SharedComponent).

mod shared_component_store;

pub use shared_component_store::*;
