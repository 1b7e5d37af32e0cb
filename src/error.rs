//! Errors surfaced by entity, component and command buffer operations.

use crate::entities::Entity;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EcsError>;

/// Errors returned by the world and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
	/// The entity was destroyed, belongs to a recycled index or was never created.
	#[error("{entity} does not exist")]
	StaleReference { entity: Entity },

	/// The component is not usable the way it was requested.
	#[error("component `{component}`: {mismatch}")]
	TypeMismatch { component: &'static str, mismatch: TypeMismatch },

	/// A size or layout limit was exceeded.
	#[error("component `{component}`: {reason}")]
	CapacityExceeded { component: &'static str, reason: CapacityError },

	/// Access to component data that was not declared, or that overlaps an outstanding borrow.
	#[error("component `{component}`: {hazard}")]
	ConcurrentMutationHazard { component: &'static str, hazard: AccessHazard },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TypeMismatch {
	#[error("not present on {0}")]
	Missing(Entity),
	#[error("already present on {0}")]
	AlreadyPresent(Entity),
	#[error("not a per-entity data component")]
	NotData,
	#[error("not a shared component")]
	NotShared,
	#[error("not a buffer element")]
	NotBuffer,
	#[error("not part of the component group")]
	NotInGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
	#[error("listed more than once in an archetype")]
	DuplicateComponent,
	#[error("{size} bytes per entity do not fit a {chunk_size} byte chunk")]
	ComponentTooLarge { size: usize, chunk_size: usize },
	#[error("alignment of {align} bytes exceeds the chunk alignment")]
	AlignmentTooLarge { align: usize },
	#[error("cannot reinterpret {from} byte elements as {to} byte elements")]
	ReinterpretSize { from: usize, to: usize },
	#[error("cannot reinterpret {from} aligned elements as {to} aligned elements")]
	ReinterpretAlign { from: usize, to: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessHazard {
	#[error("access was not declared")]
	Undeclared,
	#[error("declared read-only")]
	ReadOnly,
	#[error("already borrowed")]
	AlreadyBorrowed,
}

impl EcsError {
	pub(crate) fn stale(entity: Entity) -> Self {
		EcsError::StaleReference { entity }
	}

	pub(crate) fn mismatch(component: &'static str, mismatch: TypeMismatch) -> Self {
		EcsError::TypeMismatch { component, mismatch }
	}

	pub(crate) fn capacity(component: &'static str, reason: CapacityError) -> Self {
		EcsError::CapacityExceeded { component, reason }
	}

	pub(crate) fn hazard(component: &'static str, hazard: AccessHazard) -> Self {
		EcsError::ConcurrentMutationHazard { component, hazard }
	}
}
