//! # ECS Error Types
//!
//! Every misuse the store can detect. Debug builds raise these as panics at
//! the call site; the `try_*` entry points return them in every build.

use thiserror::Error;

use crate::ecs::EntityHandle;

/// Errors that can occur when using the entity store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The handle points past the end of the entity table.
    #[error("invalid entity {entity}: no such slot")]
    InvalidEntity {
        /// The offending handle.
        entity: EntityHandle,
    },

    /// The handle's generation no longer matches its slot.
    #[error("stale entity {entity}: slot is at generation {current}")]
    StaleEntity {
        /// The offending handle.
        entity: EntityHandle,
        /// Generation currently stored in the slot.
        current: u16,
    },

    /// Component already attached to the entity.
    #[error("component {component} already attached to entity {entity}")]
    DuplicateComponent {
        /// The entity.
        entity: EntityHandle,
        /// Type name of the component.
        component: &'static str,
    },

    /// Component not attached to the entity.
    #[error("component {component} not attached to entity {entity}")]
    MissingComponent {
        /// The entity.
        entity: EntityHandle,
        /// Type name of the component.
        component: &'static str,
    },

    /// Component type id was never registered in this world.
    #[error("unknown component type id {0}")]
    UnknownComponentType(u16),

    /// A filter needs at least one included component type.
    #[error("filter has no include types")]
    EmptyFilter,

    /// The same component type was listed twice in a filter signature.
    #[error("component {component} listed twice in filter signature")]
    DuplicateFilterType {
        /// Type name of the component.
        component: &'static str,
    },

    /// A component type appears in both the include and exclude sets.
    #[error("component {component} is both included and excluded")]
    FilterOverlap {
        /// Type name of the component.
        component: &'static str,
    },

    /// Same type sets as an existing filter but a different declared order.
    #[error("filter {filter} already exists with the same types in a different order")]
    AmbiguousFilter {
        /// Index of the existing filter.
        filter: u32,
    },

    /// Filter id was issued by another world.
    #[error("filter belongs to world {owner}, not world {world}")]
    ForeignFilter {
        /// World that issued the id.
        owner: u32,
        /// World the id was used with.
        world: u32,
    },

    /// A cursor was dropped without being closed, or closed on the wrong filter.
    #[error("unbalanced lock on filter {filter}")]
    UnbalancedLock {
        /// Index of the filter.
        filter: u32,
    },

    /// A pool item was recycled twice or never acquired.
    #[error("pool item {item} of {component} is not in use")]
    DoubleRecycle {
        /// Type name of the component.
        component: &'static str,
        /// The pool item index.
        item: u32,
    },

    /// Invalid world configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
