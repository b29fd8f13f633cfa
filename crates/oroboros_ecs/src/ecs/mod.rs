//! # Entity Component System
//!
//! Pooled components, generational handles and incrementally maintained
//! filters.
//!
//! ## Design Philosophy
//!
//! - Component instances are recycled through per-type pools, never dropped
//!   while the world lives
//! - Entity handles carry a generation so recycled slots are detected
//! - Filters are updated on every attach/detach; queries never scan

mod component;
mod entity;
mod filter;
mod registry;
mod world;

pub use component::{Component, ComponentSet, ComponentTraits, ComponentTypeId};
pub use entity::EntityHandle;
pub use filter::{Filter, FilterCursor, FilterId, FilterListener, FilterRow, ListenerId};
pub use world::{World, WorldId, WorldStats};
