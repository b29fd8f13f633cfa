//! # OROBOROS ECS
//!
//! Pooled Entity Component System with incrementally maintained filters:
//! - Components live in per-type pools and are recycled, not dropped
//! - Entity handles are generational; stale handles are detected
//! - Filters know their members at all times and tolerate structural
//!   changes while they are being iterated
//!
//! ## Architecture Rules
//!
//! 1. **Attach/detach update filters immediately** - no scanning at query time
//! 2. **One-frame components** are swept by [`World::end_frame`]
//! 3. **Misuse panics in debug builds** - release builds skip the checks;
//!    the `try_*` methods check in every build
//!
//! ## Example
//!
//! ```rust
//! use oroboros_ecs::{Component, World};
//!
//! #[derive(Default)]
//! struct Position { x: f32 }
//!
//! #[derive(Default)]
//! struct Velocity { dx: f32 }
//!
//! impl Component for Position {
//!     fn release(&mut self) {}
//! }
//!
//! impl Component for Velocity {
//!     fn release(&mut self) {}
//! }
//!
//! let mut world = World::new();
//! let moving = world.resolve::<(Position, Velocity)>().unwrap();
//!
//! let entity = world.create();
//! world.attach::<Position>(entity);
//! world.attach::<Velocity>(entity).dx = 2.0;
//!
//! world.each(moving, |world, row| {
//!     let dx = world.get::<Velocity>(row.entity).unwrap().dx;
//!     world.get_mut::<Position>(row.entity).unwrap().x += dx;
//! });
//! assert_eq!(world.get::<Position>(entity).unwrap().x, 2.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;

pub use config::WorldConfig;
pub use ecs::{
    Component, ComponentSet, ComponentTraits, ComponentTypeId, EntityHandle, Filter,
    FilterCursor, FilterId, FilterListener, FilterRow, ListenerId, World, WorldId, WorldStats,
};
pub use error::{EcsError, EcsResult};
pub use memory::{AnyPool, ComponentPool, Constructor};
