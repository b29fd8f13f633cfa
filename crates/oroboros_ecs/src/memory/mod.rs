//! # Memory Management
//!
//! Per-type component pools.
//!
//! Instances are recycled instead of dropped, so a steady-state world stops
//! allocating once every pool has reached its high-water mark.

mod pool;

pub use pool::{AnyPool, ComponentPool, Constructor};
