//! # Component Pool
//!
//! Per-type arena that recycles component instances instead of dropping them.

use std::any::Any;

use crate::ecs::{Component, ComponentTraits, ComponentTypeId};
use crate::error::EcsError;

/// Custom constructor used when a pool has to grow.
pub type Constructor<T> = Box<dyn Fn() -> T>;

/// A pool of component instances of one type.
///
/// Items are allocated and recycled individually. Recycled slots go on a
/// free stack and are handed out again before the dense array grows, so
/// the array never gets longer than the peak number of live items.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. It belongs to exactly one world.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: ComponentPool<Health> = ComponentPool::new(type_id, 64);
///
/// // Acquire - O(1), allocates only when no slot is free
/// let item = pool.acquire();
/// pool.get_mut(item).value = 100;
///
/// // Recycle - O(1), the instance stays in the pool
/// pool.recycle(item);
/// ```
pub struct ComponentPool<T: Component> {
    /// Type id of `T` in the owning world.
    type_id: ComponentTypeId,
    /// Behaviour flags read from `T`.
    traits: ComponentTraits,
    /// Dense instance storage.
    items: Vec<T>,
    /// Whether each item is currently referenced by an entity.
    in_use: Vec<bool>,
    /// Stack of recyclable item indices.
    free: Vec<u32>,
    /// Number of items in use.
    live: usize,
    /// Highest number of items ever in use at once.
    peak: usize,
    /// Constructor used instead of `T::default()` when set.
    constructor: Option<Constructor<T>>,
}

impl<T: Component> ComponentPool<T> {
    /// Creates an empty pool with room for `capacity` items.
    #[must_use]
    pub fn new(type_id: ComponentTypeId, capacity: usize) -> Self {
        Self {
            type_id,
            traits: ComponentTraits::of::<T>(),
            items: Vec::with_capacity(capacity),
            in_use: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            live: 0,
            peak: 0,
            constructor: None,
        }
    }

    /// Installs a constructor used for every newly grown item.
    ///
    /// Items already in the pool are left untouched.
    pub fn set_constructor(&mut self, constructor: Constructor<T>) {
        self.constructor = Some(constructor);
    }

    /// Returns the type id of this pool's component.
    #[inline]
    #[must_use]
    pub const fn type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    /// Returns the behaviour flags of this pool's component.
    #[inline]
    #[must_use]
    pub const fn traits(&self) -> ComponentTraits {
        self.traits
    }

    /// Length of the backing array: live items plus free slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the pool never grew (or was shrunk to nothing).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items currently in use.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live
    }

    /// Returns the number of recyclable slots.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Returns the highest number of items ever in use at once.
    #[inline]
    #[must_use]
    pub const fn peak_live(&self) -> usize {
        self.peak
    }

    /// Hands out an item index, reusing a free slot when there is one.
    ///
    /// This is a **O(1)** operation and only allocates when the pool grows.
    pub fn acquire(&mut self) -> u32 {
        let item = if let Some(item) = self.free.pop() {
            self.in_use[item as usize] = true;
            item
        } else {
            debug_assert!(self.items.len() < u32::MAX as usize, "component pool overflow");
            let value = match &self.constructor {
                Some(constructor) => constructor(),
                None => T::default(),
            };
            self.items.push(value);
            self.in_use.push(true);
            (self.items.len() - 1) as u32
        };

        self.live += 1;
        self.peak = self.peak.max(self.live);
        item
    }

    /// Returns an item to the pool.
    ///
    /// Runs the component's `release` hook, then `reset` for auto-reset types.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if the item is not currently in use.
    pub fn recycle(&mut self, item: u32) {
        let index = item as usize;
        if cfg!(debug_assertions) && !self.in_use.get(index).copied().unwrap_or(false) {
            panic!(
                "{}",
                EcsError::DoubleRecycle {
                    component: std::any::type_name::<T>(),
                    item,
                }
            );
        }

        let value = &mut self.items[index];
        value.release();
        if self.traits.auto_reset {
            value.reset();
        }

        self.in_use[index] = false;
        self.free.push(item);
        self.live -= 1;
    }

    /// Gets a reference to an item.
    #[inline]
    #[must_use]
    pub fn get(&self, item: u32) -> Option<&T> {
        self.items.get(item as usize)
    }

    /// Gets a mutable reference to an item.
    #[inline]
    pub fn get_mut(&mut self, item: u32) -> Option<&mut T> {
        self.items.get_mut(item as usize)
    }

    /// Trims trailing free slots and spare capacity.
    ///
    /// The backing array is cut down to one past the highest item in use.
    /// Returns the number of slots released.
    pub fn shrink(&mut self) -> usize {
        let keep = self
            .in_use
            .iter()
            .rposition(|&used| used)
            .map_or(0, |last| last + 1);
        let released = self.items.len() - keep;

        self.items.truncate(keep);
        self.in_use.truncate(keep);
        self.free.retain(|&item| (item as usize) < keep);

        self.items.shrink_to_fit();
        self.in_use.shrink_to_fit();
        self.free.shrink_to_fit();

        released
    }
}

/// Type-erased view of a [`ComponentPool`], used by the world to manage
/// pools of every type uniformly.
pub trait AnyPool {
    /// Upcast for downcasting to the concrete pool.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for downcasting to the concrete pool.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Type id of the pooled component.
    fn component_type(&self) -> ComponentTypeId;
    /// Rust type name of the pooled component.
    fn type_name(&self) -> &'static str;
    /// Behaviour flags of the pooled component.
    fn traits(&self) -> ComponentTraits;
    /// See [`ComponentPool::acquire`].
    fn acquire(&mut self) -> u32;
    /// See [`ComponentPool::recycle`].
    fn recycle(&mut self, item: u32);
    /// See [`ComponentPool::live_count`].
    fn live_count(&self) -> usize;
    /// See [`ComponentPool::shrink`].
    fn shrink(&mut self) -> usize;
}

impl<T: Component> AnyPool for ComponentPool<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component_type(&self) -> ComponentTypeId {
        self.type_id
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn traits(&self) -> ComponentTraits {
        self.traits
    }

    fn acquire(&mut self) -> u32 {
        ComponentPool::acquire(self)
    }

    fn recycle(&mut self, item: u32) {
        ComponentPool::recycle(self, item);
    }

    fn live_count(&self) -> usize {
        self.live
    }

    fn shrink(&mut self) -> usize {
        ComponentPool::shrink(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Name {
        text: String,
    }

    impl Component for Name {
        fn release(&mut self) {
            self.text.clear();
        }
    }

    #[derive(Default, Debug, PartialEq)]
    struct Ammo {
        rounds: u32,
    }

    impl Component for Ammo {
        const AUTO_RESET: bool = true;

        fn release(&mut self) {}

        fn reset(&mut self) {
            self.rounds = 30;
        }
    }

    fn name_pool() -> ComponentPool<Name> {
        ComponentPool::new(ComponentTypeId::new(0), 4)
    }

    #[test]
    fn test_pool_acquire_recycle() {
        let mut pool = name_pool();

        let item = pool.acquire();
        pool.get_mut(item).unwrap().text.push_str("scout");
        assert_eq!(pool.get(item).unwrap().text, "scout");
        assert_eq!(pool.live_count(), 1);

        pool.recycle(item);
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.free_count(), 1);
        // release hook cleared the owned data
        assert!(pool.get(item).unwrap().text.is_empty());
    }

    #[test]
    fn test_pool_reuse() {
        let mut pool = name_pool();

        let first = pool.acquire();
        pool.recycle(first);

        let second = pool.acquire();
        assert_eq!(first, second); // Same slot reused
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_pool_len_bounded_by_peak() {
        let mut pool = name_pool();

        for round in 0..10 {
            let items: Vec<u32> = (0..=round % 4).map(|_| pool.acquire()).collect();
            for item in items {
                pool.recycle(item);
            }
            assert!(pool.len() <= pool.peak_live());
        }
        assert_eq!(pool.peak_live(), 4);
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn test_auto_reset_runs_on_recycle() {
        let mut pool: ComponentPool<Ammo> = ComponentPool::new(ComponentTypeId::new(1), 1);

        let item = pool.acquire();
        pool.get_mut(item).unwrap().rounds = 3;
        pool.recycle(item);
        assert_eq!(pool.get(item).map(|ammo| ammo.rounds), Some(30));
    }

    #[test]
    fn test_custom_constructor() {
        let mut pool = name_pool();
        pool.set_constructor(Box::new(|| Name {
            text: String::from("unnamed"),
        }));

        let item = pool.acquire();
        assert_eq!(pool.get(item).unwrap().text, "unnamed");
    }

    #[test]
    fn test_shrink_releases_trailing_free_slots() {
        let mut pool = name_pool();

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        pool.recycle(c);
        pool.recycle(a);

        assert_eq!(pool.shrink(), 1);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.free_count(), 1);

        // the freed front slot is still reusable
        assert_eq!(pool.acquire(), a);
        pool.recycle(b);
        pool.recycle(a);
        assert_eq!(pool.shrink(), 2);
        assert!(pool.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is not in use")]
    fn test_double_recycle_panics_in_debug() {
        let mut pool = name_pool();
        let item = pool.acquire();
        pool.recycle(item);
        pool.recycle(item);
    }
}
