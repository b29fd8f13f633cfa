//! # Component System
//!
//! Components are plain data records. At most one instance of a given type
//! is attached to a given entity, and every instance lives in its world's
//! pool for that type.

use std::fmt;

use super::world::World;

/// Trait implemented by every component type.
///
/// Per-type behaviour is declared through associated constants and read once,
/// when the type is first used in a world.
///
/// # Example
///
/// ```rust
/// use oroboros_ecs::Component;
///
/// #[derive(Default)]
/// struct Target {
///     name: String,
///     distance: f32,
/// }
///
/// impl Component for Target {
///     fn release(&mut self) {
///         self.name.clear();
///     }
/// }
/// ```
pub trait Component: Default + 'static {
    /// Detached automatically by [`World::end_frame`].
    const ONE_FRAME: bool = false;

    /// Left out of filter columns. Meant for tag-like types without fields.
    const IGNORE_IN_FILTER: bool = false;

    /// Call [`Component::reset`] whenever an instance returns to its pool.
    const AUTO_RESET: bool = false;

    /// Drops owned references before the instance returns to its pool.
    ///
    /// Pooled instances are reused, so anything the component holds on to
    /// would otherwise outlive the entity it was attached to.
    fn release(&mut self);

    /// Restores the instance to its initial state. Only called for
    /// `AUTO_RESET` types.
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-world identifier of a component type.
///
/// Ids are dense, assigned in registration order, and index the world's pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(u16);

impl ComponentTypeId {
    #[inline]
    pub(crate) const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the raw index of this type id.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Behaviour flags of a component type, resolved once per world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComponentTraits {
    /// Instances are reset on recycle.
    pub auto_reset: bool,
    /// Instances are swept at the end of every frame.
    pub one_frame: bool,
    /// Type has no filter column.
    pub ignore_in_filter: bool,
}

impl ComponentTraits {
    /// Reads the flags declared by `T`.
    #[must_use]
    pub const fn of<T: Component>() -> Self {
        Self {
            auto_reset: T::AUTO_RESET,
            one_frame: T::ONE_FRAME,
            ignore_in_filter: T::IGNORE_IN_FILTER,
        }
    }
}

/// A compile-time list of component types, used to resolve typed filters.
///
/// Implemented for tuples of up to eight components, and for `()` as the
/// empty set.
pub trait ComponentSet {
    /// Registers every type of the set in `world` and appends their ids to
    /// `out`, in declaration order.
    fn register(world: &mut World, out: &mut Vec<ComponentTypeId>);
}

macro_rules! component_set {
    ($($name:ident),*) => {
        impl<$($name: Component),*> ComponentSet for ($($name,)*) {
            #[allow(unused_variables)]
            fn register(world: &mut World, out: &mut Vec<ComponentTypeId>) {
                $(out.push(world.register::<$name>());)*
            }
        }
    };
}

component_set!();
component_set!(A);
component_set!(A, B);
component_set!(A, B, C);
component_set!(A, B, C, D);
component_set!(A, B, C, D, E);
component_set!(A, B, C, D, E, F);
component_set!(A, B, C, D, E, F, G);
component_set!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Flash;

    impl Component for Flash {
        const ONE_FRAME: bool = true;
        const IGNORE_IN_FILTER: bool = true;

        fn release(&mut self) {}
    }

    #[derive(Default, Debug, PartialEq)]
    struct Counter(u32);

    impl Component for Counter {
        const AUTO_RESET: bool = true;

        fn release(&mut self) {}
    }

    #[test]
    fn test_traits_read_from_constants() {
        let traits = ComponentTraits::of::<Flash>();
        assert!(traits.one_frame);
        assert!(traits.ignore_in_filter);
        assert!(!traits.auto_reset);

        assert!(ComponentTraits::of::<Counter>().auto_reset);
    }

    #[test]
    fn test_default_reset_restores_default() {
        let mut counter = Counter(41);
        counter.reset();
        assert_eq!(counter.0, 0);

        let mut flash = Flash;
        flash.reset();
    }

    #[test]
    fn test_tuple_sets_keep_declared_order() {
        let mut world = World::new();
        let mut ids = Vec::new();
        <(Counter, Flash)>::register(&mut world, &mut ids);
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], world.component_type::<Counter>().unwrap());
        assert_eq!(ids[1], world.component_type::<Flash>().unwrap());

        let mut none = Vec::new();
        <()>::register(&mut world, &mut none);
        assert!(none.is_empty());
    }
}
