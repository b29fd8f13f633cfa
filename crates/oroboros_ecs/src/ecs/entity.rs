//! # Entity Management
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into the entity table
//! - A generation counter for safe reuse

use std::fmt;

use super::component::ComponentTypeId;

/// Logical reference to an entity.
///
/// A handle is not a pointer: validity is re-checked on use by comparing its
/// generation against the slot's current generation. Two handles are equal
/// iff both the id and the generation match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    id: u32,
    generation: u16,
}

impl EntityHandle {
    /// Null/invalid entity handle.
    pub const NULL: Self = Self {
        id: u32::MAX,
        generation: 0,
    };

    /// Creates a handle from its raw parts.
    #[inline]
    #[must_use]
    pub const fn new(id: u32, generation: u16) -> Self {
        Self { id, generation }
    }

    /// Returns the slot index of this handle.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.id
    }

    /// Returns the generation this handle was issued with.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u16 {
        self.generation
    }

    /// Checks if this handle is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.id == u32::MAX
    }
}

impl Default for EntityHandle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.id, self.generation)
    }
}

/// One attached component: its type and its item index in that type's pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ComponentLink {
    pub(crate) type_id: ComponentTypeId,
    pub(crate) item: u32,
}

/// A row of the entity table.
///
/// The component list keeps attachment order and never holds the same type twice.
#[derive(Debug)]
pub(crate) struct EntitySlot {
    pub(crate) generation: u16,
    pub(crate) alive: bool,
    pub(crate) components: Vec<ComponentLink>,
}

impl EntitySlot {
    /// First generation handed out for a fresh slot. Zero is never issued.
    pub(crate) const FIRST_GENERATION: u16 = 1;

    pub(crate) fn new(component_capacity: usize) -> Self {
        Self {
            generation: Self::FIRST_GENERATION,
            alive: true,
            components: Vec::with_capacity(component_capacity),
        }
    }

    /// Handle for the entity currently occupying this slot.
    #[inline]
    pub(crate) const fn handle(&self, id: u32) -> EntityHandle {
        EntityHandle::new(id, self.generation)
    }

    #[inline]
    pub(crate) fn matches(&self, entity: EntityHandle) -> bool {
        self.alive && self.generation == entity.generation
    }

    #[inline]
    pub(crate) fn position_of(&self, type_id: ComponentTypeId) -> Option<usize> {
        self.components.iter().position(|link| link.type_id == type_id)
    }

    /// Marks the slot dead and bumps its generation so outstanding handles go stale.
    pub(crate) fn retire(&mut self) {
        debug_assert!(self.components.is_empty(), "retiring slot with components");
        self.alive = false;
        self.generation = match self.generation.wrapping_add(1) {
            0 => Self::FIRST_GENERATION,
            next => next,
        };
    }
}
