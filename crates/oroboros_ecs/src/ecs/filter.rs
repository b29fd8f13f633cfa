//! # Filters
//!
//! A filter is a materialized view: the list of entities whose component set
//! includes every type of `include` and none of `exclude`. The list is kept
//! up to date incrementally by the world on every attach/detach.
//!
//! ## Iteration
//!
//! ```text
//! cursor()  -> lock_count += 1   adds/removes go to the delayed buffer
//! next()    -> rows [0, len at open)
//! close()   -> lock_count -= 1   at zero, delayed ops replay in order
//! ```
//!
//! Removal swaps the last entity into the hole, so order is not stable
//! across removals.

use super::component::ComponentTypeId;
use super::entity::{ComponentLink, EntityHandle, EntitySlot};
use super::world::WorldId;
use crate::error::EcsError;

/// Sparse map marker for "not a member".
const ABSENT: u32 = u32::MAX;

/// Identifier of a filter, stamped with the world that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FilterId {
    world: WorldId,
    index: u32,
}

impl FilterId {
    #[inline]
    pub(crate) const fn new(world: WorldId, index: u32) -> Self {
        Self { world, index }
    }

    /// Returns the world that issued this id.
    #[inline]
    #[must_use]
    pub const fn world(self) -> WorldId {
        self.world
    }

    /// Returns the index of the filter within its world.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }
}

/// Identifier of a listener attached to one filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

impl ListenerId {
    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Callbacks fired when an entity enters or leaves a filter.
///
/// While the filter is locked, callbacks fire when the delayed operations
/// are replayed, not when the component change happened.
pub trait FilterListener {
    /// `entity` became a member.
    fn on_entity_added(&mut self, entity: EntityHandle);
    /// `entity` stopped being a member.
    fn on_entity_removed(&mut self, entity: EntityHandle);
}

/// Component change that is in flight while compatibility is evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PendingChange {
    /// No change; use the component list as is.
    None,
    /// The type is being removed but is still in the list.
    Removed(ComponentTypeId),
}

impl PendingChange {
    fn contains(self, components: &[ComponentLink], type_id: ComponentTypeId) -> bool {
        match self {
            Self::Removed(pending) if pending == type_id => false,
            _ => components.iter().any(|link| link.type_id == type_id),
        }
    }
}

/// Membership change requested while the filter was locked.
#[derive(Clone, Copy, Debug)]
enum DelayedOp {
    Add(EntityHandle),
    Remove(EntityHandle),
}

/// A row yielded by a [`FilterCursor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterRow {
    /// Position in the filter's entity list; indexes the filter columns.
    pub index: usize,
    /// The entity at that position.
    pub entity: EntityHandle,
}

/// An incrementally maintained list of entities matching a type constraint.
pub struct Filter {
    id: FilterId,
    /// Included types in declared order.
    include: Vec<ComponentTypeId>,
    /// Excluded types in declared order.
    exclude: Vec<ComponentTypeId>,
    /// Included types that own a column.
    column_types: Vec<ComponentTypeId>,
    /// Members.
    entities: Vec<EntityHandle>,
    /// Pool item index per member, one vector per column type.
    columns: Vec<Vec<u32>>,
    /// Entity id -> position in `entities`.
    positions: Vec<u32>,
    lock_count: u32,
    delayed: Vec<DelayedOp>,
    listeners: Vec<(ListenerId, Box<dyn FilterListener>)>,
    next_listener: u32,
}

impl Filter {
    pub(crate) fn new(
        id: FilterId,
        include: Vec<ComponentTypeId>,
        exclude: Vec<ComponentTypeId>,
        column_types: Vec<ComponentTypeId>,
        capacity: usize,
        delayed_capacity: usize,
    ) -> Self {
        let columns = column_types
            .iter()
            .map(|_| Vec::with_capacity(capacity))
            .collect();

        Self {
            id,
            include,
            exclude,
            column_types,
            entities: Vec::with_capacity(capacity),
            columns,
            positions: Vec::new(),
            lock_count: 0,
            delayed: Vec::with_capacity(delayed_capacity),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Returns the id of this filter.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> FilterId {
        self.id
    }

    /// Included component types, in declared order.
    #[inline]
    #[must_use]
    pub fn include(&self) -> &[ComponentTypeId] {
        &self.include
    }

    /// Excluded component types, in declared order.
    #[inline]
    #[must_use]
    pub fn exclude(&self) -> &[ComponentTypeId] {
        &self.exclude
    }

    /// Current members.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityHandle] {
        &self.entities
    }

    /// Number of members.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the filter has no members.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns true while at least one cursor is open.
    #[inline]
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.lock_count > 0
    }

    /// Returns true if `entity` (with this exact generation) is a member.
    #[must_use]
    pub fn contains(&self, entity: EntityHandle) -> bool {
        self.position(entity).is_some()
    }

    /// Pool item index of the `type_id` component of the member at `index`.
    ///
    /// `None` if the type has no column in this filter or `index` is out of range.
    #[must_use]
    pub fn item(&self, type_id: ComponentTypeId, index: usize) -> Option<u32> {
        let column = self.column_types.iter().position(|&t| t == type_id)?;
        self.columns[column].get(index).copied()
    }

    /// Evaluates the filter constraint against a component list.
    pub(crate) fn is_compatible(&self, components: &[ComponentLink], pending: PendingChange) -> bool {
        self.include
            .iter()
            .all(|&type_id| pending.contains(components, type_id))
            && !self
                .exclude
                .iter()
                .any(|&type_id| pending.contains(components, type_id))
    }

    /// Adds `entity`, or queues the add while locked.
    pub(crate) fn add_entity(&mut self, entity: EntityHandle, components: &[ComponentLink]) {
        if self.is_locked() {
            self.delayed.push(DelayedOp::Add(entity));
        } else {
            self.insert(entity, components);
        }
    }

    /// Removes `entity`, or queues the removal while locked.
    pub(crate) fn remove_entity(&mut self, entity: EntityHandle) {
        if self.is_locked() {
            self.delayed.push(DelayedOp::Remove(entity));
        } else {
            self.take(entity);
        }
    }

    pub(crate) fn lock(&mut self) {
        self.lock_count += 1;
    }

    /// Releases one lock; the last one replays the delayed operations.
    ///
    /// A queued add is applied only if the entity is still alive, still
    /// compatible and not yet a member, so replay always converges on the
    /// current component state.
    pub(crate) fn unlock(&mut self, slots: &[EntitySlot]) {
        if cfg!(debug_assertions) && self.lock_count == 0 {
            panic!("{}", EcsError::UnbalancedLock { filter: self.id.index });
        }
        self.lock_count = self.lock_count.saturating_sub(1);
        if self.lock_count > 0 || self.delayed.is_empty() {
            return;
        }

        let mut delayed = std::mem::take(&mut self.delayed);
        for op in delayed.drain(..) {
            match op {
                DelayedOp::Add(entity) => {
                    let Some(slot) = slots.get(entity.id() as usize) else {
                        continue;
                    };
                    if slot.matches(entity)
                        && !self.contains(entity)
                        && self.is_compatible(&slot.components, PendingChange::None)
                    {
                        self.insert(entity, &slot.components);
                    }
                }
                DelayedOp::Remove(entity) => self.take(entity),
            }
        }
        // keep the buffer's capacity for the next pass
        self.delayed = delayed;
    }

    pub(crate) fn add_listener(&mut self, listener: Box<dyn FilterListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn remove_listener(&mut self, id: ListenerId) -> Option<Box<dyn FilterListener>> {
        let position = self.listeners.iter().position(|(listener, _)| *listener == id)?;
        Some(self.listeners.remove(position).1)
    }

    fn position(&self, entity: EntityHandle) -> Option<usize> {
        let position = *self.positions.get(entity.id() as usize)?;
        if position == ABSENT {
            return None;
        }
        let position = position as usize;
        (self.entities[position] == entity).then_some(position)
    }

    fn insert(&mut self, entity: EntityHandle, components: &[ComponentLink]) {
        let id = entity.id() as usize;
        if self.positions.len() <= id {
            self.positions.resize(id + 1, ABSENT);
        }
        debug_assert_eq!(self.positions[id], ABSENT, "entity {entity} already in filter");

        self.positions[id] = self.entities.len() as u32;
        self.entities.push(entity);
        for (column, &type_id) in self.columns.iter_mut().zip(&self.column_types) {
            let item = components
                .iter()
                .find(|link| link.type_id == type_id)
                .map_or(ABSENT, |link| link.item);
            column.push(item);
        }

        for (_, listener) in &mut self.listeners {
            listener.on_entity_added(entity);
        }
    }

    fn take(&mut self, entity: EntityHandle) {
        let Some(position) = self.position(entity) else {
            return;
        };

        self.entities.swap_remove(position);
        for column in &mut self.columns {
            column.swap_remove(position);
        }
        self.positions[entity.id() as usize] = ABSENT;
        if let Some(moved) = self.entities.get(position) {
            self.positions[moved.id() as usize] = position as u32;
        }

        for (_, listener) in &mut self.listeners {
            listener.on_entity_removed(entity);
        }
    }
}

/// Reentrant-safe pass over a filter.
///
/// Opened with [`World::cursor`](super::World::cursor), which locks the
/// filter, and closed with [`World::close`](super::World::close). The cursor
/// does not borrow the world, so components can be attached and detached
/// while it is open; the rows it yields are fixed when it is opened.
///
/// # Panics
///
/// In debug builds, dropping a cursor that was never closed panics.
#[derive(Debug)]
pub struct FilterCursor {
    filter: FilterId,
    next: usize,
    end: usize,
    open: bool,
}

impl FilterCursor {
    pub(crate) const fn new(filter: FilterId, end: usize) -> Self {
        Self {
            filter,
            next: 0,
            end,
            open: true,
        }
    }

    /// Returns the filter this cursor walks.
    #[inline]
    #[must_use]
    pub const fn filter(&self) -> FilterId {
        self.filter
    }

    /// Number of rows this pass visits.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end
    }

    /// Returns true if this pass visits no rows.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end == 0
    }

    /// Advances to the next row.
    pub fn next(&mut self, world: &super::World) -> Option<FilterRow> {
        if self.next >= self.end {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let entity = *world.filter(self.filter).entities.get(index)?;
        Some(FilterRow { index, entity })
    }

    pub(crate) fn mark_closed(&mut self) {
        self.open = false;
    }
}

impl Drop for FilterCursor {
    fn drop(&mut self) {
        if self.open && cfg!(debug_assertions) && !std::thread::panicking() {
            panic!(
                "{}",
                EcsError::UnbalancedLock {
                    filter: self.filter.index
                }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn ty(index: u16) -> ComponentTypeId {
        ComponentTypeId::new(index)
    }

    fn link(type_index: u16, item: u32) -> ComponentLink {
        ComponentLink {
            type_id: ty(type_index),
            item,
        }
    }

    fn filter(include: &[u16], exclude: &[u16]) -> Filter {
        let include: Vec<_> = include.iter().map(|&t| ty(t)).collect();
        let exclude: Vec<_> = exclude.iter().map(|&t| ty(t)).collect();
        Filter::new(
            FilterId::new(WorldId::new(0), 0),
            include.clone(),
            exclude,
            include,
            4,
            4,
        )
    }

    #[derive(Clone, Default)]
    struct Log(Rc<RefCell<Vec<(bool, EntityHandle)>>>);

    impl FilterListener for Log {
        fn on_entity_added(&mut self, entity: EntityHandle) {
            self.0.borrow_mut().push((true, entity));
        }

        fn on_entity_removed(&mut self, entity: EntityHandle) {
            self.0.borrow_mut().push((false, entity));
        }
    }

    #[test]
    fn test_compatibility_with_pending_changes() {
        let f = filter(&[0, 1], &[2]);
        let has_0 = [link(0, 0)];
        let has_01 = [link(0, 0), link(1, 0)];
        let has_012 = [link(0, 0), link(1, 0), link(2, 0)];

        assert!(!f.is_compatible(&has_0, PendingChange::None));
        assert!(f.is_compatible(&has_01, PendingChange::None));
        assert!(!f.is_compatible(&has_01, PendingChange::Removed(ty(1))));
        assert!(!f.is_compatible(&has_012, PendingChange::None));
        assert!(f.is_compatible(&has_012, PendingChange::Removed(ty(2))));
    }

    #[test]
    fn test_swap_remove_keeps_columns_aligned() {
        let mut f = filter(&[0], &[]);
        let a = EntityHandle::new(0, 1);
        let b = EntityHandle::new(1, 1);
        let c = EntityHandle::new(2, 1);
        f.add_entity(a, &[link(0, 10)]);
        f.add_entity(b, &[link(0, 11)]);
        f.add_entity(c, &[link(0, 12)]);

        f.remove_entity(a);
        assert_eq!(f.entities(), &[c, b]);
        assert_eq!(f.item(ty(0), 0), Some(12));
        assert_eq!(f.item(ty(0), 1), Some(11));
        assert!(!f.contains(a));
        assert!(f.contains(c));
    }

    #[test]
    fn test_stale_generation_is_not_a_member() {
        let mut f = filter(&[0], &[]);
        f.add_entity(EntityHandle::new(5, 1), &[link(0, 0)]);
        assert!(!f.contains(EntityHandle::new(5, 2)));

        // removing with a stale handle leaves the member alone
        f.remove_entity(EntityHandle::new(5, 2));
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn test_locked_changes_replay_on_unlock() {
        let mut f = filter(&[0], &[]);
        let log = Log::default();
        f.add_listener(Box::new(log.clone()));

        let a = EntityHandle::new(0, 1);
        f.add_entity(a, &[link(0, 0)]);

        let slots = vec![EntitySlot::new(1), EntitySlot::new(1)];
        let b = slots[1].handle(1);

        f.lock();
        f.remove_entity(a);
        f.add_entity(b, &[]);
        assert_eq!(f.entities(), &[a]);

        // b has no components in its slot, so the queued add is dropped
        f.unlock(&slots);
        assert!(f.is_empty());
        assert!(!f.is_locked());
        assert_eq!(*log.0.borrow(), vec![(true, a), (false, a)]);
    }

    #[test]
    fn test_nested_locks_replay_once() {
        let mut f = filter(&[0], &[]);
        let mut slots = vec![EntitySlot::new(1)];
        slots[0].components.push(link(0, 3));
        let a = slots[0].handle(0);

        f.lock();
        f.lock();
        f.add_entity(a, &slots[0].components);
        f.unlock(&slots);
        assert!(f.is_empty());
        f.unlock(&slots);
        assert_eq!(f.entities(), &[a]);
        assert_eq!(f.item(ty(0), 0), Some(3));
    }

    #[test]
    fn test_remove_listener() {
        let mut f = filter(&[0], &[]);
        let log = Log::default();
        let id = f.add_listener(Box::new(log.clone()));
        assert!(f.remove_listener(id).is_some());
        assert!(f.remove_listener(id).is_none());

        f.add_entity(EntityHandle::new(0, 1), &[link(0, 0)]);
        assert!(log.0.borrow().is_empty());
    }
}
