//! # ECS World
//!
//! The central container for entities, component pools and filters.
//!
//! Every attach/detach updates the affected filters before it returns, so
//! filters are always current outside of an open cursor.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use super::component::{Component, ComponentSet, ComponentTypeId};
use super::entity::{ComponentLink, EntityHandle, EntitySlot};
use super::filter::{Filter, FilterCursor, FilterId, FilterListener, FilterRow, ListenerId};
use super::registry::{FilterRegistry, Lookup};
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};
use crate::memory::{AnyPool, ComponentPool};

static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(0);

/// Unique identifier of a world instance within the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldId(u32);

impl WorldId {
    #[inline]
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    fn next() -> Self {
        Self::new(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Snapshot of the world's bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Entities currently alive.
    pub active_entities: usize,
    /// Dead slots waiting on the free list for reuse.
    pub reserved_entities: usize,
    /// Filters created so far.
    pub filter_count: usize,
    /// Component types registered so far.
    pub component_type_count: usize,
    /// Filters swept by [`World::end_frame`].
    pub one_frame_filter_count: usize,
}

#[derive(Clone, Copy, Debug)]
struct OneFrameSweep {
    filter: u32,
    type_id: ComponentTypeId,
}

/// Panics with the error's message. Only called under `debug_assertions`.
#[inline]
#[track_caller]
fn misuse(result: EcsResult<()>) {
    if let Err(err) = result {
        panic!("{err}");
    }
}

/// The ECS World - owns all entities, pools and filters.
///
/// # Misuse checks
///
/// Stale handles, duplicate attaches and missing-component detaches panic in
/// debug builds. Release builds skip the checks; the outcome of a misuse is
/// then unspecified (stale data, corrupted bookkeeping) but never memory
/// unsafe. The `try_*` methods validate in every build.
///
/// # Empty entities
///
/// Detaching the last component of an entity recycles the entity. A freshly
/// created entity stays alive without components until it is destroyed or
/// gains and loses one.
///
/// # Example
///
/// ```rust
/// use oroboros_ecs::{Component, World};
///
/// #[derive(Default)]
/// struct Health(i32);
///
/// impl Component for Health {
///     fn release(&mut self) {}
/// }
///
/// let mut world = World::new();
/// let alive = world.resolve::<(Health,)>().unwrap();
///
/// let entity = world.create();
/// world.attach::<Health>(entity).0 = 100;
///
/// world.each(alive, |world, row| {
///     world.get_mut::<Health>(row.entity).unwrap().0 -= 1;
/// });
/// assert_eq!(world.get::<Health>(entity).unwrap().0, 99);
/// ```
pub struct World {
    id: WorldId,
    config: WorldConfig,
    /// Entity table. Slots are never removed, only retired.
    entities: Vec<EntitySlot>,
    /// Retired slot ids, reused before the table grows.
    free_ids: Vec<u32>,
    type_ids: HashMap<TypeId, ComponentTypeId>,
    /// Pools indexed by `ComponentTypeId`.
    pools: Vec<Box<dyn AnyPool>>,
    filters: FilterRegistry,
    one_frame: Vec<OneFrameSweep>,
    frame: u64,
}

impl World {
    /// Creates a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(WorldConfig::default())
    }

    /// Creates a world with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the configuration is out of range.
    pub fn with_config(config: WorldConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: WorldConfig) -> Self {
        let id = WorldId::next();
        Self {
            id,
            entities: Vec::with_capacity(config.entity_capacity),
            free_ids: Vec::with_capacity(config.entity_capacity),
            type_ids: HashMap::new(),
            pools: Vec::new(),
            filters: FilterRegistry::new(id, config.filter_capacity),
            one_frame: Vec::new(),
            frame: 0,
            config,
        }
    }

    /// Returns the id of this world.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> WorldId {
        self.id
    }

    /// Returns the configuration this world was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Number of completed [`World::end_frame`] calls.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Returns a snapshot of the world's counters.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            active_entities: self.entities.len() - self.free_ids.len(),
            reserved_entities: self.free_ids.len(),
            filter_count: self.filters.len(),
            component_type_count: self.pools.len(),
            one_frame_filter_count: self.one_frame.len(),
        }
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity without components.
    ///
    /// Reuses a retired slot when one is available (its generation was bumped
    /// on retirement), otherwise grows the entity table.
    pub fn create(&mut self) -> EntityHandle {
        if let Some(id) = self.free_ids.pop() {
            let slot = &mut self.entities[id as usize];
            slot.alive = true;
            return slot.handle(id);
        }

        debug_assert!(self.entities.len() < u32::MAX as usize, "entity table overflow");
        let id = self.entities.len() as u32;
        let slot = EntitySlot::new(self.config.entity_component_capacity);
        let handle = slot.handle(id);
        self.entities.push(slot);
        handle
    }

    /// Destroys an entity.
    ///
    /// Components are detached in reverse attachment order and recycled, then
    /// the slot's generation is bumped and its id goes on the free list.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `entity` is invalid or stale.
    pub fn destroy(&mut self, entity: EntityHandle) {
        if cfg!(debug_assertions) {
            misuse(self.check_alive(entity).map(|_| ()));
        }
        self.destroy_unchecked(entity);
    }

    /// Destroys an entity after validating the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is invalid or stale.
    pub fn try_destroy(&mut self, entity: EntityHandle) -> EcsResult<()> {
        self.check_alive(entity)?;
        self.destroy_unchecked(entity);
        Ok(())
    }

    /// Returns true if `entity` refers to a live entity.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: EntityHandle) -> bool {
        self.entities
            .get(entity.id() as usize)
            .is_some_and(|slot| slot.matches(entity))
    }

    /// Number of components attached to `entity`.
    #[must_use]
    pub fn component_count(&self, entity: EntityHandle) -> usize {
        self.live_slot(entity).map_or(0, |slot| slot.components.len())
    }

    /// Types attached to `entity`, in attachment order.
    pub fn component_types(&self, entity: EntityHandle) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.live_slot(entity)
            .into_iter()
            .flat_map(|slot| slot.components.iter().map(|link| link.type_id))
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers `T` in this world, creating its pool on first use.
    ///
    /// One-frame types also get the filter that [`World::end_frame`] sweeps.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        if let Some(&type_id) = self.type_ids.get(&TypeId::of::<T>()) {
            return type_id;
        }

        debug_assert!(self.pools.len() < u16::MAX as usize, "too many component types");
        let type_id = ComponentTypeId::new(self.pools.len() as u16);
        let pool = ComponentPool::<T>::new(type_id, self.config.pool_capacity);
        let traits = pool.traits();
        self.pools.push(Box::new(pool));
        self.type_ids.insert(TypeId::of::<T>(), type_id);
        self.filters.register_type(type_id);

        tracing::debug!(
            world = self.id.0,
            component = std::any::type_name::<T>(),
            type_id = type_id.raw(),
            one_frame = traits.one_frame,
            "registered component pool"
        );

        if traits.one_frame {
            let filter = self.filter_for(&[type_id], &[]);
            self.one_frame.push(OneFrameSweep {
                filter: filter.index(),
                type_id,
            });
        }
        type_id
    }

    /// Returns the id of `T` if it was registered in this world.
    #[inline]
    #[must_use]
    pub fn component_type<T: Component>(&self) -> Option<ComponentTypeId> {
        self.type_ids.get(&TypeId::of::<T>()).copied()
    }

    /// Sets the constructor used when the pool of `T` grows.
    pub fn set_constructor<T, F>(&mut self, constructor: F)
    where
        T: Component,
        F: Fn() -> T + 'static,
    {
        let type_id = self.register::<T>();
        if let Some(pool) = self.typed_pool_mut::<T>(type_id) {
            pool.set_constructor(Box::new(constructor));
        }
    }

    /// Returns the pool of `T`, if registered.
    #[must_use]
    pub fn pool<T: Component>(&self) -> Option<&ComponentPool<T>> {
        self.typed_pool::<T>(self.component_type::<T>()?)
    }

    /// Shrinks every pool to its high-water mark.
    ///
    /// Returns the total number of pool slots released.
    pub fn shrink_pools(&mut self) -> usize {
        let released = self.pools.iter_mut().map(|pool| pool.shrink()).sum();
        tracing::debug!(world = self.id.0, released, "shrank component pools");
        released
    }

    /// Attaches a pooled `T` to `entity` and returns it.
    ///
    /// The instance comes from the pool as it was left by its last
    /// `release`/`reset`, so initialize what the caller relies on, or use
    /// [`World::attach_with`].
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `entity` is stale or already has a `T`.
    pub fn attach<T: Component>(&mut self, entity: EntityHandle) -> &mut T {
        let type_id = self.register::<T>();
        if cfg!(debug_assertions) {
            misuse(self.check_attach::<T>(entity));
        }
        let item = self.attach_link(entity, type_id);
        self.item_mut::<T>(type_id, item)
    }

    /// Attaches `value` to `entity`. See [`World::attach`].
    pub fn attach_with<T: Component>(&mut self, entity: EntityHandle, value: T) -> &mut T {
        let component = self.attach::<T>(entity);
        *component = value;
        component
    }

    /// Attaches a pooled `T` after validating the request.
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is invalid or stale, or already has a `T`.
    pub fn try_attach<T: Component>(&mut self, entity: EntityHandle) -> EcsResult<&mut T> {
        let type_id = self.register::<T>();
        self.check_attach::<T>(entity)?;
        let item = self.attach_link(entity, type_id);
        Ok(self.item_mut::<T>(type_id, item))
    }

    /// Detaches `T` from `entity`, recycling it to the pool.
    ///
    /// The entity is recycled when this removes its last component.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `entity` is stale or has no `T`.
    pub fn detach<T: Component>(&mut self, entity: EntityHandle) {
        if cfg!(debug_assertions) {
            misuse(self.check_detach::<T>(entity));
        }
        if let Some(type_id) = self.component_type::<T>() {
            self.remove_component(entity, type_id);
        }
    }

    /// Detaches `T` after validating the request.
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is invalid or stale, or has no `T`.
    pub fn try_detach<T: Component>(&mut self, entity: EntityHandle) -> EcsResult<()> {
        self.check_detach::<T>(entity)?;
        if let Some(type_id) = self.component_type::<T>() {
            self.remove_component(entity, type_id);
        }
        Ok(())
    }

    /// Detaches `T` if attached. Returns whether anything was detached.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `entity` is stale.
    pub fn detach_if_present<T: Component>(&mut self, entity: EntityHandle) -> bool {
        if cfg!(debug_assertions) {
            misuse(self.check_alive(entity).map(|_| ()));
        }
        self.component_type::<T>()
            .is_some_and(|type_id| self.remove_component(entity, type_id))
    }

    /// Returns the `T` attached to `entity`.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `entity` is stale.
    #[must_use]
    pub fn get<T: Component>(&self, entity: EntityHandle) -> Option<&T> {
        if cfg!(debug_assertions) {
            misuse(self.check_alive(entity).map(|_| ()));
        }
        let type_id = self.component_type::<T>()?;
        let item = self.item_of(entity, type_id)?;
        self.typed_pool::<T>(type_id)?.get(item)
    }

    /// Returns the `T` attached to `entity`, mutably.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `entity` is stale.
    pub fn get_mut<T: Component>(&mut self, entity: EntityHandle) -> Option<&mut T> {
        if cfg!(debug_assertions) {
            misuse(self.check_alive(entity).map(|_| ()));
        }
        let type_id = self.component_type::<T>()?;
        let item = self.item_of(entity, type_id)?;
        self.typed_pool_mut::<T>(type_id)?.get_mut(item)
    }

    /// Returns the `T` attached to `entity` after validating the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is invalid or stale, or has no `T`.
    pub fn try_get<T: Component>(&self, entity: EntityHandle) -> EcsResult<&T> {
        self.check_alive(entity)?;
        self.component_type::<T>()
            .and_then(|type_id| {
                let item = self.item_of(entity, type_id)?;
                self.typed_pool::<T>(type_id)?.get(item)
            })
            .ok_or(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<T>(),
            })
    }

    /// Returns true if `entity` is alive and has a `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: EntityHandle) -> bool {
        self.component_type::<T>()
            .is_some_and(|type_id| self.item_of(entity, type_id).is_some())
    }

    // =========================================================================
    // Filters
    // =========================================================================

    /// Resolves the filter over every entity that has all of `I`.
    ///
    /// # Errors
    ///
    /// See [`World::resolve_filter`].
    pub fn resolve<I: ComponentSet>(&mut self) -> EcsResult<FilterId> {
        self.resolve_excluding::<I, ()>()
    }

    /// Resolves the filter over every entity that has all of `I` and none of `E`.
    ///
    /// # Errors
    ///
    /// See [`World::resolve_filter`].
    pub fn resolve_excluding<I: ComponentSet, E: ComponentSet>(&mut self) -> EcsResult<FilterId> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        I::register(self, &mut include);
        E::register(self, &mut exclude);
        self.resolve_filter(&include, &exclude)
    }

    /// Returns the filter with this type signature, creating it if needed.
    ///
    /// The signature is unordered; the declared order fixes the order of
    /// [`Filter::include`] and [`Filter::exclude`]. A new filter starts out
    /// holding every live entity that matches.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EmptyFilter`] if `include` is empty
    /// - [`EcsError::UnknownComponentType`] for ids not registered here
    /// - [`EcsError::DuplicateFilterType`] if a type is listed twice
    /// - [`EcsError::FilterOverlap`] if a type is both included and excluded
    /// - [`EcsError::AmbiguousFilter`] (debug builds) if the same signature
    ///   was already resolved in a different order
    pub fn resolve_filter(
        &mut self,
        include: &[ComponentTypeId],
        exclude: &[ComponentTypeId],
    ) -> EcsResult<FilterId> {
        self.validate_signature(include, exclude)?;
        if cfg!(debug_assertions) {
            if let Lookup::Reordered(existing) = self.filters.lookup(include, exclude) {
                return Err(EcsError::AmbiguousFilter {
                    filter: existing.index(),
                });
            }
        }
        Ok(self.filter_for(include, exclude))
    }

    /// Returns a filter.
    ///
    /// # Panics
    ///
    /// Panics if `filter` was issued by another world (always caught in
    /// debug builds).
    #[must_use]
    pub fn filter(&self, filter: FilterId) -> &Filter {
        if cfg!(debug_assertions) {
            misuse(self.check_filter(filter));
        }
        self.filters.get(filter.index())
    }

    /// Opens a pass over `filter`, locking it until [`World::close`].
    ///
    /// While locked, membership changes are queued and applied when the last
    /// cursor on the filter closes.
    pub fn cursor(&mut self, filter: FilterId) -> FilterCursor {
        if cfg!(debug_assertions) {
            misuse(self.check_filter(filter));
        }
        let target = self.filters.get_mut(filter.index());
        target.lock();
        FilterCursor::new(filter, target.len())
    }

    /// Closes a cursor, replaying queued changes if it was the last one.
    pub fn close(&mut self, mut cursor: FilterCursor) {
        if cfg!(debug_assertions) {
            misuse(self.check_filter(cursor.filter()));
        }
        cursor.mark_closed();
        self.filters
            .get_mut(cursor.filter().index())
            .unlock(&self.entities);
    }

    /// Runs `body` for every row of `filter`, with the filter locked.
    ///
    /// `body` gets the world back, so it may attach, detach, create and
    /// destroy freely; changes to this filter show up on the next pass.
    pub fn each<F>(&mut self, filter: FilterId, mut body: F)
    where
        F: FnMut(&mut World, FilterRow),
    {
        let mut cursor = self.cursor(filter);
        while let Some(row) = cursor.next(self) {
            body(self, row);
        }
        self.close(cursor);
    }

    /// Direct access to the `T` column of `filter` at row `index`.
    ///
    /// `None` if `T` is not an included type with a column (types flagged
    /// `IGNORE_IN_FILTER` have none) or the row is out of range.
    #[must_use]
    pub fn column<T: Component>(&self, filter: FilterId, index: usize) -> Option<&T> {
        let type_id = self.component_type::<T>()?;
        let item = self.filter(filter).item(type_id, index)?;
        self.typed_pool::<T>(type_id)?.get(item)
    }

    /// Mutable direct access to the `T` column of `filter` at row `index`.
    pub fn column_mut<T: Component>(&mut self, filter: FilterId, index: usize) -> Option<&mut T> {
        let type_id = self.component_type::<T>()?;
        let item = self.filter(filter).item(type_id, index)?;
        self.typed_pool_mut::<T>(type_id)?.get_mut(item)
    }

    /// Registers a listener on `filter`.
    pub fn add_listener<L>(&mut self, filter: FilterId, listener: L) -> ListenerId
    where
        L: FilterListener + 'static,
    {
        if cfg!(debug_assertions) {
            misuse(self.check_filter(filter));
        }
        self.filters
            .get_mut(filter.index())
            .add_listener(Box::new(listener))
    }

    /// Removes a listener from `filter`, returning it.
    pub fn remove_listener(
        &mut self,
        filter: FilterId,
        listener: ListenerId,
    ) -> Option<Box<dyn FilterListener>> {
        if cfg!(debug_assertions) {
            misuse(self.check_filter(filter));
        }
        self.filters.get_mut(filter.index()).remove_listener(listener)
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Ends the current tick: detaches every one-frame component.
    ///
    /// Entities left without components by the sweep are recycled. Debug
    /// builds also warn about live entities that hold no components.
    pub fn end_frame(&mut self) {
        for sweep in 0..self.one_frame.len() {
            let OneFrameSweep { filter, type_id } = self.one_frame[sweep];
            let members = self.filters.get(filter).len();
            // walk from the back: unlocked removals always take the last row
            for index in (0..members).rev() {
                let entity = self.filters.get(filter).entities()[index];
                if self.is_alive(entity) {
                    self.remove_component(entity, type_id);
                }
            }
            if members > 0 {
                tracing::trace!(world = self.id.0, frame = self.frame, filter, members, "swept one-frame components");
            }
        }

        if cfg!(debug_assertions) {
            let empty = self
                .entities
                .iter()
                .filter(|slot| slot.alive && slot.components.is_empty())
                .count();
            if empty > 0 {
                tracing::warn!(world = self.id.0, frame = self.frame, empty, "live entities without components");
            }
        }

        self.frame += 1;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn live_slot(&self, entity: EntityHandle) -> Option<&EntitySlot> {
        self.entities
            .get(entity.id() as usize)
            .filter(|slot| slot.matches(entity))
    }

    fn item_of(&self, entity: EntityHandle, type_id: ComponentTypeId) -> Option<u32> {
        let slot = self.live_slot(entity)?;
        Some(slot.components[slot.position_of(type_id)?].item)
    }

    fn typed_pool<T: Component>(&self, type_id: ComponentTypeId) -> Option<&ComponentPool<T>> {
        self.pools.get(type_id.index())?.as_any().downcast_ref()
    }

    fn typed_pool_mut<T: Component>(&mut self, type_id: ComponentTypeId) -> Option<&mut ComponentPool<T>> {
        self.pools.get_mut(type_id.index())?.as_any_mut().downcast_mut()
    }

    fn item_mut<T: Component>(&mut self, type_id: ComponentTypeId, item: u32) -> &mut T {
        self.typed_pool_mut::<T>(type_id)
            .and_then(|pool| pool.get_mut(item))
            .expect("pool item registered under a different component type")
    }

    fn check_alive(&self, entity: EntityHandle) -> EcsResult<&EntitySlot> {
        let slot = self
            .entities
            .get(entity.id() as usize)
            .ok_or(EcsError::InvalidEntity { entity })?;
        if slot.matches(entity) {
            Ok(slot)
        } else {
            Err(EcsError::StaleEntity {
                entity,
                current: slot.generation,
            })
        }
    }

    fn check_attach<T: Component>(&self, entity: EntityHandle) -> EcsResult<()> {
        self.check_alive(entity)?;
        if self.has::<T>(entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: std::any::type_name::<T>(),
            });
        }
        Ok(())
    }

    fn check_detach<T: Component>(&self, entity: EntityHandle) -> EcsResult<()> {
        self.check_alive(entity)?;
        if !self.has::<T>(entity) {
            return Err(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<T>(),
            });
        }
        Ok(())
    }

    fn check_filter(&self, filter: FilterId) -> EcsResult<()> {
        if filter.world() == self.id {
            Ok(())
        } else {
            Err(EcsError::ForeignFilter {
                owner: filter.world().raw(),
                world: self.id.raw(),
            })
        }
    }

    fn type_name(&self, type_id: ComponentTypeId) -> EcsResult<&'static str> {
        self.pools
            .get(type_id.index())
            .map(|pool| pool.type_name())
            .ok_or(EcsError::UnknownComponentType(type_id.raw()))
    }

    fn validate_signature(&self, include: &[ComponentTypeId], exclude: &[ComponentTypeId]) -> EcsResult<()> {
        if include.is_empty() {
            return Err(EcsError::EmptyFilter);
        }
        for (position, type_id) in include.iter().enumerate() {
            let component = self.type_name(*type_id)?;
            if include[..position].contains(type_id) {
                return Err(EcsError::DuplicateFilterType { component });
            }
        }
        for (position, type_id) in exclude.iter().enumerate() {
            let component = self.type_name(*type_id)?;
            if include.contains(type_id) {
                return Err(EcsError::FilterOverlap { component });
            }
            if exclude[..position].contains(type_id) {
                return Err(EcsError::DuplicateFilterType { component });
            }
        }
        Ok(())
    }

    /// Looks up or creates a filter for an already validated signature.
    fn filter_for(&mut self, include: &[ComponentTypeId], exclude: &[ComponentTypeId]) -> FilterId {
        match self.filters.lookup(include, exclude) {
            Lookup::Found(id) | Lookup::Reordered(id) => id,
            Lookup::Missing => {
                let column_types = include
                    .iter()
                    .copied()
                    .filter(|type_id| !self.pools[type_id.index()].traits().ignore_in_filter)
                    .collect();
                let id = self.filters.create(
                    include,
                    exclude,
                    column_types,
                    &self.entities,
                    self.config.filter_capacity,
                    self.config.delayed_op_capacity,
                );
                tracing::debug!(
                    world = self.id.0,
                    filter = id.index(),
                    include = include.len(),
                    exclude = exclude.len(),
                    members = self.filters.get(id.index()).len(),
                    "created filter"
                );
                id
            }
        }
    }

    /// Acquires an item, links it to the entity and updates filters.
    fn attach_link(&mut self, entity: EntityHandle, type_id: ComponentTypeId) -> u32 {
        let item = self.pools[type_id.index()].acquire();
        let slot = &mut self.entities[entity.id() as usize];
        slot.components.push(ComponentLink { type_id, item });
        self.filters.on_attached(entity, &slot.components, type_id);
        item
    }

    /// Updates filters, unlinks the component and recycles it.
    ///
    /// Leaves the entity alive even if it ends up empty.
    fn detach_link(&mut self, entity: EntityHandle, type_id: ComponentTypeId) -> bool {
        let slot = &mut self.entities[entity.id() as usize];
        let Some(position) = slot.position_of(type_id) else {
            return false;
        };
        self.filters.on_detaching(entity, &slot.components, type_id);
        let link = slot.components.remove(position);
        self.pools[link.type_id.index()].recycle(link.item);
        true
    }

    /// Detaches one component and recycles the entity if it ends up empty.
    fn remove_component(&mut self, entity: EntityHandle, type_id: ComponentTypeId) -> bool {
        if !self.detach_link(entity, type_id) {
            return false;
        }
        if self.entities[entity.id() as usize].components.is_empty() {
            self.retire(entity);
        }
        true
    }

    fn destroy_unchecked(&mut self, entity: EntityHandle) {
        let index = entity.id() as usize;
        while let Some(link) = self.entities[index].components.last().copied() {
            self.detach_link(entity, link.type_id);
        }
        self.retire(entity);
    }

    fn retire(&mut self, entity: EntityHandle) {
        self.entities[entity.id() as usize].retire();
        self.free_ids.push(entity.id());
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
