//! # Filter Registry
//!
//! Owns every filter of a world and indexes them by component type, so an
//! attach/detach only touches the filters that mention the changed type.
//!
//! ```text
//! include_index[Position] -> [f0, f2]
//! exclude_index[Position] -> [f3]
//! ```

use std::collections::HashMap;

use super::component::ComponentTypeId;
use super::entity::{ComponentLink, EntityHandle, EntitySlot};
use super::filter::{Filter, FilterId, PendingChange};
use super::world::WorldId;

/// Unordered type signature of a filter: sorted include and exclude ids.
type FilterKey = (Vec<ComponentTypeId>, Vec<ComponentTypeId>);

fn filter_key(include: &[ComponentTypeId], exclude: &[ComponentTypeId]) -> FilterKey {
    let mut include = include.to_vec();
    let mut exclude = exclude.to_vec();
    include.sort_unstable();
    exclude.sort_unstable();
    (include, exclude)
}

/// Outcome of a lookup by signature.
pub(crate) enum Lookup {
    /// A filter with the same signature and the same declared order.
    Found(FilterId),
    /// A filter with the same signature but a different declared order.
    Reordered(FilterId),
    /// No filter with this signature yet.
    Missing,
}

pub(crate) struct FilterRegistry {
    world: WorldId,
    filters: Vec<Filter>,
    by_key: HashMap<FilterKey, u32>,
    include_index: Vec<Vec<u32>>,
    exclude_index: Vec<Vec<u32>>,
}

impl FilterRegistry {
    pub(crate) fn new(world: WorldId, capacity: usize) -> Self {
        Self {
            world,
            filters: Vec::with_capacity(capacity),
            by_key: HashMap::with_capacity(capacity),
            include_index: Vec::new(),
            exclude_index: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.filters.len()
    }

    #[inline]
    pub(crate) fn get(&self, index: u32) -> &Filter {
        &self.filters[index as usize]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, index: u32) -> &mut Filter {
        &mut self.filters[index as usize]
    }

    /// Grows the per-type indices after a component type was registered.
    pub(crate) fn register_type(&mut self, type_id: ComponentTypeId) {
        let len = type_id.index() + 1;
        if self.include_index.len() < len {
            self.include_index.resize_with(len, Vec::new);
            self.exclude_index.resize_with(len, Vec::new);
        }
    }

    pub(crate) fn lookup(&self, include: &[ComponentTypeId], exclude: &[ComponentTypeId]) -> Lookup {
        let Some(&index) = self.by_key.get(&filter_key(include, exclude)) else {
            return Lookup::Missing;
        };
        let id = FilterId::new(self.world, index);
        let filter = self.get(index);
        if filter.include() == include && filter.exclude() == exclude {
            Lookup::Found(id)
        } else {
            Lookup::Reordered(id)
        }
    }

    /// Builds a filter, indexes it, and fills it from the live entities.
    pub(crate) fn create(
        &mut self,
        include: &[ComponentTypeId],
        exclude: &[ComponentTypeId],
        column_types: Vec<ComponentTypeId>,
        slots: &[EntitySlot],
        capacity: usize,
        delayed_capacity: usize,
    ) -> FilterId {
        let index = self.filters.len() as u32;
        let id = FilterId::new(self.world, index);
        let mut filter = Filter::new(
            id,
            include.to_vec(),
            exclude.to_vec(),
            column_types,
            capacity,
            delayed_capacity,
        );

        for (entity_id, slot) in slots.iter().enumerate() {
            if slot.alive && filter.is_compatible(&slot.components, PendingChange::None) {
                filter.add_entity(slot.handle(entity_id as u32), &slot.components);
            }
        }

        for type_id in include {
            self.include_index[type_id.index()].push(index);
        }
        for type_id in exclude {
            self.exclude_index[type_id.index()].push(index);
        }
        self.by_key.insert(filter_key(include, exclude), index);
        self.filters.push(filter);
        id
    }

    /// Updates the filters that mention `type_id` after it was added to
    /// `entity`. `components` already holds the new link.
    pub(crate) fn on_attached(
        &mut self,
        entity: EntityHandle,
        components: &[ComponentLink],
        type_id: ComponentTypeId,
    ) {
        let t = type_id.index();
        for &index in &self.include_index[t] {
            let filter = &mut self.filters[index as usize];
            if filter.is_compatible(components, PendingChange::None) {
                filter.add_entity(entity, components);
            }
        }
        for &index in &self.exclude_index[t] {
            let filter = &mut self.filters[index as usize];
            if filter.is_compatible(components, PendingChange::Removed(type_id)) {
                filter.remove_entity(entity);
            }
        }
    }

    /// Updates the filters that mention `type_id` before it is removed from
    /// `entity`. `components` still holds the outgoing link.
    pub(crate) fn on_detaching(
        &mut self,
        entity: EntityHandle,
        components: &[ComponentLink],
        type_id: ComponentTypeId,
    ) {
        let t = type_id.index();
        for &index in &self.include_index[t] {
            let filter = &mut self.filters[index as usize];
            if filter.is_compatible(components, PendingChange::None) {
                filter.remove_entity(entity);
            }
        }
        for &index in &self.exclude_index[t] {
            let filter = &mut self.filters[index as usize];
            if filter.is_compatible(components, PendingChange::Removed(type_id)) {
                filter.add_entity(entity, components);
            }
        }
    }
}
