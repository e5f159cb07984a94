//! The store core: entity allocation and recycling, archetype placement,
//! deferred structural mutation, query registration, and the per-tick
//! update barrier.
//!
//! All state is owned here. Archetypes, queries, and component columns
//! are internal collaborators reached only through the registry; there
//! is no mutation path that bypasses it.

use std::fmt;

use crate::{
    archetype::{Archetype, ArchetypeGraph, ArchetypeId},
    component::{ComponentData, ComponentId, Kind, Scalar},
    query::{self, Expr, MaskNode, QueryId, QueryState},
    sparse::SparseSet,
    system::System,
};

/// Raw entity id. A key, not an object: valid ids are below the
/// allocation high-water mark and not in the recycle set.
pub type Entity = u32;

/// Application mode for structural mutations.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Defer {
    /// Apply at the call site.
    #[default]
    Immediate,
    /// Queue until the next flush barrier.
    Deferred,
}

/// The entity store.
///
/// Capacity is fixed at construction; every component column is allocated
/// at that length and indexed directly by entity id.
pub struct Registry {
    max_entities: u32,
    default_defer: Defer,
    /// Allocation high-water mark; fresh ids are handed out below it.
    next_entity: u32,
    /// Destroyed ids available for reuse. The most recently destroyed id
    /// is handed out first.
    removed: SparseSet,
    archetypes: ArchetypeGraph,
    /// Current archetype per allocated id.
    current: Vec<ArchetypeId>,
    /// Pending-target archetype per allocated id, advanced eagerly by
    /// both immediate and deferred mutations.
    pending: Vec<ArchetypeId>,
    to_destroy: SparseSet,
    to_update: SparseSet,
    components: Vec<ComponentData>,
    queries: Vec<QueryState>,
    systems: Vec<Box<dyn System>>,
}

impl Registry {
    /// Create a store holding at most `max_entities` entities, applying
    /// structural mutations immediately by default.
    #[must_use]
    pub fn new(max_entities: u32) -> Self {
        Self::with_defer(max_entities, Defer::Immediate)
    }

    /// Create a store with an explicit default mutation mode.
    #[must_use]
    pub fn with_defer(max_entities: u32, default_defer: Defer) -> Self {
        Self {
            max_entities,
            default_defer,
            next_entity: 0,
            removed: SparseSet::new(),
            archetypes: ArchetypeGraph::new(),
            current: Vec::new(),
            pending: Vec::new(),
            to_destroy: SparseSet::new(),
            to_update: SparseSet::new(),
            components: Vec::new(),
            queries: Vec::new(),
            systems: Vec::new(),
        }
    }

    // ==================== Schema ====================

    /// Declare a component from parallel field-name and kind lists
    /// (truncated to the shorter), returning its dense id.
    ///
    /// # Panics
    /// Panics if any entity has already been created.
    pub fn define_component(&mut self, names: &[&str], kinds: &[Kind]) -> ComponentId {
        assert!(
            self.next_entity == 0,
            "components must be defined before entities are created"
        );
        let id = ComponentId::from_raw(self.components.len() as u32);
        self.components
            .push(ComponentData::new(id, names, kinds, self.max_entities as usize));
        id
    }

    /// Number of declared components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// The definition behind `component`.
    ///
    /// # Panics
    /// Panics if `component` was not returned by [`define_component`].
    ///
    /// [`define_component`]: Self::define_component
    #[must_use]
    pub fn component(&self, component: ComponentId) -> &ComponentData {
        &self.components[component.as_raw() as usize]
    }

    /// Mutable access to the definition behind `component`.
    ///
    /// # Panics
    /// Panics if `component` was not returned by `define_component`.
    pub fn component_mut(&mut self, component: ComponentId) -> &mut ComponentData {
        &mut self.components[component.as_raw() as usize]
    }

    /// Typed view of a field column, indexed by entity id.
    ///
    /// `None` when the field name is unknown or `T` does not match the
    /// declared kind. Slots are only meaningful for entities whose
    /// archetype carries the component.
    #[must_use]
    pub fn column<T: Scalar>(&self, component: ComponentId, field: &str) -> Option<&[T]> {
        let data = self.component(component);
        data.column_slice(data.field_index(field)?)
    }

    /// Typed mutable view of a field column, indexed by entity id.
    #[must_use]
    pub fn column_mut<T: Scalar>(&mut self, component: ComponentId, field: &str) -> Option<&mut [T]> {
        let index = self.component(component).field_index(field)?;
        self.component_mut(component).column_slice_mut(index)
    }

    // ==================== Entity lifecycle ====================

    /// Allocate an entity in the empty archetype, reusing the most
    /// recently destroyed id when one is available.
    ///
    /// # Panics
    /// Panics when the store is at capacity.
    pub fn create_entity(&mut self) -> Entity {
        if let Some(id) = self.removed.pop() {
            self.place_created(id);
            return id;
        }
        if self.next_entity == 0 {
            let words = (self.components.len() + 31) / 32;
            if self.archetypes.register_empty(words) {
                self.offer_archetype(ArchetypeId::EMPTY);
            }
        }
        assert!(
            self.next_entity != self.max_entities,
            "entity capacity {} exhausted",
            self.max_entities
        );
        let id = self.next_entity;
        self.next_entity += 1;
        self.place_created(id);
        id
    }

    fn place_created(&mut self, id: Entity) {
        let index = id as usize;
        if index >= self.current.len() {
            self.current.resize(index + 1, ArchetypeId::EMPTY);
            self.pending.resize(index + 1, ArchetypeId::EMPTY);
        }
        self.current[index] = ArchetypeId::EMPTY;
        self.pending[index] = ArchetypeId::EMPTY;
        self.archetypes.get_mut(ArchetypeId::EMPTY).insert(id);
        query::mark_dirty(
            &mut self.queries,
            self.archetypes.get(ArchetypeId::EMPTY).mask(),
        );
    }

    /// Destroy `entity` under the store's default mutation mode.
    ///
    /// # Panics
    /// Panics (in immediate mode) if `entity` was never allocated.
    /// Destroying an already-destroyed entity is a no-op.
    pub fn destroy_entity(&mut self, entity: Entity) {
        self.destroy_entity_with(entity, self.default_defer);
    }

    /// Destroy `entity` under an explicit mutation mode.
    ///
    /// The deferred path only queues the id; the entity stays fully
    /// active and queryable until the next flush barrier.
    ///
    /// # Panics
    /// Panics (in immediate mode) if `entity` was never allocated.
    pub fn destroy_entity_with(&mut self, entity: Entity, defer: Defer) {
        match defer {
            Defer::Deferred => self.to_destroy.add(entity),
            Defer::Immediate => {
                let arch = self.current[entity as usize];
                self.archetypes.get_mut(arch).remove(entity);
                query::mark_dirty(&mut self.queries, self.archetypes.get(arch).mask());
                // An immediate destroy also cancels a queued deferred one.
                self.to_destroy.remove(entity);
                self.removed.add(entity);
            }
        }
    }

    /// Attach `component` to `entity` under the store's default mode.
    ///
    /// # Panics
    /// Panics if `entity` is not live.
    pub fn add_component(&mut self, entity: Entity, component: ComponentId) {
        self.set_component(entity, component, true, self.default_defer);
    }

    /// Attach `component` to `entity` under an explicit mode.
    ///
    /// # Panics
    /// Panics if `entity` is not live.
    pub fn add_component_with(&mut self, entity: Entity, component: ComponentId, defer: Defer) {
        self.set_component(entity, component, true, defer);
    }

    /// Detach `component` from `entity` under the store's default mode.
    ///
    /// # Panics
    /// Panics if `entity` is not live.
    pub fn remove_component(&mut self, entity: Entity, component: ComponentId) {
        self.set_component(entity, component, false, self.default_defer);
    }

    /// Detach `component` from `entity` under an explicit mode.
    ///
    /// # Panics
    /// Panics if `entity` is not live.
    pub fn remove_component_with(&mut self, entity: Entity, component: ComponentId, defer: Defer) {
        self.set_component(entity, component, false, defer);
    }

    /// Shared add/remove path. `target` is the desired presence bit.
    ///
    /// Immediate mode moves the entity across the one-bit transition when
    /// the bit differs; deferred mode only queues the id. In both modes
    /// the pending-target archetype is advanced eagerly, so a burst of
    /// deferred calls accumulates onto one final destination.
    fn set_component(&mut self, entity: Entity, component: ComponentId, target: bool, defer: Defer) {
        assert!(self.is_live(entity), "invalid entity id {entity}");
        let bit = component.as_raw();
        match defer {
            Defer::Deferred => self.to_update.add(entity),
            Defer::Immediate => {
                let from = self.current[entity as usize];
                if self.archetypes.get(from).mask().get(bit) != target {
                    self.archetypes.get_mut(from).remove(entity);
                    let to = self.transition(from, bit);
                    self.current[entity as usize] = to;
                    self.archetypes.get_mut(to).insert(entity);
                    query::mark_dirty(&mut self.queries, self.archetypes.get(from).mask());
                    query::mark_dirty(&mut self.queries, self.archetypes.get(to).mask());
                }
            }
        }
        let pending = self.pending[entity as usize];
        if self.archetypes.get(pending).mask().get(bit) != target {
            self.pending[entity as usize] = self.transition(pending, bit);
        }
    }

    /// Resolve the one-bit toggle of `bit` away from `from`, consulting
    /// the adjacency cache first.
    fn transition(&mut self, from: ArchetypeId, bit: u32) -> ArchetypeId {
        if let Some(to) = self.archetypes.get(from).edge(bit) {
            return to;
        }
        let mut mask = self.archetypes.get(from).mask().clone();
        mask.toggle(bit);
        let to = match self.archetypes.lookup(&mask) {
            Some(to) => to,
            None => {
                let to = self.archetypes.insert(mask);
                self.offer_archetype(to);
                to
            }
        };
        self.archetypes.get_mut(from).set_edge(bit, to);
        to
    }

    /// Offer a newly registered archetype to every live query.
    fn offer_archetype(&mut self, id: ArchetypeId) {
        let mask = self.archetypes.get(id).mask();
        for state in &mut self.queries {
            if state.tree.matches(mask) {
                state.archetypes.push(id);
            }
        }
    }

    // ==================== Flush barriers ====================

    /// Drain the deferred-destroy queue, destroying each queued entity.
    pub fn destroy_pending(&mut self) {
        if !self.to_destroy.is_empty() {
            tracing::debug!("flushing {} deferred destroys", self.to_destroy.len());
        }
        while let Some(id) = self.to_destroy.first() {
            self.destroy_entity_with(id, Defer::Immediate);
        }
    }

    /// Drain the deferred-update queue, moving each still-live entity to
    /// its pending-target archetype in one step.
    pub fn update_pending(&mut self) {
        let ids = self.to_update.take_packed();
        if !ids.is_empty() {
            tracing::debug!("flushing {} deferred updates", ids.len());
        }
        for id in ids {
            if !self.is_live(id) {
                continue;
            }
            let from = self.current[id as usize];
            let to = self.pending[id as usize];
            self.archetypes.get_mut(from).remove(id);
            self.current[id as usize] = to;
            self.archetypes.get_mut(to).insert(id);
            query::mark_dirty(&mut self.queries, self.archetypes.get(from).mask());
            query::mark_dirty(&mut self.queries, self.archetypes.get(to).mask());
        }
    }

    /// Run every registered system in registration order, then flush the
    /// destroy queue and the update queue.
    ///
    /// This is the synchronization barrier that makes deferred mutation
    /// safe to issue from inside systems while they iterate queries.
    pub fn update(&mut self, dt: f32) {
        let mut systems = std::mem::take(&mut self.systems);
        for system in &mut systems {
            system.update(self, dt);
        }
        // Systems registered during the tick run from the next one.
        systems.append(&mut self.systems);
        self.systems = systems;

        self.destroy_pending();
        self.update_pending();
    }

    /// Register a system to run on every [`update`](Self::update).
    pub fn register_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    /// Destroy every entity and reset id allocation, keeping the schema,
    /// archetype graph, and registered queries.
    pub fn clear_entities(&mut self) {
        for id in 0..self.next_entity {
            self.destroy_entity_with(id, Defer::Immediate);
        }
        self.removed.clear();
        self.next_entity = 0;
    }

    // ==================== Queries ====================

    /// Register a query over the ANDed expression list.
    ///
    /// The query is matched against every existing archetype once;
    /// afterwards newly created archetypes are pushed to it on creation.
    pub fn create_query(&mut self, exprs: Vec<Expr>) -> QueryId {
        let mut state = QueryState::new(MaskNode::compile(&exprs));
        for id in self.archetypes.registered() {
            if state.tree.matches(self.archetypes.get(id).mask()) {
                state.archetypes.push(id);
            }
        }
        let id = QueryId::from_raw(self.queries.len() as u32);
        tracing::trace!(
            "registered query {:?} matching {} archetypes",
            id,
            state.archetypes.len()
        );
        self.queries.push(state);
        id
    }

    /// The matching entities, cached: archetypes in registration order,
    /// entities in reverse packed order within each. Rebuilt only when a
    /// structural change has touched a matching archetype.
    ///
    /// # Panics
    /// Panics if `query` belongs to a different store.
    pub fn query_entities(&mut self, query: QueryId) -> &[Entity] {
        let state = &mut self.queries[query.as_raw() as usize];
        if state.dirty {
            state.entities.clear();
            for &arch in &state.archetypes {
                state
                    .entities
                    .extend(self.archetypes.get(arch).entities().iter().rev());
            }
            state.dirty = false;
        }
        &state.entities
    }

    /// Iterate the matching entities without touching the cache:
    /// archetypes in registration order, entities in packed order.
    ///
    /// # Panics
    /// Panics if `query` belongs to a different store.
    pub fn iter_query(&self, query: QueryId) -> impl Iterator<Item = Entity> + '_ {
        self.queries[query.as_raw() as usize]
            .archetypes
            .iter()
            .flat_map(|&arch| self.archetypes.get(arch).entities().iter().copied())
    }

    /// Visit every matching live entity, then flush both deferred
    /// queues.
    ///
    /// Entities are visited in reverse packed order per archetype, which
    /// keeps iteration stable when the callback destroys the entity it
    /// is visiting. Immediately destroying or moving *other* matching
    /// entities mid-pass can skip or revisit members; route those
    /// through the deferred queues instead.
    ///
    /// # Panics
    /// Panics if `query` belongs to a different store.
    pub fn for_each(&mut self, query: QueryId, mut f: impl FnMut(Entity, &mut Self)) {
        let archetypes = self.queries[query.as_raw() as usize].archetypes.clone();
        for arch in archetypes {
            let mut index = self.archetypes.get(arch).len();
            while index > 0 {
                index -= 1;
                let entities = self.archetypes.get(arch).entities();
                if index >= entities.len() {
                    continue;
                }
                let entity = entities[index];
                f(entity, self);
            }
        }
        self.destroy_pending();
        self.update_pending();
    }

    // ==================== Introspection ====================

    /// The fixed entity capacity.
    #[must_use]
    pub fn max_entities(&self) -> u32 {
        self.max_entities
    }

    /// The store-wide default mutation mode.
    #[must_use]
    pub fn default_defer(&self) -> Defer {
        self.default_defer
    }

    /// Allocation high-water mark: every id below it has been handed out
    /// at least once.
    #[must_use]
    pub fn next_entity_id(&self) -> Entity {
        self.next_entity
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.next_entity as usize - self.removed.len()
    }

    /// Whether `entity` is allocated and not destroyed.
    #[must_use]
    pub fn is_live(&self, entity: Entity) -> bool {
        entity < self.next_entity && !self.removed.has(entity)
    }

    /// Destroyed ids awaiting reuse, in packed order.
    #[must_use]
    pub fn removed_entities(&self) -> &[Entity] {
        self.removed.packed()
    }

    /// Live ids in ascending order.
    pub fn live_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        (0..self.next_entity).filter(|&id| !self.removed.has(id))
    }

    /// The archetype `entity` currently belongs to.
    ///
    /// # Panics
    /// Panics if `entity` was never allocated.
    #[must_use]
    pub fn archetype_of(&self, entity: Entity) -> &Archetype {
        self.archetypes.get(self.current[entity as usize])
    }

    /// The archetype graph.
    #[must_use]
    pub fn archetypes(&self) -> &ArchetypeGraph {
        &self.archetypes
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("capacity", &self.max_entities)
            .field("entities", &self.entity_count())
            .field("components", &self.components.len())
            .field("archetypes", &self.archetypes.len())
            .field("queries", &self.queries.len())
            .field("systems", &self.systems.len())
            .finish_non_exhaustive()
    }
}
