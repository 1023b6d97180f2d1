// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::any::Any;
use std::cell::Cell;

use vesper_core::codec::encode_to_vec;
use vesper_core::ecs::EntityId;

use crate::ecs::component::{Component, System};
use crate::ecs::entity_store::EntityStore;
use crate::ecs::error::EcsError;
use crate::ecs::registry::{ComponentRegistry, ComponentTypeId, SystemId, SystemRegistry};
use crate::ecs::requirement::RequirementSet;
use crate::ecs::storage::ComponentStorage;
use crate::ecs::systems::{InsertFn, SystemFn, SystemManager, ToggleId};

/// The central container for the entire ECS, holding all entities,
/// components, and systems.
///
/// The `World` composes the registries, the entity store, the packed
/// component storage, and the system manager, and exposes the public
/// surface a client uses. All operations run on one thread; nothing
/// suspends or locks.
///
/// # Errors
///
/// The container never aborts. A failing operation records an [`EcsError`]
/// in a one-shot slot, then returns the affected pool's sentinel record
/// (reads) or does nothing (writes). Check [`take_error`] after a mutating
/// batch. With the `unchecked` cargo feature, presence and liveness checks
/// are skipped entirely and invalid handles are the caller's problem.
///
/// [`take_error`]: World::take_error
#[derive(Default)]
pub struct World {
    pub(crate) components: ComponentRegistry,
    pub(crate) system_types: SystemRegistry,
    pub(crate) entities: EntityStore,
    pub(crate) storage: ComponentStorage,
    pub(crate) systems: SystemManager,
    error: Cell<Option<EcsError>>,
}

impl World {
    /// Creates an empty world with no registered types.
    pub fn new() -> Self {
        Self::default()
    }

    // ---- errors ----

    pub(crate) fn fail(&self, error: EcsError) {
        self.error.set(Some(error));
    }

    /// Returns and clears the most recent error, if any.
    pub fn take_error(&self) -> Option<EcsError> {
        self.error.take()
    }

    // ---- registration ----

    /// Registers the component type `T`, creating its pool.
    ///
    /// Registration order determines ids and must match across processes
    /// that exchange serialized snapshots. Re-registering is harmless.
    pub fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        let id = self.components.register::<T>();
        if id.0 as usize == self.storage.len() {
            self.storage.register_pool::<T>(self.entities.len());
        }
        id
    }

    /// Creates the system of type `S` with the given static instance and
    /// dispatch priority, requiring the component tuple `R`.
    ///
    /// Lower priority dispatches earlier; ties break by creation order.
    /// All live entities whose masks cover the requirement are indexed
    /// immediately. Creating the same system type twice returns the
    /// original handle.
    pub fn register_system<S: System, R: RequirementSet>(
        &mut self,
        initial: S,
        priority: i32,
    ) -> SystemId {
        let Some(id) = self.system_types.register::<S>() else {
            return self.system_types.id_of::<S>().unwrap();
        };

        let mut requirement_ids = Vec::with_capacity(R::type_ids().len());
        let mut resolvable = true;
        for type_id in R::type_ids() {
            match self.components.id_of_raw(type_id) {
                Some(component_id) => requirement_ids.push(component_id),
                None => {
                    log::warn!(
                        "system {} requires an unregistered component type; it will match no entities",
                        std::any::type_name::<S>()
                    );
                    resolvable = false;
                }
            }
        }

        let state = encode_to_vec(&initial);
        let created = self
            .systems
            .register(priority, state, requirement_ids, resolvable);
        debug_assert_eq!(created, id);

        // Back-fill the dense index from the entities that already exist.
        for index in 0..self.entities.len() as u32 {
            self.refresh_entity(EntityId::new(index));
        }
        id
    }

    // ---- entity lifecycle ----

    /// Creates an entity, recycling the lowest freed id when one exists.
    pub fn create_entity(&mut self) -> EntityId {
        let entity = self.entities.create();
        self.storage.ensure_entities(self.entities.len());
        // Systems with an empty requirement pick the new entity up here.
        self.refresh_entity(entity);
        entity
    }

    /// Removes an entity: every component it holds is removed from its
    /// pool, every system drops it, and the id goes back on the free list.
    pub fn remove_entity(&mut self, entity: EntityId) {
        if !self.check(self.entities.alive(entity), EcsError::NoSuchEntity) {
            return;
        }
        for type_index in 0..self.storage.len() {
            self.storage
                .remove_raw(ComponentTypeId(type_index as u32), entity.index);
        }
        self.entities.remove(entity);
        self.systems.refresh_entity(entity.index, None);
    }

    /// Recycles every entity and truncates every pool, keeping the
    /// registered types and systems.
    pub fn clear_entities(&mut self) {
        self.entities.clear();
        self.storage.clear();
        self.systems.clear_entities();
    }

    /// True when `entity` is alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.alive(entity)
    }

    /// True when `entity` is alive and active.
    pub fn is_active(&self, entity: EntityId) -> bool {
        if !self.check(self.entities.alive(entity), EcsError::NoSuchEntity) {
            return false;
        }
        self.entities.active(entity)
    }

    /// Activates or deactivates an entity. Deactivation extracts it from
    /// every system's dense index but leaves all components intact.
    pub fn set_active(&mut self, entity: EntityId, active: bool) {
        if !self.check(self.entities.alive(entity), EcsError::NoSuchEntity) {
            return;
        }
        self.entities.set_active(entity, active);
        self.refresh_entity(entity);
    }

    // ---- components ----

    /// Attaches `value` to `entity`.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, value: T) {
        if !self.check(self.entities.alive(entity), EcsError::EntityDead) {
            return;
        }
        let Some(type_id) = self.component_id::<T>() else {
            return;
        };
        match self.storage.add(type_id, entity.index, &value) {
            Ok(()) => {
                self.entities.set_bit(entity, type_id.0, true);
                self.refresh_entity(entity);
            }
            Err(error) => self.fail(error),
        }
    }

    /// Reads `entity`'s component of type `T` (a decoded copy).
    ///
    /// On a dead entity or an absent component the error slot is set and
    /// the pool's sentinel record is returned instead.
    pub fn component<T: Component>(&self, entity: EntityId) -> T {
        let Some(type_id) = self.component_id::<T>() else {
            return T::default();
        };
        if !self.check(self.entities.alive(entity), EcsError::EntityDead) {
            return self.storage.sentinel(type_id);
        }
        match self.storage.get(type_id, entity.index) {
            Ok(value) => value,
            Err(error) => {
                self.fail(error);
                self.storage.sentinel(type_id)
            }
        }
    }

    /// Overwrites `entity`'s component of type `T`.
    ///
    /// Complex records may change length; the pool shifts and its offset
    /// table is patched. Overwriting a shared slot detaches it first, so
    /// the other holder keeps the old value.
    pub fn set_component<T: Component>(&mut self, entity: EntityId, value: T) {
        if !self.check(self.entities.alive(entity), EcsError::EntityDead) {
            return;
        }
        let Some(type_id) = self.component_id::<T>() else {
            return;
        };
        if let Err(error) = self.storage.set(type_id, entity.index, &value) {
            self.fail(error);
        }
    }

    /// Decodes `entity`'s component, applies `mutate`, and writes it back.
    pub fn update_component<T: Component>(&mut self, entity: EntityId, mutate: impl FnOnce(&mut T)) {
        if !self.check(self.entities.alive(entity), EcsError::EntityDead) {
            return;
        }
        let Some(type_id) = self.component_id::<T>() else {
            return;
        };
        match self.storage.get::<T>(type_id, entity.index) {
            Ok(mut value) => {
                mutate(&mut value);
                if let Err(error) = self.storage.set(type_id, entity.index, &value) {
                    self.fail(error);
                }
            }
            Err(error) => self.fail(error),
        }
    }

    /// Points `entity` at `source`'s record of type `T` without copying.
    ///
    /// The pool holds one record with two holders; removal by either side
    /// only clears that side's mapping.
    pub fn share_component<T: Component>(&mut self, entity: EntityId, source: EntityId) {
        let both_alive = self.entities.alive(entity) && self.entities.alive(source);
        if !self.check(both_alive, EcsError::NoSuchEntity) {
            return;
        }
        let Some(type_id) = self.component_id::<T>() else {
            return;
        };
        match self.storage.share(type_id, entity.index, source.index) {
            Ok(()) => {
                self.entities.set_bit(entity, type_id.0, true);
                self.refresh_entity(entity);
            }
            Err(error) => self.fail(error),
        }
    }

    /// True when `entity` holds a component of type `T`.
    pub fn contains_component<T: Component>(&self, entity: EntityId) -> bool {
        match self.components.id_of::<T>() {
            Some(type_id) => self.storage.contains(type_id, entity.index),
            None => false,
        }
    }

    /// Detaches and returns `entity`'s component of type `T`.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> T {
        let Some(type_id) = self.component_id::<T>() else {
            return T::default();
        };
        if !self.check(self.entities.alive(entity), EcsError::EntityDead) {
            return self.storage.sentinel(type_id);
        }
        match self.storage.remove(type_id, entity.index) {
            Ok(value) => {
                self.entities.set_bit(entity, type_id.0, false);
                self.refresh_entity(entity);
                value
            }
            Err(error) => {
                self.fail(error);
                self.storage.sentinel(type_id)
            }
        }
    }

    /// True when the component bit for `T` is set on `entity`.
    pub fn is_component_active<T: Component>(&self, entity: EntityId) -> bool {
        match self.components.id_of::<T>() {
            Some(type_id) => self
                .entities
                .mask(entity)
                .map(|mask| mask.is_set(type_id.0))
                .unwrap_or(false),
            None => false,
        }
    }

    /// Flips the component bit for `T` on `entity` without touching the
    /// pool record. Systems requiring `T` see the entity appear or vanish.
    pub fn set_component_active<T: Component>(&mut self, entity: EntityId, active: bool) {
        if !self.check(self.entities.alive(entity), EcsError::EntityDead) {
            return;
        }
        let Some(type_id) = self.component_id::<T>() else {
            return;
        };
        if !self.check(
            self.storage.contains(type_id, entity.index),
            EcsError::AccessMissing,
        ) {
            return;
        }
        self.entities.set_bit(entity, type_id.0, active);
        self.refresh_entity(entity);
    }

    // ---- systems ----

    /// Adds one function slot to every system and returns its global index.
    pub fn create_system_function(&mut self) -> usize {
        self.systems.create_slot()
    }

    /// Installs `f` in the given system's slot.
    pub fn set_function(&mut self, system: SystemId, slot: usize, f: SystemFn) {
        if !self.check(slot < self.systems.slot_count, EcsError::NoSuchSystemSlot) {
            return;
        }
        self.systems.set_function(system, slot, f);
    }

    /// Runs one function slot across every initialized system in dispatch
    /// order (ascending priority, then creation order).
    ///
    /// The order is snapshotted first, so systems created inside a running
    /// function do not dispatch until the next `run`.
    pub fn run(&mut self, slot: usize, data: &mut dyn Any) {
        if !self.check(slot < self.systems.slot_count, EcsError::NoSuchSystemSlot) {
            return;
        }
        let order = self.systems.dispatch.clone();
        for system in order {
            let f = {
                let record = &self.systems.systems[system.0 as usize];
                if !record.initialized {
                    continue;
                }
                let entry = &record.slots[slot];
                if !entry.active {
                    continue;
                }
                entry.current
            };
            f(self, system, data);
        }
    }

    /// Activates or deactivates one function slot (shadow-pointer swap).
    pub fn set_function_active(&mut self, system: SystemId, slot: usize, active: bool) {
        self.systems.set_slot_active(system, slot, active);
    }

    /// Flips one function slot.
    pub fn toggle_function(&mut self, system: SystemId, slot: usize) {
        self.systems.toggle_slot(system, slot);
    }

    /// Flips every function slot of a system.
    pub fn toggle_system(&mut self, system: SystemId) {
        self.systems.toggle_system(system);
    }

    /// Snapshot of the entities currently matching `system`, in dense
    /// (insertion) order.
    ///
    /// The copy is intentional: a system function may add or remove
    /// entities while iterating without its own list shrinking underneath
    /// the loop.
    pub fn system_entities(&self, system: SystemId) -> Vec<EntityId> {
        self.systems
            .systems
            .get(system.0 as usize)
            .map(|record| record.reverse.iter().map(|&e| EntityId::new(e)).collect())
            .unwrap_or_default()
    }

    /// Decodes the system's static instance.
    pub fn system_state<S: System>(&self, system: SystemId) -> S {
        match self.systems.systems.get(system.0 as usize) {
            Some(record) => S::decode(&record.state, 0),
            None => S::default(),
        }
    }

    /// Replaces the system's static instance.
    pub fn set_system_state<S: System>(&mut self, system: SystemId, state: S) {
        if let Some(record) = self.systems.systems.get_mut(system.0 as usize) {
            record.state = encode_to_vec(&state);
        }
    }

    /// Overrides the dense-index insertion function for one system.
    pub fn set_insert_function(&mut self, system: SystemId, f: InsertFn) {
        self.systems.set_insert_fn(system, f);
    }

    // ---- toggle groups ----

    /// Creates a named toggle group.
    pub fn create_toggle(&mut self, name: &str) -> ToggleId {
        self.systems.create_toggle(name)
    }

    /// Adds a `(system, slot)` pair to a toggle group.
    pub fn add_to_toggle(&mut self, toggle: ToggleId, system: SystemId, slot: usize) {
        self.systems.add_to_toggle(toggle, system, slot);
    }

    /// Flips every slot listed in the group in one operation.
    pub fn toggle(&mut self, toggle: ToggleId) {
        self.systems.fire_toggle(toggle);
    }

    // ---- internal plumbing ----

    /// Evaluates a guard, recording `error` when it fails. With the
    /// `unchecked` feature the guard is skipped and assumed to hold.
    fn check(&self, ok: bool, error: EcsError) -> bool {
        if cfg!(feature = "unchecked") {
            return true;
        }
        if !ok {
            self.fail(error);
        }
        ok
    }

    fn component_id<T: Component>(&self) -> Option<ComponentTypeId> {
        let id = self.components.id_of::<T>();
        if id.is_none() {
            log::warn!(
                "component type {} used before registration",
                std::any::type_name::<T>()
            );
            self.fail(EcsError::AccessMissing);
        }
        id
    }

    /// Reconciles one entity's membership across every system.
    pub(crate) fn refresh_entity(&mut self, entity: EntityId) {
        let mask = if self.entities.active(entity) {
            self.entities.mask(entity).cloned()
        } else {
            None
        };
        self.systems.refresh_entity(entity.index, mask.as_ref());
    }
}
