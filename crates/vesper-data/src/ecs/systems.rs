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

//! Internal system bookkeeping: static-instance blobs, function slots,
//! dense entity indexes, dispatch order, and toggle groups.
//!
//! Each system keeps an `entity → dense position` map plus a dense reverse
//! map of the entities matching its requirement. Insertion pushes at the
//! tail; extraction swaps the last entry into the vacated slot and pops,
//! so both are O(1) and iteration walks a contiguous array.
//!
//! Function slots hold a live pointer and a shadow pointer. Deactivation
//! swaps the two and flips the active flag, so a second toggle restores the
//! original behaviour without any external bookkeeping. A bare
//! `Option<fn>` would lose the pointer on reactivation.

use std::any::Any;

use crate::ecs::bitset::ComponentMask;
use crate::ecs::pool::ABSENT;
use crate::ecs::registry::{ComponentTypeId, SystemId};
use crate::ecs::world::World;

/// The signature of a user-installed system function.
///
/// Dispatch hands the function the container, the system it runs as, and
/// the opaque per-call user data passed to [`World::run`].
pub type SystemFn = fn(&mut World, SystemId, &mut dyn Any);

/// The signature of a per-system dense-index insertion override.
///
/// The default pushes at the tail. An override (e.g. to keep the dense
/// list sorted) must preserve the two-way mapping:
/// `reverse[index[e]] == e` for every inserted entity.
pub type InsertFn = fn(index: &mut Vec<u32>, reverse: &mut Vec<u32>, entity: u32);

/// Identifier of a toggle group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToggleId(pub u32);

fn noop(_: &mut World, _: SystemId, _: &mut dyn Any) {}

pub(crate) fn tail_insert(index: &mut Vec<u32>, reverse: &mut Vec<u32>, entity: u32) {
    if entity as usize >= index.len() {
        index.resize(entity as usize + 1, ABSENT);
    }
    index[entity as usize] = reverse.len() as u32;
    reverse.push(entity);
}

/// One function slot: the live pointer, its shadow, and the active flag.
#[derive(Clone, Copy)]
pub(crate) struct FunctionSlot {
    pub(crate) current: SystemFn,
    pub(crate) shadow: SystemFn,
    pub(crate) active: bool,
}

impl FunctionSlot {
    pub(crate) fn unset() -> Self {
        Self {
            current: noop,
            shadow: noop,
            active: true,
        }
    }
}

pub(crate) struct SystemRecord {
    pub(crate) priority: i32,
    pub(crate) initialized: bool,
    /// The system's static instance, held serialized.
    pub(crate) state: Vec<u8>,
    pub(crate) requirement_ids: Vec<ComponentTypeId>,
    pub(crate) requirement: ComponentMask,
    /// False when a requirement named an unregistered type; such a system
    /// never matches anything.
    pub(crate) resolvable: bool,
    pub(crate) slots: Vec<FunctionSlot>,
    pub(crate) insert_fn: InsertFn,
    /// Entity index → dense position.
    pub(crate) index: Vec<u32>,
    /// Dense position → entity index.
    pub(crate) reverse: Vec<u32>,
}

impl SystemRecord {
    fn matches(&self, mask: &ComponentMask) -> bool {
        self.resolvable && mask.covers(&self.requirement)
    }

    fn dense_position(&self, entity: u32) -> Option<u32> {
        self.index
            .get(entity as usize)
            .copied()
            .filter(|&pos| pos != ABSENT)
    }

    fn extract(&mut self, entity: u32) {
        let Some(pos) = self.dense_position(entity) else {
            return;
        };
        let last = *self.reverse.last().unwrap();
        self.reverse.swap_remove(pos as usize);
        if last != entity {
            self.index[last as usize] = pos;
        }
        self.index[entity as usize] = ABSENT;
    }
}

/// Internal manager for every registered system.
#[derive(Default)]
pub(crate) struct SystemManager {
    pub(crate) systems: Vec<SystemRecord>,
    /// Dispatch order: ascending priority, ties broken by ascending id.
    pub(crate) dispatch: Vec<SystemId>,
    /// Function slots are numbered globally across all systems.
    pub(crate) slot_count: usize,
    pub(crate) toggles: Vec<(String, Vec<(SystemId, usize)>)>,
}

impl SystemManager {
    /// Registers a system record and splices it into the dispatch order.
    pub fn register(
        &mut self,
        priority: i32,
        state: Vec<u8>,
        requirement_ids: Vec<ComponentTypeId>,
        resolvable: bool,
    ) -> SystemId {
        let id = SystemId(self.systems.len() as u32);

        let mut requirement = ComponentMask::new();
        for type_id in &requirement_ids {
            requirement.set(type_id.0);
        }

        self.systems.push(SystemRecord {
            priority,
            initialized: true,
            state,
            requirement_ids,
            requirement,
            resolvable,
            slots: vec![FunctionSlot::unset(); self.slot_count],
            insert_fn: tail_insert,
            index: Vec::new(),
            reverse: Vec::new(),
        });

        let key = (priority, id.0);
        let pos = self
            .dispatch
            .binary_search_by(|probe| {
                let record = &self.systems[probe.0 as usize];
                (record.priority, probe.0).cmp(&key)
            })
            .unwrap_or_else(|pos| pos);
        self.dispatch.insert(pos, id);

        id
    }

    /// Adds one function slot to every system; returns the new global index.
    pub fn create_slot(&mut self) -> usize {
        for record in &mut self.systems {
            record.slots.push(FunctionSlot::unset());
        }
        let slot = self.slot_count;
        self.slot_count += 1;
        slot
    }

    pub fn set_function(&mut self, system: SystemId, slot: usize, f: SystemFn) {
        let Some(record) = self.systems.get_mut(system.0 as usize) else {
            return;
        };
        let Some(entry) = record.slots.get_mut(slot) else {
            return;
        };
        // While deactivated the live pointer sits in the shadow position;
        // write there so the next toggle surfaces the new function.
        if entry.active {
            entry.current = f;
        } else {
            entry.shadow = f;
        }
    }

    pub fn set_slot_active(&mut self, system: SystemId, slot: usize, active: bool) {
        if let Some(record) = self.systems.get_mut(system.0 as usize) {
            if let Some(entry) = record.slots.get_mut(slot) {
                if entry.active != active {
                    std::mem::swap(&mut entry.current, &mut entry.shadow);
                    entry.active = active;
                }
            }
        }
    }

    pub fn toggle_slot(&mut self, system: SystemId, slot: usize) {
        let currently = self
            .systems
            .get(system.0 as usize)
            .and_then(|r| r.slots.get(slot))
            .map(|s| s.active);
        if let Some(active) = currently {
            self.set_slot_active(system, slot, !active);
        }
    }

    pub fn toggle_system(&mut self, system: SystemId) {
        for slot in 0..self.slot_count {
            self.toggle_slot(system, slot);
        }
    }

    pub fn set_insert_fn(&mut self, system: SystemId, f: InsertFn) {
        if let Some(record) = self.systems.get_mut(system.0 as usize) {
            record.insert_fn = f;
        }
    }

    /// Reconciles one entity's membership across every system.
    ///
    /// `mask` is `None` when the entity is dead or deactivated; otherwise
    /// it is the entity's current component mask.
    pub fn refresh_entity(&mut self, entity: u32, mask: Option<&ComponentMask>) {
        for record in &mut self.systems {
            let should = mask.map(|m| record.matches(m)).unwrap_or(false);
            let present = record.dense_position(entity).is_some();
            if should && !present {
                (record.insert_fn)(&mut record.index, &mut record.reverse, entity);
            } else if !should && present {
                record.extract(entity);
            }
        }
    }

    pub fn create_toggle(&mut self, name: &str) -> ToggleId {
        let id = ToggleId(self.toggles.len() as u32);
        self.toggles.push((name.to_string(), Vec::new()));
        id
    }

    pub fn add_to_toggle(&mut self, toggle: ToggleId, system: SystemId, slot: usize) {
        if let Some((_, entries)) = self.toggles.get_mut(toggle.0 as usize) {
            entries.push((system, slot));
        }
    }

    /// Flips every `(system, slot)` pair listed under `toggle` at once.
    pub fn fire_toggle(&mut self, toggle: ToggleId) {
        let entries = match self.toggles.get(toggle.0 as usize) {
            Some((_, entries)) => entries.clone(),
            None => return,
        };
        for (system, slot) in entries {
            self.toggle_slot(system, slot);
        }
    }

    /// Drops every entity from every dense index.
    pub fn clear_entities(&mut self) {
        for record in &mut self.systems {
            record.index.clear();
            record.reverse.clear();
        }
    }
}
