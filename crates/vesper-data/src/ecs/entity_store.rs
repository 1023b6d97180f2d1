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

//! Internal entity storage and id management.

use vesper_core::ecs::EntityId;

use crate::ecs::bitset::ComponentMask;

/// The per-entity record: which component types it holds, plus the liveness
/// and activation flags that the rest of the container keys off.
#[derive(Debug, Default, Clone)]
pub(crate) struct EntityRecord {
    /// One bit per registered component type.
    pub(crate) mask: ComponentMask,
    /// False once the id has been recycled onto the free list.
    pub(crate) alive: bool,
    /// The built-in activation toggle; inactive entities keep their
    /// components but drop out of every system's dense index.
    pub(crate) active: bool,
}

/// Internal manager for entity slots, recycling, and component masks.
///
/// The store maintains a dense list of records indexed by entity id. Freed
/// ids go onto a free list kept sorted in descending order so that `pop`
/// always hands back the lowest recycled id first.
#[derive(Debug, Default)]
pub(crate) struct EntityStore {
    pub(crate) records: Vec<EntityRecord>,
    /// Sorted descending; `pop()` yields the lowest freed index.
    pub(crate) free: Vec<u32>,
    pub(crate) alive_count: usize,
}

impl EntityStore {
    /// Allocates a new or recycled entity id with a cleared mask and both
    /// flags set.
    pub fn create(&mut self) -> EntityId {
        let index = match self.free.pop() {
            Some(index) => {
                let record = &mut self.records[index as usize];
                record.mask.clear_all();
                record.alive = true;
                record.active = true;
                index
            }
            None => {
                let index = self.records.len() as u32;
                self.records.push(EntityRecord {
                    mask: ComponentMask::new(),
                    alive: true,
                    active: true,
                });
                index
            }
        };
        self.alive_count += 1;
        EntityId::new(index)
    }

    /// Clears the record and pushes the id onto the free list.
    ///
    /// Returns false (without touching anything) if the id is out of range
    /// or already dead.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(record) = self.records.get_mut(id.index as usize) else {
            return false;
        };
        if !record.alive {
            return false;
        }

        record.mask.clear_all();
        record.alive = false;
        record.active = false;
        self.alive_count -= 1;

        // Keep the free list sorted descending so the lowest id pops first.
        let pos = self
            .free
            .binary_search_by(|probe| id.index.cmp(probe))
            .unwrap_or_else(|pos| pos);
        self.free.insert(pos, id.index);
        true
    }

    pub fn alive(&self, id: EntityId) -> bool {
        self.records
            .get(id.index as usize)
            .map(|r| r.alive)
            .unwrap_or(false)
    }

    pub fn active(&self, id: EntityId) -> bool {
        self.records
            .get(id.index as usize)
            .map(|r| r.alive && r.active)
            .unwrap_or(false)
    }

    pub fn set_active(&mut self, id: EntityId, active: bool) {
        if let Some(record) = self.records.get_mut(id.index as usize) {
            if record.alive {
                record.active = active;
            }
        }
    }

    pub fn mask(&self, id: EntityId) -> Option<&ComponentMask> {
        self.records
            .get(id.index as usize)
            .filter(|r| r.alive)
            .map(|r| &r.mask)
    }

    /// Flips the component-presence bit for `type_bit` on `id`.
    pub fn set_bit(&mut self, id: EntityId, type_bit: u32, value: bool) {
        if let Some(record) = self.records.get_mut(id.index as usize) {
            if value {
                record.mask.set(type_bit);
            } else {
                record.mask.clear(type_bit);
            }
        }
    }

    /// Total number of entity slots ever created (alive and recycled).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Recycles every entity at once.
    pub fn clear(&mut self) {
        self.records.clear();
        self.free.clear();
        self.alive_count = 0;
    }
}
