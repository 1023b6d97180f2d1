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

//! Whole-container serialization.
//!
//! The snapshot is the concatenation of the three owned sub-objects
//! (entity manager, component manager, system manager) behind a small
//! magic/version header, written entirely with the engine's own byte
//! codec. Both registries embed their id → type-name tables so a loader
//! that registered types in a different order fails loudly instead of
//! reinterpreting pools.
//!
//! The format is endianness-sensitive and carries no schema migration.
//! Function pointers are not serialized; after a load every slot holds the
//! no-op and the caller re-binds.

use std::collections::HashMap;

use thiserror::Error;
use vesper_core::codec::{append, ByteCodec};

use crate::ecs::bitset::ComponentMask;
use crate::ecs::entity_store::EntityRecord;
use crate::ecs::registry::{ComponentTypeId, SystemId};
use crate::ecs::systems::{tail_insert, FunctionSlot, SystemRecord};
use crate::ecs::world::World;

const MAGIC: u32 = 0x5650_534E; // "VPSN"
const FORMAT_VERSION: u32 = 1;

/// Why a snapshot failed to load.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream does not start with the snapshot magic/version.
    #[error("not a container snapshot (bad magic or version)")]
    BadHeader,
    /// The stream ended before a section was complete.
    #[error("snapshot truncated at byte {offset}")]
    Truncated {
        /// Byte offset the reader had reached.
        offset: usize,
    },
    /// The loader registered a different number of types than the writer.
    #[error("snapshot carries {found} {kind} types, registry has {expected}")]
    CountMismatch {
        /// Which registry disagreed.
        kind: &'static str,
        /// Types in the loader's registry.
        expected: usize,
        /// Types recorded in the snapshot.
        found: usize,
    },
    /// A recorded type disagrees with the loader's registration order.
    #[error("registry mismatch at id {id}: snapshot has {found}, registry has {expected}")]
    RegistryMismatch {
        /// The dense id at which the disagreement was found.
        id: u32,
        /// What the loader registered there.
        expected: String,
        /// What the snapshot recorded there.
        found: String,
    },
}

struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    fn put<T: ByteCodec>(&mut self, value: &T) {
        append(&mut self.bytes, value);
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    fn take<T: ByteCodec>(&mut self) -> Result<T, DecodeError> {
        let (value, consumed) =
            T::try_decode(self.bytes, self.cursor).ok_or(DecodeError::Truncated {
                offset: self.cursor,
            })?;
        self.cursor += consumed;
        Ok(value)
    }
}

impl World {
    /// Snapshots the whole container into a byte stream.
    pub fn serialize(&self) -> Vec<u8> {
        let mut w = Writer { bytes: Vec::new() };
        w.put(&MAGIC);
        w.put(&FORMAT_VERSION);

        // --- Section 1: entity manager ---
        w.put(&(self.entities.records.len() as u32));
        w.put(&self.entities.free);
        for record in &self.entities.records {
            w.put(&record.mask);
            w.put(&record.alive);
            w.put(&record.active);
        }

        // --- Section 2: component manager (registry table + pools) ---
        w.put(&(self.components.len() as u32));
        for info in self.components.iter() {
            w.put(&info.name);
            w.put(&(info.size as u32));
            w.put(&info.trivial);
        }
        for pool in &self.storage.pools {
            w.put(&(pool.stride as u32));
            w.put(&pool.bytes);
            w.put(&pool.index);

            let mut shares: Vec<(u32, u32)> = pool.shares.iter().map(|(&o, &c)| (o, c)).collect();
            shares.sort_unstable();
            let (offsets, counts): (Vec<u32>, Vec<u32>) = shares.into_iter().unzip();
            w.put(&offsets);
            w.put(&counts);
        }

        // --- Section 3: system manager ---
        w.put(&(self.systems.systems.len() as u32));
        w.put(&(self.systems.slot_count as u32));
        for (index, record) in self.systems.systems.iter().enumerate() {
            let name = self
                .system_types
                .name(SystemId(index as u32))
                .unwrap_or_default()
                .to_string();
            w.put(&name);
            w.put(&record.priority);
            w.put(&record.initialized);
            w.put(&record.state);
            w.put(&record.requirement_ids.iter().map(|t| t.0).collect::<Vec<u32>>());
            w.put(&record.resolvable);
            w.put(
                &record
                    .slots
                    .iter()
                    .map(|slot| slot.active)
                    .collect::<Vec<bool>>(),
            );
            w.put(&record.index);
            w.put(&record.reverse);
        }
        w.put(&self.systems.dispatch.iter().map(|s| s.0).collect::<Vec<u32>>());
        w.put(&(self.systems.toggles.len() as u32));
        for (name, entries) in &self.systems.toggles {
            w.put(name);
            w.put(&entries.iter().map(|(s, _)| s.0).collect::<Vec<u32>>());
            w.put(&entries.iter().map(|(_, slot)| *slot as u32).collect::<Vec<u32>>());
        }

        w.bytes
    }

    /// Loads a snapshot into this container, replacing its entire state.
    ///
    /// The caller must have registered the same component and system types
    /// in the same order as the writer. Function pointers are reset to the
    /// no-op; re-bind them (and any custom insertion functions) after the
    /// load.
    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        let mut r = Reader { bytes, cursor: 0 };
        if r.take::<u32>()? != MAGIC || r.take::<u32>()? != FORMAT_VERSION {
            return Err(DecodeError::BadHeader);
        }

        // --- Section 1: entity manager ---
        let entity_count = r.take::<u32>()? as usize;
        let free = r.take::<Vec<u32>>()?;
        let mut records = Vec::with_capacity(entity_count);
        let mut alive_count = 0;
        for _ in 0..entity_count {
            let mask = r.take::<ComponentMask>()?;
            let alive = r.take::<bool>()?;
            let active = r.take::<bool>()?;
            if alive {
                alive_count += 1;
            }
            records.push(EntityRecord { mask, alive, active });
        }

        // --- Section 2: component manager ---
        let component_count = r.take::<u32>()? as usize;
        if component_count != self.components.len() {
            return Err(DecodeError::CountMismatch {
                kind: "component",
                expected: self.components.len(),
                found: component_count,
            });
        }
        for id in 0..component_count as u32 {
            let name = r.take::<String>()?;
            let size = r.take::<u32>()? as usize;
            let trivial = r.take::<bool>()?;

            let info = self.components.info(ComponentTypeId(id)).unwrap();
            if info.name != name || info.size != size || info.trivial != trivial {
                return Err(DecodeError::RegistryMismatch {
                    id,
                    expected: info.name.clone(),
                    found: name,
                });
            }
        }

        struct LoadedPool {
            stride: usize,
            bytes: Vec<u8>,
            index: Vec<u32>,
            shares: HashMap<u32, u32>,
        }
        let mut pools = Vec::with_capacity(component_count);
        for _ in 0..component_count {
            let stride = r.take::<u32>()? as usize;
            let bytes = r.take::<Vec<u8>>()?;
            let index = r.take::<Vec<u32>>()?;
            let offsets = r.take::<Vec<u32>>()?;
            let counts = r.take::<Vec<u32>>()?;
            pools.push(LoadedPool {
                stride,
                bytes,
                index,
                shares: offsets.into_iter().zip(counts).collect(),
            });
        }

        // --- Section 3: system manager ---
        let system_count = r.take::<u32>()? as usize;
        if system_count != self.system_types.len() {
            return Err(DecodeError::CountMismatch {
                kind: "system",
                expected: self.system_types.len(),
                found: system_count,
            });
        }
        let slot_count = r.take::<u32>()? as usize;

        let mut systems = Vec::with_capacity(system_count);
        for id in 0..system_count as u32 {
            let name = r.take::<String>()?;
            let expected = self.system_types.name(SystemId(id)).unwrap_or_default();
            if expected != name {
                return Err(DecodeError::RegistryMismatch {
                    id,
                    expected: expected.to_string(),
                    found: name,
                });
            }

            let priority = r.take::<i32>()?;
            let initialized = r.take::<bool>()?;
            let state = r.take::<Vec<u8>>()?;
            let requirement_ids: Vec<ComponentTypeId> = r
                .take::<Vec<u32>>()?
                .into_iter()
                .map(ComponentTypeId)
                .collect();
            let resolvable = r.take::<bool>()?;
            let slot_active = r.take::<Vec<bool>>()?;
            let index = r.take::<Vec<u32>>()?;
            let reverse = r.take::<Vec<u32>>()?;

            let mut requirement = ComponentMask::new();
            for type_id in &requirement_ids {
                requirement.set(type_id.0);
            }

            let mut slots = vec![FunctionSlot::unset(); slot_count];
            for (slot, active) in slots.iter_mut().zip(slot_active) {
                slot.active = active;
            }

            systems.push(SystemRecord {
                priority,
                initialized,
                state,
                requirement_ids,
                requirement,
                resolvable,
                slots,
                insert_fn: tail_insert,
                index,
                reverse,
            });
        }

        let dispatch: Vec<SystemId> = r.take::<Vec<u32>>()?.into_iter().map(SystemId).collect();

        let toggle_count = r.take::<u32>()? as usize;
        let mut toggles = Vec::with_capacity(toggle_count);
        for _ in 0..toggle_count {
            let name = r.take::<String>()?;
            let toggle_systems = r.take::<Vec<u32>>()?;
            let toggle_slots = r.take::<Vec<u32>>()?;
            let entries = toggle_systems
                .into_iter()
                .zip(toggle_slots)
                .map(|(s, slot)| (SystemId(s), slot as usize))
                .collect();
            toggles.push((name, entries));
        }

        // Everything parsed; commit the new state.
        self.entities.records = records;
        self.entities.free = free;
        self.entities.alive_count = alive_count;
        for (pool, loaded) in self.storage.pools.iter_mut().zip(pools) {
            pool.stride = loaded.stride;
            pool.bytes = loaded.bytes;
            pool.index = loaded.index;
            pool.shares = loaded.shares;
        }
        self.systems.systems = systems;
        self.systems.dispatch = dispatch;
        self.systems.slot_count = slot_count;
        self.systems.toggles = toggles;

        log::debug!(
            "loaded container snapshot: {} entities, {} component types, {} systems",
            entity_count,
            component_count,
            system_count
        );
        Ok(())
    }
}
