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

//! Internal component storage: the typed façade over the byte pools.
//!
//! This is where concrete component types meet the type-erased pools. Every
//! value is encoded into a full record (length-prefixed for complex types)
//! before it reaches a pool, and decoded back out on the way up. Reads hand
//! back copies; the pools' backing `Vec<u8>` makes no alignment promise, so
//! references into them would be unsound.

use vesper_core::codec::{append, encode_to_vec, write_len_prefix, LEN_PREFIX};

use crate::ecs::component::Component;
use crate::ecs::error::EcsError;
use crate::ecs::pool::ComponentPool;
use crate::ecs::registry::ComponentTypeId;

/// Encodes `value` as a full pool record: raw bytes for trivial types, a
/// `u32` length prefix plus body for complex ones.
pub(crate) fn encode_record<T: Component>(value: &T) -> Vec<u8> {
    if T::TRIVIAL {
        encode_to_vec(value)
    } else {
        let body_len = value.encoded_len();
        let mut record = vec![0u8; LEN_PREFIX];
        write_len_prefix(&mut record, 0, body_len);
        append(&mut record, value);
        record
    }
}

/// Internal manager owning one [`ComponentPool`] per registered type.
#[derive(Debug, Default)]
pub(crate) struct ComponentStorage {
    pub(crate) pools: Vec<ComponentPool>,
}

impl ComponentStorage {
    /// Appends the pool for a freshly registered component type, with index
    /// rows for every entity that already exists.
    pub fn register_pool<T: Component>(&mut self, entity_count: usize) {
        let stride = if T::TRIVIAL {
            std::mem::size_of::<T>()
        } else {
            0
        };
        let sentinel = encode_record(&T::default());
        self.pools
            .push(ComponentPool::new(stride, sentinel, entity_count));
    }

    /// Grows every pool's index map to cover `entity_count` entities.
    pub fn ensure_entities(&mut self, entity_count: usize) {
        for pool in &mut self.pools {
            pool.ensure_entities(entity_count);
        }
    }

    fn pool(&self, type_id: ComponentTypeId) -> &ComponentPool {
        &self.pools[type_id.0 as usize]
    }

    fn pool_mut(&mut self, type_id: ComponentTypeId) -> &mut ComponentPool {
        &mut self.pools[type_id.0 as usize]
    }

    pub fn contains(&self, type_id: ComponentTypeId, entity: u32) -> bool {
        self.pool(type_id).contains(entity)
    }

    pub fn add<T: Component>(
        &mut self,
        type_id: ComponentTypeId,
        entity: u32,
        value: &T,
    ) -> Result<(), EcsError> {
        let pool = self.pool_mut(type_id);
        if pool.contains(entity) {
            return Err(EcsError::AlreadyPresent);
        }
        let record = encode_record(value);
        pool.insert(entity, &record);
        Ok(())
    }

    pub fn get<T: Component>(
        &self,
        type_id: ComponentTypeId,
        entity: u32,
    ) -> Result<T, EcsError> {
        let pool = self.pool(type_id);
        let offset = pool.offset_of(entity);
        if offset == super::pool::ABSENT {
            return Err(EcsError::AccessMissing);
        }
        Ok(T::decode(&pool.bytes, pool.body_offset(offset)))
    }

    /// Decodes the sentinel record at offset 0 of the type's pool.
    pub fn sentinel<T: Component>(&self, type_id: ComponentTypeId) -> T {
        let pool = self.pool(type_id);
        T::decode(&pool.bytes, pool.body_offset(0))
    }

    pub fn set<T: Component>(
        &mut self,
        type_id: ComponentTypeId,
        entity: u32,
        value: &T,
    ) -> Result<(), EcsError> {
        let pool = self.pool_mut(type_id);
        if !pool.contains(entity) {
            return Err(EcsError::AccessMissing);
        }
        let record = encode_record(value);
        pool.set(entity, &record);
        Ok(())
    }

    pub fn remove<T: Component>(
        &mut self,
        type_id: ComponentTypeId,
        entity: u32,
    ) -> Result<T, EcsError> {
        let pool = self.pool_mut(type_id);
        if !pool.contains(entity) {
            return Err(EcsError::RemoveMissing);
        }
        let record = pool.remove(entity);
        let body = if pool.stride != 0 { 0 } else { LEN_PREFIX };
        Ok(T::decode(&record, body))
    }

    /// Byte-level removal used when the concrete type is not at hand
    /// (entity teardown). Returns false when the entity holds nothing here.
    pub fn remove_raw(&mut self, type_id: ComponentTypeId, entity: u32) -> bool {
        let pool = self.pool_mut(type_id);
        if !pool.contains(entity) {
            return false;
        }
        pool.remove(entity);
        true
    }

    pub fn share(
        &mut self,
        type_id: ComponentTypeId,
        dst: u32,
        src: u32,
    ) -> Result<(), EcsError> {
        let pool = self.pool_mut(type_id);
        if !pool.contains(src) {
            return Err(EcsError::AccessMissing);
        }
        if dst == src {
            return Ok(());
        }
        // A destination that already holds the type gives its slot up first.
        if pool.contains(dst) {
            pool.remove(dst);
        }
        pool.share(dst, src);
        Ok(())
    }

    /// Number of pools (== number of registered component types).
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Truncates every pool back to its sentinel.
    pub fn clear(&mut self) {
        for pool in &mut self.pools {
            pool.clear();
        }
    }
}
