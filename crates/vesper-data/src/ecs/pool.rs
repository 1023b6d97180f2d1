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

//! The packed, type-erased byte pool backing one component type.
//!
//! A pool never sees concrete component types: records arrive and leave as
//! byte slices produced by the [`ByteCodec`](vesper_core::codec::ByteCodec)
//! contract. Trivial pools store fixed-stride records; complex pools prefix
//! every record with its `u32` body length. Offset 0 always holds the
//! sentinel record (an encoded default) that reads fall back to on access
//! errors.
//!
//! Removal compacts the pool by left-shifting the tail and patching every
//! surviving offset, so iteration over a pool never crosses a gap. Shared
//! slots are reference-counted: while more than one entity maps to an
//! offset, removal only clears the departing entity's mapping and
//! overwrites detach copy-on-write.

use std::collections::HashMap;

use vesper_core::codec::{read_len_prefix, resize_record, LEN_PREFIX};

/// Index-map sentinel meaning "entity does not hold this component".
pub(crate) const ABSENT: u32 = u32::MAX;

#[derive(Debug, Default)]
pub(crate) struct ComponentPool {
    /// Fixed record size for trivial pools; 0 marks a complex pool.
    pub(crate) stride: usize,
    /// Packed records, sentinel first.
    pub(crate) bytes: Vec<u8>,
    /// Entity index → byte offset of its record.
    pub(crate) index: Vec<u32>,
    /// Offset → holder count, tracked only while a slot is aliased (> 1).
    pub(crate) shares: HashMap<u32, u32>,
}

impl ComponentPool {
    /// Creates a pool whose sentinel is `sentinel_record` (a full record,
    /// prefix included for complex pools), with index rows for
    /// `entity_count` existing entities.
    pub fn new(stride: usize, sentinel_record: Vec<u8>, entity_count: usize) -> Self {
        Self {
            stride,
            bytes: sentinel_record,
            index: vec![ABSENT; entity_count],
            shares: HashMap::new(),
        }
    }

    /// Grows the index map to cover `entity_count` entities.
    pub fn ensure_entities(&mut self, entity_count: usize) {
        if self.index.len() < entity_count {
            self.index.resize(entity_count, ABSENT);
        }
    }

    pub fn offset_of(&self, entity: u32) -> u32 {
        self.index.get(entity as usize).copied().unwrap_or(ABSENT)
    }

    pub fn contains(&self, entity: u32) -> bool {
        self.offset_of(entity) != ABSENT
    }

    /// Full size in bytes of the record at `offset`, prefix included.
    pub fn record_size(&self, offset: u32) -> usize {
        if self.stride != 0 {
            self.stride
        } else {
            LEN_PREFIX + read_len_prefix(&self.bytes, offset as usize)
        }
    }

    /// Offset of the record *body* (where the value decodes from).
    pub fn body_offset(&self, offset: u32) -> usize {
        if self.stride != 0 {
            offset as usize
        } else {
            offset as usize + LEN_PREFIX
        }
    }

    fn record_bytes(&self, offset: u32) -> &[u8] {
        let start = offset as usize;
        &self.bytes[start..start + self.record_size(offset)]
    }

    fn push_record(&mut self, record: &[u8]) -> u32 {
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(record);
        offset
    }

    /// Appends a record for `entity`. The caller has already verified the
    /// entity holds nothing in this pool.
    pub fn insert(&mut self, entity: u32, record: &[u8]) -> u32 {
        let offset = self.push_record(record);
        self.ensure_entities(entity as usize + 1);
        self.index[entity as usize] = offset;
        offset
    }

    /// Removes `entity`'s record and returns a copy of its bytes.
    ///
    /// If the slot is aliased, only the departing entity's mapping is
    /// cleared; the bytes stay in place for the remaining holders.
    /// Otherwise the tail of the pool shifts left over the vacated range
    /// and every surviving offset greater than the removed one is patched.
    pub fn remove(&mut self, entity: u32) -> Vec<u8> {
        let offset = self.index[entity as usize];
        let record = self.record_bytes(offset).to_vec();
        self.index[entity as usize] = ABSENT;

        if self.detach_alias(offset) {
            return record;
        }

        let start = offset as usize;
        self.bytes.drain(start..start + record.len());
        self.shift_offsets_after(offset, -(record.len() as isize));
        record
    }

    /// Overwrites `entity`'s record with `record` (full bytes, prefix
    /// included for complex pools), honouring copy-on-write for aliased
    /// slots and shifting the pool when a complex record changes length.
    pub fn set(&mut self, entity: u32, record: &[u8]) {
        let offset = self.index[entity as usize];

        if self.detach_alias(offset) {
            // Copy-on-write: the other holders keep the old bytes.
            self.index[entity as usize] = self.push_record(record);
            return;
        }

        let old_size = self.record_size(offset);
        let start = offset as usize;
        if record.len() == old_size {
            self.bytes[start..start + old_size].copy_from_slice(record);
        } else {
            let delta = resize_record(&mut self.bytes, start, record.len() - LEN_PREFIX);
            self.bytes[start..start + record.len()].copy_from_slice(record);
            self.shift_offsets_after(offset, delta);
        }
    }

    /// Points `dst` at `src`'s record and bumps the holder count.
    pub fn share(&mut self, dst: u32, src: u32) {
        let offset = self.index[src as usize];
        self.ensure_entities(dst as usize + 1);
        self.index[dst as usize] = offset;
        *self.shares.entry(offset).or_insert(1) += 1;
    }

    /// Drops one holder from an aliased slot. Returns true when the slot
    /// was aliased (and therefore must not be compacted or overwritten).
    fn detach_alias(&mut self, offset: u32) -> bool {
        let Some(count) = self.shares.get_mut(&offset) else {
            return false;
        };
        *count -= 1;
        if *count <= 1 {
            self.shares.remove(&offset);
        }
        true
    }

    fn shift_offsets_after(&mut self, offset: u32, delta: isize) {
        for slot in &mut self.index {
            if *slot != ABSENT && *slot > offset {
                *slot = (*slot as isize + delta) as u32;
            }
        }
        if !self.shares.is_empty() {
            self.shares = self
                .shares
                .iter()
                .map(|(&off, &count)| {
                    if off > offset {
                        ((off as isize + delta) as u32, count)
                    } else {
                        (off, count)
                    }
                })
                .collect();
        }
    }

    /// Truncates the pool back to its sentinel and clears every mapping.
    pub fn clear(&mut self) {
        let sentinel = self.record_size(0);
        self.bytes.truncate(sentinel);
        self.index.clear();
        self.shares.clear();
    }
}
