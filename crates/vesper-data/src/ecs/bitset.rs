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

//! Implements a bitset for tracking which component types an entity holds.

use vesper_core::codec::ByteCodec;

/// A simple bitset wrapped around a `Vec<u64>`, indexed by component type id.
///
/// Each entity carries one mask; each system's requirement is expressed as
/// another. Membership checks then collapse to a bitwise coverage sweep
/// instead of set comparisons.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ComponentMask {
    pub(crate) bits: Vec<u64>,
}

impl ComponentMask {
    /// Creates a new, empty mask.
    pub fn new() -> Self {
        Self { bits: Vec::new() }
    }

    /// Sets the bit at the specified index to 1.
    pub fn set(&mut self, index: u32) {
        let word_idx = (index / 64) as usize;
        let bit_idx = index % 64;

        if word_idx >= self.bits.len() {
            self.bits.resize(word_idx + 1, 0);
        }

        self.bits[word_idx] |= 1 << bit_idx;
    }

    /// Clears the bit at the specified index to 0.
    pub fn clear(&mut self, index: u32) {
        let word_idx = (index / 64) as usize;
        let bit_idx = index % 64;

        if word_idx < self.bits.len() {
            self.bits[word_idx] &= !(1 << bit_idx);
        }
    }

    /// Returns true if the bit at the specified index is set.
    pub fn is_set(&self, index: u32) -> bool {
        let word_idx = (index / 64) as usize;
        let bit_idx = index % 64;

        if let Some(word) = self.bits.get(word_idx) {
            (word & (1 << bit_idx)) != 0
        } else {
            false
        }
    }

    /// Returns true if every bit set in `requirement` is also set in `self`.
    ///
    /// This single AND-sweep is what every system membership check reduces to.
    pub fn covers(&self, requirement: &ComponentMask) -> bool {
        for (word_idx, required) in requirement.bits.iter().enumerate() {
            let held = self.bits.get(word_idx).copied().unwrap_or(0);
            if held & required != *required {
                return false;
            }
        }
        true
    }

    /// Clears every bit.
    pub fn clear_all(&mut self) {
        self.bits.clear();
    }
}

impl ByteCodec for ComponentMask {
    const TRIVIAL: bool = false;

    fn encoded_len(&self) -> usize {
        self.bits.encoded_len()
    }

    fn encode(&self, stream: &mut [u8], offset: usize) -> usize {
        self.bits.encode(stream, offset)
    }

    fn decode(stream: &[u8], offset: usize) -> Self {
        Self {
            bits: Vec::<u64>::decode(stream, offset),
        }
    }

    fn try_decode(stream: &[u8], offset: usize) -> Option<(Self, usize)> {
        let (bits, consumed) = Vec::<u64>::try_decode(stream, offset)?;
        Some((Self { bits }, consumed))
    }
}
