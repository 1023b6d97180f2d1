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

//! Defines core types related to entities in the ECS architecture.

use serde::{Deserialize, Serialize};

/// A unique identifier for an entity in the world.
///
/// Entity ids are recycled: removing an entity pushes its index onto a free
/// list and the lowest freed index is handed out again on the next create.
/// Liveness is tracked by the entity store, so operations through a stale
/// handle fail soft with a `NoSuchEntity`/`EntityDead` diagnostic rather
/// than touching a recycled slot's data.
#[repr(transparent)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    bytemuck::Pod,
    bytemuck::Zeroable,
)]
pub struct EntityId {
    /// The index of the entity's record in the central entity store.
    pub index: u32,
}

impl EntityId {
    /// Wraps a raw store index in an `EntityId`.
    pub const fn new(index: u32) -> Self {
        Self { index }
    }
}

crate::impl_trivial_codec!(EntityId);
