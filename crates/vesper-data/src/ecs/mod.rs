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

//! Implements the engine's entity-component-system container.
//!
//! The design follows the packed-pool model: each registered component type
//! owns one contiguous byte pool plus an `entity → offset` index map, each
//! entity carries a bitmask of the component types it holds, and each system
//! maintains a dense two-way index of the entities matching its component
//! requirement. Dispatch walks systems in priority order and hands each one
//! its dense entity list, so iteration stays cache-friendly.
//!
//! All of it is single-threaded and cooperative: one caller thread drives
//! every mutation, and no operation suspends.
//!
//! The primary entry point for interacting with the ECS is the [`World`]
//! struct.

mod bitset;
mod component;
mod entity_store;
mod error;
mod pool;
mod registry;
mod requirement;
mod serialization;
mod storage;
mod systems;
mod world;

pub use bitset::ComponentMask;
pub use component::{Component, System};
pub use error::EcsError;
pub use registry::{ComponentRegistry, ComponentTypeId, SystemId, SystemRegistry};
pub use requirement::RequirementSet;
pub use serialization::DecodeError;
pub use systems::{InsertFn, SystemFn, ToggleId};
pub use vesper_core::ecs::EntityId;
pub use world::World;

#[cfg(test)]
mod tests;
