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

//! The closed error taxonomy of the ECS container.

use thiserror::Error;

/// Everything that can go wrong inside the container.
///
/// The container never aborts: a failing operation records one of these in
/// the world's one-shot error slot and either returns the pool's sentinel
/// record (reads) or does nothing (writes). [`World::take_error`] returns
/// and clears the slot; the `Display` impl is the human-readable
/// description.
///
/// [`World::take_error`]: crate::ecs::World::take_error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EcsError {
    /// `add_component` on an entity that already holds the type.
    #[error("component already present on entity")]
    AlreadyPresent,
    /// Component access on an entity that does not hold the type.
    #[error("accessed a component the entity does not hold")]
    AccessMissing,
    /// Component removal on an entity that does not hold the type.
    #[error("removed a component the entity does not hold")]
    RemoveMissing,
    /// Operation through a handle whose entity has been recycled.
    #[error("operation on a dead entity")]
    EntityDead,
    /// `run` against a function slot that was never created.
    #[error("no such system function slot")]
    NoSuchSystemSlot,
    /// Entity id outside the range of ever-created entities.
    #[error("no such entity")]
    NoSuchEntity,
    /// Reserved for a future archetype storage mode.
    #[cfg(feature = "archetypes")]
    #[error("archetype storage unavailable")]
    ArchetypeUnavailable,
}
