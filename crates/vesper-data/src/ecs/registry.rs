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

//! Container-level registries assigning dense ids to component and system
//! types.
//!
//! Registration is explicit and happens at container bootstrap: there are no
//! process-wide static counters, so id assignment is deterministic and the
//! id → name mapping can be embedded in serialized snapshots to detect a
//! loader registering types in a different order.

use std::any::TypeId;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ecs::component::{Component, System};

/// Dense identifier of a registered component type, assigned in
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentTypeId(pub u32);

/// Dense identifier of a registered system, assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SystemId(pub u32);

/// Everything the container records about one registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// The Rust type backing this id.
    pub type_id: TypeId,
    /// Fully-qualified type name, embedded in snapshots for mismatch checks.
    pub name: String,
    /// Fixed record size in bytes for trivially-copyable types, 0 for
    /// complex (variable-length) types.
    pub size: usize,
    /// True when records are raw memory copies at a fixed stride.
    pub trivial: bool,
}

/// A registry that maps component types to dense ids and layout metadata.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    infos: Vec<ComponentInfo>,
    by_type: HashMap<TypeId, ComponentTypeId>,
}

impl ComponentRegistry {
    /// Registers `T`, returning its dense id.
    ///
    /// Double registration is fail-soft: the existing id is returned and a
    /// warning is logged.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            log::warn!(
                "component type {} registered twice; keeping id {}",
                std::any::type_name::<T>(),
                existing.0
            );
            return existing;
        }

        let id = ComponentTypeId(self.infos.len() as u32);
        self.infos.push(ComponentInfo {
            type_id,
            name: std::any::type_name::<T>().to_string(),
            size: if T::TRIVIAL {
                std::mem::size_of::<T>()
            } else {
                0
            },
            trivial: T::TRIVIAL,
        });
        self.by_type.insert(type_id, id);
        log::debug!(
            "registered component type {} as id {}",
            std::any::type_name::<T>(),
            id.0
        );
        id
    }

    /// Looks up the dense id for `T`, if registered.
    pub fn id_of<T: Component>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Looks up the dense id for a raw [`TypeId`], if registered.
    pub fn id_of_raw(&self, type_id: TypeId) -> Option<ComponentTypeId> {
        self.by_type.get(&type_id).copied()
    }

    /// Returns the metadata recorded for `id`.
    pub fn info(&self, id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.infos.get(id.0 as usize)
    }

    /// Number of registered component types.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// True when no component type has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Iterates over the registered infos in id order.
    pub fn iter(&self) -> std::slice::Iter<'_, ComponentInfo> {
        self.infos.iter()
    }
}

/// The analogous registry for system types.
///
/// Systems are created once per type per container; re-registering returns
/// the existing id so the caller cannot accidentally double-dispatch.
#[derive(Debug, Default)]
pub struct SystemRegistry {
    names: Vec<String>,
    by_type: HashMap<TypeId, SystemId>,
}

impl SystemRegistry {
    /// Registers the system type `S`, returning `None` if it was already
    /// registered (along with a warning).
    pub fn register<S: System>(&mut self) -> Option<SystemId> {
        let type_id = TypeId::of::<S>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            log::warn!(
                "system type {} registered twice; keeping id {}",
                std::any::type_name::<S>(),
                existing.0
            );
            return None;
        }

        let id = SystemId(self.names.len() as u32);
        self.names.push(std::any::type_name::<S>().to_string());
        self.by_type.insert(type_id, id);
        Some(id)
    }

    /// Looks up the dense id for `S`, if registered.
    pub fn id_of<S: System>(&self) -> Option<SystemId> {
        self.by_type.get(&TypeId::of::<S>()).copied()
    }

    /// Returns the recorded type name for `id`.
    pub fn name(&self, id: SystemId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no system has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
