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

use std::any::TypeId;

use crate::ecs::component::Component;

/// A trait for the tuple of component types a system requires.
///
/// Implemented on tuples like `(Position, Velocity)`; the empty tuple `()`
/// expresses "matches every active entity". It provides the type signature
/// the system manager resolves against the component registry when a
/// system is created.
pub trait RequirementSet {
    /// Returns the `TypeId`s of the required components, in tuple order.
    fn type_ids() -> Vec<TypeId>;
}

impl RequirementSet for () {
    fn type_ids() -> Vec<TypeId> {
        Vec::new()
    }
}

macro_rules! impl_requirement_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> RequirementSet for ($($name,)+) {
            fn type_ids() -> Vec<TypeId> {
                vec![$(TypeId::of::<$name>()),+]
            }
        }
    };
}

impl_requirement_set!(A);
impl_requirement_set!(A, B);
impl_requirement_set!(A, B, C);
impl_requirement_set!(A, B, C, D);
impl_requirement_set!(A, B, C, D, E);
impl_requirement_set!(A, B, C, D, E, F);
impl_requirement_set!(A, B, C, D, E, F, G);
impl_requirement_set!(A, B, C, D, E, F, G, H);
