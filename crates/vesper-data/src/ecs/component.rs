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

use vesper_core::codec::ByteCodec;

/// A marker trait for types that can be attached to entities as components.
///
/// Components travel through the byte pools via their [`ByteCodec`]
/// implementation; `Default` supplies the per-pool sentinel record that is
/// handed back on access errors. The `'static` lifetime ensures that the
/// component type does not contain any non-static references, and
/// `Send + Sync` keep the container movable across threads even though all
/// mutation happens on one.
pub trait Component: ByteCodec + Default + 'static + Send + Sync {}

/// A marker trait for the static-instance state a system carries.
///
/// The state is held serialized inside the system manager so that the whole
/// container can snapshot without knowing concrete system types.
pub trait System: ByteCodec + Default + 'static + Send + Sync {}
