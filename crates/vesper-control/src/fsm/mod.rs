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

//! Parameterized finite state machine.
//!
//! A [`StateMachine`] holds up to [`MAX_STATES`] named states of a
//! user-chosen type `T` and a bitmask of wired destinations per state.
//! Transitions are guarded by predicates over **typed parameters**: each
//! parameter type gets its own array of named values plus the predicates
//! wired between state pairs. On [`StateMachine::transition`] every
//! parameter array filters the candidate mask independently, so guards in
//! different arrays AND-combine on the same edge.
//!
//! `T` may itself be a `StateMachine`, which yields hierarchical (layered)
//! machines: install an `on_update` callback on the outer machine that
//! drives the inner one.

mod machine;
mod parameters;

pub use machine::{StateMachine, StateMachineError, MAX_STATES};
