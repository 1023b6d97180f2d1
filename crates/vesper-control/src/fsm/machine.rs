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
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::Hasher;

use vesper_core::codec::{encode_to_vec, ByteCodec};

use super::parameters::{Guard, ParameterArray, ParameterLayer};

/// Hard cap on the number of states per machine; the valid-destination
/// masks are `u16`.
pub const MAX_STATES: usize = 16;

/// An error that can occur while building or driving a [`StateMachine`].
#[derive(Debug, PartialEq, Eq)]
pub enum StateMachineError {
    /// The machine already holds [`MAX_STATES`] states.
    StateLimitReached,
    /// A named state does not exist.
    NoSuchState,
    /// A named parameter does not exist in the requested array.
    NoSuchParameter,
}

fn noop_add<T>(_: &T) {}
fn noop_change<T>(_: &T, _: &T) {}
fn noop_update<T>(_: &mut T) {}

/// A parameterized finite state machine over states of type `T`.
///
/// The machine starts in state index 0 once a state exists. Transitions
/// are wired per parameter type; see the [module docs](super) for the
/// filtering model.
pub struct StateMachine<T> {
    pub(crate) names: Vec<String>,
    pub(crate) states: Vec<T>,
    pub(crate) current: u8,
    /// Wired destinations per source state.
    pub(crate) valid: [u16; MAX_STATES],
    pub(crate) parameters: HashMap<TypeId, Box<dyn ParameterLayer>>,
    on_add: fn(&T),
    on_change: fn(&T, &T),
    on_update: fn(&mut T),
}

impl<T> Default for StateMachine<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StateMachine<T> {
    /// Creates an empty machine with no-op callbacks.
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            states: Vec::new(),
            current: 0,
            valid: [0; MAX_STATES],
            parameters: HashMap::new(),
            on_add: noop_add,
            on_change: noop_change,
            on_update: noop_update,
        }
    }

    /// Number of registered states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True when no state has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Index of the state called `name`.
    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Name of the current state. Empty machines have no current state.
    pub fn current_name(&self) -> Option<&str> {
        self.names.get(self.current as usize).map(String::as_str)
    }

    /// The current state's value.
    pub fn current_state(&self) -> Option<&T> {
        self.states.get(self.current as usize)
    }

    /// Mutable access to the current state's value.
    pub fn current_state_mut(&mut self) -> Option<&mut T> {
        self.states.get_mut(self.current as usize)
    }

    /// Registers a state and fires the `on_add` callback with it.
    pub fn add_state(&mut self, name: &str, state: T) -> Result<(), StateMachineError> {
        if self.states.len() == MAX_STATES {
            return Err(StateMachineError::StateLimitReached);
        }
        (self.on_add)(&state);
        self.names.push(name.to_string());
        self.states.push(state);
        Ok(())
    }

    /// Installs the callback fired when a state is added.
    pub fn set_on_add(&mut self, f: fn(&T)) {
        self.on_add = f;
    }

    /// Installs the callback fired as `on_change(new, old)` when a
    /// transition lands.
    pub fn set_on_change(&mut self, f: fn(&T, &T)) {
        self.on_change = f;
    }

    /// Installs the callback [`update`](Self::update) invokes per state.
    pub fn set_on_update(&mut self, f: fn(&mut T)) {
        self.on_update = f;
    }

    /// Sets (or creates) the named parameter in the array for `P`.
    pub fn set_parameter<P: 'static>(&mut self, name: &str, value: P) {
        self.layer_mut::<P>().values.insert(name.to_string(), value);
    }

    /// Reads the named parameter from the array for `P`.
    pub fn parameter<P: 'static>(&self, name: &str) -> Result<&P, StateMachineError> {
        self.parameters
            .get(&TypeId::of::<P>())
            .and_then(|layer| layer.as_any().downcast_ref::<ParameterArray<P>>())
            .and_then(|array| array.values.get(name))
            .ok_or(StateMachineError::NoSuchParameter)
    }

    /// Wires a guarded edge to `destination`: the transition passes when
    /// `predicate(values[param_a], values[param_b])` holds in the `P`
    /// array. With `source = None` the edge is wired from every state
    /// registered so far; guards already present on an edge AND-combine.
    pub fn add_transition<P: 'static>(
        &mut self,
        param_a: &str,
        predicate: fn(&P, &P) -> bool,
        param_b: &str,
        source: Option<&str>,
        destination: &str,
    ) -> Result<(), StateMachineError> {
        let destination = self
            .state_index(destination)
            .ok_or(StateMachineError::NoSuchState)? as u8;
        let sources: Vec<u8> = match source {
            Some(name) => {
                vec![self.state_index(name).ok_or(StateMachineError::NoSuchState)? as u8]
            }
            None => (0..self.states.len() as u8).collect(),
        };

        let layer = self.layer_mut::<P>();
        for &source in &sources {
            layer.wire(
                source,
                destination,
                Guard {
                    a: param_a.to_string(),
                    b: param_b.to_string(),
                    predicate,
                },
            );
        }
        for source in sources {
            self.valid[source as usize] |= 1 << destination;
        }
        Ok(())
    }

    /// Like [`add_transition`](Self::add_transition), comparing `param_a`
    /// against a constant. The constant is stored as a hidden parameter
    /// named by a hash of its encoded bytes, so wiring the same constant
    /// twice shares one entry.
    pub fn add_transition_to<P: ByteCodec + 'static>(
        &mut self,
        param_a: &str,
        predicate: fn(&P, &P) -> bool,
        constant: P,
        source: Option<&str>,
        destination: &str,
    ) -> Result<(), StateMachineError> {
        let mut hasher = DefaultHasher::new();
        hasher.write(&encode_to_vec(&constant));
        let hidden = format!("#{:016x}", hasher.finish());

        let layer = self.layer_mut::<P>();
        layer.values.entry(hidden.clone()).or_insert(constant);
        self.add_transition(param_a, predicate, &hidden, source, destination)
    }

    /// Attempts a transition out of the current state.
    ///
    /// Candidates start as `valid[current]` minus the self-bit; every
    /// parameter array then filters independently. The lowest surviving
    /// bit becomes the new state and `on_change(new, old)` fires. Returns
    /// whether the state changed.
    pub fn transition(&mut self) -> bool {
        if self.states.is_empty() {
            return false;
        }
        let current = self.current;
        let mut mask = self.valid[current as usize] & !(1 << current);
        for layer in self.parameters.values() {
            if mask == 0 {
                break;
            }
            layer.handle_transition(current, &mut mask);
        }
        if mask == 0 {
            return false;
        }

        let next = mask.trailing_zeros() as u8;
        log::debug!(
            "state machine: {} -> {}",
            self.names[current as usize],
            self.names[next as usize]
        );
        (self.on_change)(&self.states[next as usize], &self.states[current as usize]);
        self.current = next;
        true
    }

    /// Invokes the `on_update` callback for every registered state.
    pub fn update(&mut self) {
        for state in &mut self.states {
            (self.on_update)(state);
        }
    }

    fn layer_mut<P: 'static>(&mut self) -> &mut ParameterArray<P> {
        self.parameters
            .entry(TypeId::of::<P>())
            .or_insert_with(|| Box::<ParameterArray<P>>::default())
            .as_any_mut()
            .downcast_mut()
            // The box under this key was built from `ParameterArray<P>`.
            .unwrap()
    }
}
