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

//! Typed parameter arrays and their type-erased handle.

use std::any::Any;
use std::collections::HashMap;

/// A transition guard inside one parameter array: the predicate passes
/// when `predicate(values[a], values[b])` holds.
pub(crate) struct Guard<P> {
    pub(crate) a: String,
    pub(crate) b: String,
    pub(crate) predicate: fn(&P, &P) -> bool,
}

/// Named values of one parameter type plus the guards wired between
/// state pairs.
pub(crate) struct ParameterArray<P> {
    pub(crate) values: HashMap<String, P>,
    /// `(source, destination)` pairs to the guards on that edge.
    pub(crate) guards: HashMap<(u8, u8), Vec<Guard<P>>>,
}

impl<P> Default for ParameterArray<P> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            guards: HashMap::new(),
        }
    }
}

impl<P> ParameterArray<P> {
    pub(crate) fn wire(&mut self, source: u8, destination: u8, guard: Guard<P>) {
        self.guards.entry((source, destination)).or_default().push(guard);
    }
}

/// Type-erased handle to a [`ParameterArray`], stored keyed by `TypeId`.
pub(crate) trait ParameterLayer {
    /// Clears every bit of `mask` whose edge from `current` carries a
    /// failing guard in this array. Edges this array never wired are
    /// left alone.
    fn handle_transition(&self, current: u8, mask: &mut u16);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<P: 'static> ParameterLayer for ParameterArray<P> {
    fn handle_transition(&self, current: u8, mask: &mut u16) {
        let mut remaining = *mask;
        while remaining != 0 {
            let destination = remaining.trailing_zeros() as u8;
            remaining &= remaining - 1;

            let Some(guards) = self.guards.get(&(current, destination)) else {
                continue;
            };
            for guard in guards {
                let (Some(a), Some(b)) = (self.values.get(&guard.a), self.values.get(&guard.b))
                else {
                    log::warn!(
                        "transition {current}->{destination} references an unset parameter; guard fails"
                    );
                    *mask &= !(1 << destination);
                    break;
                };
                if !(guard.predicate)(a, b) {
                    *mask &= !(1 << destination);
                    break;
                }
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
