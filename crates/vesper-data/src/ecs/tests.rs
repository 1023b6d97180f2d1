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

use std::any::Any;

use vesper_core::codec::ByteCodec;
use vesper_core::impl_trivial_codec;

use super::pool::ABSENT;
use super::*;

// --- DUMMY COMPONENTS FOR TESTING ---

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}
impl_trivial_codec!(Position);
impl Component for Position {}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
struct Sprite {
    sheet: u32,
}
impl_trivial_codec!(Sprite);
impl Component for Sprite {}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
struct Tag {
    value: u32,
}
impl_trivial_codec!(Tag);
impl Component for Tag {}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
struct Velocity {
    dx: i32,
    dy: i32,
}
impl_trivial_codec!(Velocity);
impl Component for Velocity {}

/// A complex (variable-length) component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Label(String);

impl ByteCodec for Label {
    const TRIVIAL: bool = false;

    fn encoded_len(&self) -> usize {
        self.0.encoded_len()
    }

    fn encode(&self, stream: &mut [u8], offset: usize) -> usize {
        self.0.encode(stream, offset)
    }

    fn decode(stream: &[u8], offset: usize) -> Self {
        Self(String::decode(stream, offset))
    }

    fn try_decode(stream: &[u8], offset: usize) -> Option<(Self, usize)> {
        let (text, consumed) = String::try_decode(stream, offset)?;
        Some((Self(text), consumed))
    }
}
impl Component for Label {}

// --- DUMMY SYSTEM STATES ---

#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
struct RenderState(u32);
impl_trivial_codec!(RenderState);
impl System for RenderState {}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
struct PhysicsState(u32);
impl_trivial_codec!(PhysicsState);
impl System for PhysicsState {}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
struct AudioState(u32);
impl_trivial_codec!(AudioState);
impl System for AudioState {}

fn record_system_id(_world: &mut World, system: SystemId, data: &mut dyn Any) {
    data.downcast_mut::<Vec<u32>>().unwrap().push(system.0);
}

// --- TESTS ---

#[test]
fn create_add_get_remove_round_trip() {
    // --- 1. SETUP ---
    let mut world = World::new();
    world.register_component::<Position>();

    // --- 2. ACTION ---
    let e1 = world.create_entity();
    world.add_component(e1, Position { x: 1.0, y: 2.0, z: 3.0 });

    // --- 3. ASSERTIONS ---
    assert_eq!(
        world.component::<Position>(e1),
        Position { x: 1.0, y: 2.0, z: 3.0 }
    );
    assert!(world.take_error().is_none());

    let removed = world.remove_component::<Position>(e1);
    assert_eq!(removed, Position { x: 1.0, y: 2.0, z: 3.0 });
    assert!(!world.contains_component::<Position>(e1));

    // A read after removal hands back the sentinel and records the error.
    let sentinel = world.component::<Position>(e1);
    assert_eq!(sentinel, Position::default());
    assert_eq!(world.take_error(), Some(EcsError::AccessMissing));
}

#[test]
fn entity_ids_recycle_lowest_first() {
    let mut world = World::new();
    let e0 = world.create_entity();
    let e1 = world.create_entity();
    let e2 = world.create_entity();
    assert_eq!((e0.index, e1.index, e2.index), (0, 1, 2));

    world.remove_entity(e2);
    world.remove_entity(e0);

    // The lowest freed id comes back first.
    assert_eq!(world.create_entity().index, 0);
    assert_eq!(world.create_entity().index, 2);
    assert_eq!(world.create_entity().index, 3);
}

#[test]
fn removing_a_dead_entity_fails_soft() {
    let mut world = World::new();
    let e = world.create_entity();
    world.remove_entity(e);

    world.remove_entity(e);
    assert_eq!(world.take_error(), Some(EcsError::NoSuchEntity));

    world.remove_entity(EntityId::new(999));
    assert_eq!(world.take_error(), Some(EcsError::NoSuchEntity));
}

#[test]
fn double_add_is_rejected() {
    let mut world = World::new();
    world.register_component::<Tag>();
    let e = world.create_entity();

    world.add_component(e, Tag { value: 1 });
    world.add_component(e, Tag { value: 2 });
    assert_eq!(world.take_error(), Some(EcsError::AlreadyPresent));

    // The first value survived.
    assert_eq!(world.component::<Tag>(e).value, 1);
}

#[test]
fn pool_compacts_after_removal() {
    // --- 1. SETUP ---
    let mut world = World::new();
    let tag_id = world.register_component::<Tag>();
    let e1 = world.create_entity();
    let e2 = world.create_entity();
    let e3 = world.create_entity();
    world.add_component(e1, Tag { value: 1 });
    world.add_component(e2, Tag { value: 2 });
    world.add_component(e3, Tag { value: 3 });

    // --- 2. ACTION ---
    world.remove_component::<Tag>(e2);

    // --- 3. ASSERTIONS ---
    // Survivors still decode, and the pool holds exactly the sentinel plus
    // two records with no gap in between.
    assert_eq!(world.component::<Tag>(e1).value, 1);
    assert_eq!(world.component::<Tag>(e3).value, 3);

    let pool = &world.storage.pools[tag_id.0 as usize];
    let stride = std::mem::size_of::<Tag>();
    assert_eq!(pool.bytes.len(), 3 * stride, "sentinel + two records");
    assert_eq!(pool.index[e1.index as usize], stride as u32);
    assert_eq!(pool.index[e2.index as usize], ABSENT);
    assert_eq!(pool.index[e3.index as usize], 2 * stride as u32);
}

#[test]
fn complex_components_resize_in_place() {
    let mut world = World::new();
    let label_id = world.register_component::<Label>();
    let e1 = world.create_entity();
    let e2 = world.create_entity();
    world.add_component(e1, Label("short".into()));
    world.add_component(e2, Label("second".into()));

    // Growing e1's record shifts e2's offset; both must still decode.
    world.set_component(e1, Label("a considerably longer label".into()));
    assert_eq!(world.component::<Label>(e1).0, "a considerably longer label");
    assert_eq!(world.component::<Label>(e2).0, "second");

    // Shrinking too.
    world.set_component(e1, Label("s".into()));
    assert_eq!(world.component::<Label>(e1).0, "s");
    assert_eq!(world.component::<Label>(e2).0, "second");
    assert!(world.take_error().is_none());

    let pool = &world.storage.pools[label_id.0 as usize];
    assert_ne!(pool.index[e1.index as usize], pool.index[e2.index as usize]);
}

#[test]
fn shared_components_alias_one_record() {
    // --- 1. SETUP ---
    let mut world = World::new();
    world.register_component::<Label>();
    let src = world.create_entity();
    let dst = world.create_entity();
    world.add_component(src, Label("held once".into()));

    // --- 2. ACTION ---
    world.share_component::<Label>(dst, src);

    // --- 3. ASSERTIONS ---
    assert_eq!(world.component::<Label>(dst).0, "held once");
    assert!(world.contains_component::<Label>(dst));

    // Removal on the alias clears only the alias's mapping.
    world.remove_component::<Label>(dst);
    assert!(!world.contains_component::<Label>(dst));
    assert_eq!(world.component::<Label>(src).0, "held once");
    assert!(world.take_error().is_none());
}

#[test]
fn overwriting_a_shared_slot_is_copy_on_write() {
    let mut world = World::new();
    world.register_component::<Label>();
    let src = world.create_entity();
    let dst = world.create_entity();
    world.add_component(src, Label("original".into()));
    world.share_component::<Label>(dst, src);

    world.set_component(dst, Label("rewritten".into()));

    // The source keeps the original bytes.
    assert_eq!(world.component::<Label>(src).0, "original");
    assert_eq!(world.component::<Label>(dst).0, "rewritten");

    // And the records are now independent: removing the source leaves the
    // destination's copy alone.
    world.remove_component::<Label>(src);
    assert_eq!(world.component::<Label>(dst).0, "rewritten");
    assert!(world.take_error().is_none());
}

#[test]
fn system_membership_tracks_component_changes() {
    // --- 1. SETUP ---
    let mut world = World::new();
    world.register_component::<Position>();
    world.register_component::<Sprite>();
    let render = world.register_system::<RenderState, (Position, Sprite)>(RenderState(0), 0);

    // --- 2. ACTION & ASSERTIONS ---
    let e = world.create_entity();
    world.add_component(e, Position::default());
    assert!(
        world.system_entities(render).is_empty(),
        "Position alone must not satisfy {{Position, Sprite}}"
    );

    world.add_component(e, Sprite { sheet: 7 });
    assert_eq!(world.system_entities(render), vec![e]);

    world.remove_component::<Sprite>(e);
    assert!(world.system_entities(render).is_empty());
}

#[test]
fn dense_index_stays_a_bijection_under_churn() {
    let mut world = World::new();
    world.register_component::<Tag>();
    let system = world.register_system::<RenderState, (Tag,)>(RenderState(0), 0);

    let entities: Vec<EntityId> = (0..6)
        .map(|i| {
            let e = world.create_entity();
            world.add_component(e, Tag { value: i });
            e
        })
        .collect();

    // Swap-remove from the middle and the front.
    world.remove_entity(entities[2]);
    world.remove_component::<Tag>(entities[0]);

    let record = &world.systems.systems[system.0 as usize];
    assert_eq!(record.reverse.len(), 4);
    for (dense, &entity) in record.reverse.iter().enumerate() {
        assert_eq!(
            record.index[entity as usize], dense as u32,
            "reverse[index[e]] must equal e with no holes"
        );
    }
}

#[test]
fn dispatch_respects_priority_then_creation_order() {
    // --- 1. SETUP ---
    let mut world = World::new();
    let a = world.register_system::<RenderState, ()>(RenderState(0), 10);
    let b = world.register_system::<PhysicsState, ()>(PhysicsState(0), 0);
    let c = world.register_system::<AudioState, ()>(AudioState(0), 5);

    let slot = world.create_system_function();
    for system in [a, b, c] {
        world.set_function(system, slot, record_system_id);
    }

    // --- 2. ACTION ---
    let mut trace: Vec<u32> = Vec::new();
    world.run(slot, &mut trace);

    // --- 3. ASSERTIONS ---
    assert_eq!(trace, vec![b.0, c.0, a.0], "lowest priority runs first");
}

#[test]
fn running_an_unknown_slot_records_the_error() {
    let mut world = World::new();
    world.register_system::<RenderState, ()>(RenderState(0), 0);
    let mut data = ();
    world.run(3, &mut data);
    assert_eq!(world.take_error(), Some(EcsError::NoSuchSystemSlot));
}

#[test]
fn toggle_flip_flop_restores_the_original_function() {
    let mut world = World::new();
    let system = world.register_system::<RenderState, ()>(RenderState(0), 0);
    let slot = world.create_system_function();
    world.set_function(system, slot, record_system_id);

    let run_trace = |world: &mut World| {
        let mut trace: Vec<u32> = Vec::new();
        world.run(slot, &mut trace);
        trace.len()
    };
    assert_eq!(run_trace(&mut world), 1);

    // Deactivate: the slot goes quiet.
    world.toggle_function(system, slot);
    assert_eq!(run_trace(&mut world), 0);
    assert!(!world.systems.systems[system.0 as usize].slots[slot].active);

    // Reactivate: the original pointer comes back from the shadow slot.
    world.toggle_function(system, slot);
    assert_eq!(run_trace(&mut world), 1);
    assert!(world.systems.systems[system.0 as usize].slots[slot].active);
}

#[test]
fn toggle_groups_flip_every_listed_slot_at_once() {
    let mut world = World::new();
    let render = world.register_system::<RenderState, ()>(RenderState(0), 0);
    let physics = world.register_system::<PhysicsState, ()>(PhysicsState(0), 1);
    let slot = world.create_system_function();
    world.set_function(render, slot, record_system_id);
    world.set_function(physics, slot, record_system_id);

    let group = world.create_toggle("debug-draw");
    world.add_to_toggle(group, render, slot);
    world.add_to_toggle(group, physics, slot);

    world.toggle(group);
    let mut trace: Vec<u32> = Vec::new();
    world.run(slot, &mut trace);
    assert!(trace.is_empty(), "both slots were deactivated atomically");

    world.toggle(group);
    world.run(slot, &mut trace);
    assert_eq!(trace, vec![render.0, physics.0]);
}

#[test]
fn deactivated_entities_keep_components_but_leave_systems() {
    let mut world = World::new();
    world.register_component::<Position>();
    let system = world.register_system::<RenderState, (Position,)>(RenderState(0), 0);

    let e = world.create_entity();
    world.add_component(e, Position { x: 9.0, y: 0.0, z: 0.0 });
    assert_eq!(world.system_entities(system), vec![e]);

    world.set_active(e, false);
    assert!(world.system_entities(system).is_empty());
    assert!(world.contains_component::<Position>(e));
    assert!(!world.is_active(e));

    world.set_active(e, true);
    assert_eq!(world.system_entities(system), vec![e]);
}

#[test]
fn per_component_deactivation_clears_the_bit_only() {
    let mut world = World::new();
    world.register_component::<Position>();
    let system = world.register_system::<RenderState, (Position,)>(RenderState(0), 0);

    let e = world.create_entity();
    world.add_component(e, Position { x: 1.0, y: 0.0, z: 0.0 });

    world.set_component_active::<Position>(e, false);
    assert!(world.system_entities(system).is_empty());
    // The pool record is untouched.
    assert!(world.contains_component::<Position>(e));
    assert!(!world.is_component_active::<Position>(e));

    world.set_component_active::<Position>(e, true);
    assert_eq!(world.system_entities(system), vec![e]);
    assert_eq!(world.component::<Position>(e).x, 1.0);
}

#[test]
fn late_component_registration_extends_index_rows() {
    let mut world = World::new();
    world.register_component::<Position>();
    let e1 = world.create_entity();
    let e2 = world.create_entity();
    world.add_component(e1, Position::default());

    // Registering after entities exist must size the new pool's index map.
    let tag_id = world.register_component::<Tag>();
    assert_eq!(world.storage.pools[tag_id.0 as usize].index.len(), 2);

    world.add_component(e2, Tag { value: 4 });
    assert_eq!(world.component::<Tag>(e2).value, 4);
}

#[test]
fn mutation_during_dispatch_does_not_break_iteration() {
    let mut world = World::new();
    world.register_component::<Tag>();
    let system = world.register_system::<RenderState, (Tag,)>(RenderState(0), 0);
    let slot = world.create_system_function();

    // The function removes every entity it visits; the snapshot it
    // iterates must not shrink underneath it.
    fn cull(world: &mut World, system: SystemId, data: &mut dyn Any) {
        let visited = data.downcast_mut::<u32>().unwrap();
        for entity in world.system_entities(system) {
            world.remove_entity(entity);
            *visited += 1;
        }
    }
    world.set_function(system, slot, cull);

    for i in 0..5 {
        let e = world.create_entity();
        world.add_component(e, Tag { value: i });
    }

    let mut visited: u32 = 0;
    world.run(slot, &mut visited);
    assert_eq!(visited, 5);
    assert!(world.system_entities(system).is_empty());
    assert!(world.take_error().is_none());
}

#[test]
fn system_state_round_trips_through_the_manager() {
    let mut world = World::new();
    let system = world.register_system::<RenderState, ()>(RenderState(3), 0);
    assert_eq!(world.system_state::<RenderState>(system), RenderState(3));

    world.set_system_state(system, RenderState(42));
    assert_eq!(world.system_state::<RenderState>(system), RenderState(42));
}

#[test]
fn clear_entities_keeps_registrations() {
    let mut world = World::new();
    world.register_component::<Tag>();
    let system = world.register_system::<RenderState, (Tag,)>(RenderState(0), 0);
    let e = world.create_entity();
    world.add_component(e, Tag { value: 1 });

    world.clear_entities();

    assert!(world.system_entities(system).is_empty());
    assert_eq!(world.entities.len(), 0);

    // The container is immediately usable again.
    let e = world.create_entity();
    world.add_component(e, Tag { value: 2 });
    assert_eq!(world.component::<Tag>(e).value, 2);
}

#[test]
fn snapshot_round_trip_reproduces_every_observable() {
    // --- 1. SETUP: a container with 100 entities over 5 component types
    // and 3 systems. ---
    let mut world = World::new();
    world.register_component::<Position>();
    world.register_component::<Sprite>();
    world.register_component::<Tag>();
    world.register_component::<Velocity>();
    world.register_component::<Label>();

    let render = world.register_system::<RenderState, (Position, Sprite)>(RenderState(1), 5);
    let physics = world.register_system::<PhysicsState, (Position, Velocity)>(PhysicsState(2), 0);
    let audio = world.register_system::<AudioState, (Tag,)>(AudioState(3), 9);
    let slot = world.create_system_function();

    let mut entities = Vec::new();
    for i in 0..100u32 {
        let e = world.create_entity();
        world.add_component(e, Position { x: i as f32, y: 0.0, z: 1.0 });
        if i % 2 == 0 {
            world.add_component(e, Sprite { sheet: i });
        }
        if i % 3 == 0 {
            world.add_component(e, Velocity { dx: i as i32, dy: -1 });
        }
        if i % 5 == 0 {
            world.add_component(e, Tag { value: i });
            world.add_component(e, Label(format!("entity-{i}")));
        }
        entities.push(e);
    }
    // A little churn so recycled ids and compacted pools are exercised.
    world.remove_entity(entities[10]);
    world.remove_entity(entities[11]);
    let group = world.create_toggle("render-pass");
    world.add_to_toggle(group, render, slot);

    // --- 2. ACTION ---
    let snapshot = world.serialize();

    let mut loaded = World::new();
    loaded.register_component::<Position>();
    loaded.register_component::<Sprite>();
    loaded.register_component::<Tag>();
    loaded.register_component::<Velocity>();
    loaded.register_component::<Label>();
    loaded.register_system::<RenderState, (Position, Sprite)>(RenderState(0), 0);
    loaded.register_system::<PhysicsState, (Position, Velocity)>(PhysicsState(0), 0);
    loaded.register_system::<AudioState, (Tag,)>(AudioState(0), 0);
    loaded
        .deserialize(&snapshot)
        .expect("round trip must decode");

    // --- 3. ASSERTIONS ---
    for i in 0..100u32 {
        let e = entities[i as usize];
        if i == 10 || i == 11 {
            assert!(!loaded.is_alive(e));
            continue;
        }
        assert_eq!(loaded.component::<Position>(e), world.component::<Position>(e));
        assert_eq!(
            loaded.contains_component::<Sprite>(e),
            world.contains_component::<Sprite>(e)
        );
        if i % 5 == 0 {
            assert_eq!(loaded.component::<Label>(e).0, format!("entity-{i}"));
        }
    }
    for system in [render, physics, audio] {
        assert_eq!(
            loaded.system_entities(system),
            world.system_entities(system),
            "dense indexes must be reproduced exactly"
        );
    }
    assert_eq!(loaded.systems.dispatch, world.systems.dispatch);
    assert_eq!(loaded.system_state::<PhysicsState>(physics), PhysicsState(2));
    assert_eq!(loaded.systems.slot_count, 1);
    assert!(loaded.take_error().is_none());

    // Freshly created entities continue from the loaded free list.
    let recycled = loaded.create_entity();
    assert_eq!(recycled.index, 10);
}

#[test]
fn snapshot_rejects_a_reordered_registry() {
    let mut world = World::new();
    world.register_component::<Position>();
    world.register_component::<Tag>();
    let snapshot = world.serialize();

    // Same types, different order.
    let mut loaded = World::new();
    loaded.register_component::<Tag>();
    loaded.register_component::<Position>();
    assert!(matches!(
        loaded.deserialize(&snapshot),
        Err(DecodeError::RegistryMismatch { id: 0, .. })
    ));

    // Different count.
    let mut loaded = World::new();
    loaded.register_component::<Position>();
    assert!(matches!(
        loaded.deserialize(&snapshot),
        Err(DecodeError::CountMismatch { kind: "component", .. })
    ));

    // Not a snapshot at all.
    let mut loaded = World::new();
    assert!(matches!(
        loaded.deserialize(&[0u8; 16]),
        Err(DecodeError::BadHeader)
    ));
}

#[test]
fn every_snapshot_truncation_fails_soft() {
    // --- 1. SETUP: a snapshot with all three sections populated. ---
    let mut world = World::new();
    world.register_component::<Position>();
    world.register_component::<Label>();
    world.register_system::<RenderState, (Position,)>(RenderState(0), 0);
    let e = world.create_entity();
    world.add_component(e, Position { x: 1.0, y: 2.0, z: 3.0 });
    world.add_component(e, Label("named".into()));
    let snapshot = world.serialize();

    // --- 2. ACTION & ASSERTIONS ---
    // A stream cut at any byte, including mid-record, must come back as
    // an error rather than a panic.
    for cut in 0..snapshot.len() {
        let mut loaded = World::new();
        loaded.register_component::<Position>();
        loaded.register_component::<Label>();
        loaded.register_system::<RenderState, (Position,)>(RenderState(0), 0);
        assert!(
            loaded.deserialize(&snapshot[..cut]).is_err(),
            "a snapshot cut at byte {cut} must error out"
        );
    }
}

fn sorted_insert(index: &mut Vec<u32>, reverse: &mut Vec<u32>, entity: u32) {
    let pos = reverse.partition_point(|&e| e < entity);
    reverse.insert(pos, entity);
    if entity as usize >= index.len() {
        index.resize(entity as usize + 1, ABSENT);
    }
    for dense in pos..reverse.len() {
        index[reverse[dense] as usize] = dense as u32;
    }
}

#[test]
fn insertion_override_keeps_the_dense_mapping_coherent() {
    // --- 1. SETUP ---
    let mut world = World::new();
    world.register_component::<Tag>();
    let system = world.register_system::<RenderState, (Tag,)>(RenderState(0), 0);
    world.set_insert_function(system, sorted_insert);

    let entities: Vec<EntityId> = (0..5).map(|_| world.create_entity()).collect();

    // --- 2. ACTION ---
    // Attach out of creation order; the override lands each entity at its
    // sorted position instead of the tail.
    for &i in &[3usize, 0, 4, 1, 2] {
        world.add_component(entities[i], Tag { value: i as u32 });
    }

    // --- 3. ASSERTIONS ---
    assert_eq!(
        world.system_entities(system),
        entities,
        "custom insertion must yield id order regardless of attach order"
    );

    // Churn: removal swap-removes, the next insert re-sorts its suffix;
    // reverse[index[e]] == e must survive both.
    world.remove_component::<Tag>(entities[1]);
    world.add_component(entities[1], Tag { value: 9 });

    let record = &world.systems.systems[system.0 as usize];
    assert_eq!(record.reverse.len(), 5);
    for (dense, &entity) in record.reverse.iter().enumerate() {
        assert_eq!(
            record.index[entity as usize], dense as u32,
            "two-way dense mapping broken at dense slot {dense}"
        );
    }
}

#[test]
fn update_component_mutates_in_place() {
    let mut world = World::new();
    world.register_component::<Position>();
    let e = world.create_entity();
    world.add_component(e, Position { x: 1.0, y: 2.0, z: 3.0 });

    world.update_component::<Position>(e, |p| p.x += 10.0);
    assert_eq!(world.component::<Position>(e).x, 11.0);
}
