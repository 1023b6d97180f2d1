use std::any::Any;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use vesper_core::impl_trivial_codec;
use vesper_data::ecs::{Component, System, SystemId, World};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}
impl_trivial_codec!(Position);
impl Component for Position {}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct Velocity(f32);
impl_trivial_codec!(Velocity);
impl Component for Velocity {}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct PhysicsState(u32);
impl_trivial_codec!(PhysicsState);
impl System for PhysicsState {}

fn integrate(world: &mut World, system: SystemId, data: &mut dyn Any) {
    let dt = *data.downcast_ref::<f32>().unwrap();
    for entity in world.system_entities(system) {
        let speed = world.component::<Velocity>(entity).0;
        world.update_component::<Position>(entity, |p| p.y += speed * dt);
    }
}

fn bench_dispatch(c: &mut Criterion) {
    let mut world = World::new();
    world.register_component::<Position>();
    world.register_component::<Velocity>();
    let physics = world.register_system::<PhysicsState, (Position, Velocity)>(PhysicsState(0), 0);
    let step = world.create_system_function();
    world.set_function(physics, step, integrate);

    // Setup 10,000 entities, half of which match the system.
    for i in 0..10_000u32 {
        let e = world.create_entity();
        world.add_component(e, Position { x: i as f32, y: 0.0, z: 0.0 });
        if i % 2 == 0 {
            world.add_component(e, Velocity(1.0));
        }
    }

    let mut group = c.benchmark_group("ECS Dispatch");

    group.bench_function("Integrate (Position & Velocity)", |b| {
        b.iter(|| {
            let mut dt = black_box(0.016f32);
            world.run(step, &mut dt);
        });
    });

    group.bench_function("Membership snapshot", |b| {
        b.iter(|| black_box(world.system_entities(physics).len()));
    });

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
