//! Performance benchmarks for the padsim engine.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use padsim::models;
use padsim::{Model, ModelRegistry, PadRef, PadSpec, Properties, Simulation, StepResult, Value};

/// A model whose start activity sleeps `iterations` times in a row.
fn timer_model(iterations: u64) -> Model {
    Model::builder("Timer")
        .start(move |ctx| {
            let done = ctx.parameter("done").and_then(|v| v.as_u64()).unwrap_or(0);
            if done >= iterations {
                return Ok(StepResult::Done);
            }
            ctx.set_parameter("done", Value::UInt(done + 1));
            Ok(ctx.wait_for(1))
        })
        .build()
        .unwrap()
}

/// Emits `count` payloads, one per nanosecond.
fn pinger_model(count: u64) -> Model {
    Model::builder("Pinger")
        .pad(PadSpec::output("out"))
        .start(move |ctx| {
            let sent = ctx.parameter("sent").and_then(|v| v.as_u64()).unwrap_or(0);
            if sent >= count {
                return Ok(StepResult::Done);
            }
            ctx.pad_send("out", Value::UInt(sent))?;
            ctx.set_parameter("sent", Value::UInt(sent + 1));
            Ok(ctx.wait_for(1))
        })
        .build()
        .unwrap()
}

fn bench_timer_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("timer_dispatch");
    for iterations in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(iterations));
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &iterations,
            |b, &iterations| {
                b.iter(|| {
                    let registry = ModelRegistry::new();
                    registry.register(timer_model(iterations)).unwrap();
                    let sim = Simulation::new(registry);
                    sim.spawn_instance("Timer", "t", Properties::new(), None)
                        .unwrap();
                    sim.run().unwrap();
                    black_box(sim.simtime())
                });
            },
        );
    }
    group.finish();
}

fn bench_pad_delivery(c: &mut Criterion) {
    let mut group = c.benchmark_group("pad_delivery");
    for count in [100u64, 1_000] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let registry = ModelRegistry::new();
                registry.register(pinger_model(count)).unwrap();
                registry.register(models::sink::model()).unwrap();
                let sim = Simulation::new(registry);
                sim.spawn_instance("Pinger", "a", Properties::new(), None)
                    .unwrap();
                sim.spawn_instance("Sink", "b", Properties::new(), None)
                    .unwrap();
                sim.settle().unwrap();
                sim.bind(&PadRef::new("a", "out"), &PadRef::new("b", "in"))
                    .unwrap();
                sim.run().unwrap();
                black_box(sim.stats().payloads_delivered)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_timer_dispatch, bench_pad_delivery);
criterion_main!(benches);
