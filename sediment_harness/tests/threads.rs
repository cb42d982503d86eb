// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw work and flush completion on other threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use sediment_core::area::Area;
use sediment_core::color::{Color, ColorFormat, opa};
use sediment_core::config::{DisplayConfig, RenderMode, RuntimeConfig};
use sediment_core::draw::{CondvarSignal, FillDsc, TaskKind, TaskState};
use sediment_core::refresh::Runtime;
use sediment_harness::{Bench, BenchOptions, FlushRecord, HeadlessPanel, ReadyMode};
use sediment_render::deferred;

fn scene(bench: &mut Bench) {
    let screen = bench.screen;
    let a = bench.rect(screen, Area::new(2, 2, 20, 20), Color::new(255, 0, 0));
    let b = bench.rect(screen, Area::new(10, 10, 30, 30), Color::new(0, 255, 0));
    bench.restyle(b, |s| s.opa = opa::P50);
    let _ = bench.rect(a, Area::new(4, 4, 8, 8), Color::new(0, 0, 255));
}

#[test]
fn deferred_unit_drains_through_an_executor_thread() {
    let mut bench = Bench::bare(
        DisplayConfig::new(32, 32),
        BenchOptions {
            rows: Some(8),
            ..BenchOptions::default()
        },
    );
    let (unit, executor) = deferred::channel(2, bench.runtime.dispatch_signal());
    bench.runtime.add_draw_unit(Box::new(unit));

    let executed = Arc::new(AtomicUsize::new(0));
    let composites = Arc::new(AtomicUsize::new(0));
    let worker = {
        let executed = Arc::clone(&executed);
        let composites = Arc::clone(&composites);
        thread::spawn(move || {
            executor.run(|ticket| {
                assert!(ticket.draw_area.is_in(&ticket.buf_area, 0), "ticket writes inside its layer");
                if matches!(ticket.kind, TaskKind::Layer(_)) {
                    composites.fetch_add(1, Ordering::Relaxed);
                }
                executed.fetch_add(1, Ordering::Relaxed);
            });
        })
    };

    scene(&mut bench);
    let summary = bench.refresh().expect("refresh");
    assert_eq!(summary.chunks, 4);

    let stats = bench.runtime.stats();
    assert_eq!(stats.tasks_added, stats.tasks_freed, "every task came back");
    assert_eq!(stats.layers_created, stats.layers_freed);
    assert_eq!(
        composites.load(Ordering::Relaxed),
        bench.panel.layers_created().len(),
        "one composite per strip layer"
    );

    // Dropping the runtime drops the unit, which stops the executor.
    let tasks = stats.tasks_added;
    drop(bench);
    worker.join().expect("executor thread");
    assert_eq!(executed.load(Ordering::Relaxed) as u64, tasks);
}

#[test]
fn finalize_returns_while_a_ticket_is_in_flight() {
    let mut rt = Runtime::with_signal(RuntimeConfig::default(), Arc::new(CondvarSignal::new()));
    let mut ids = Vec::new();
    for _ in 0..2 {
        let cfg = DisplayConfig::new(16, 16);
        let (panel, _probe) = HeadlessPanel::new(&cfg, ReadyMode::Immediate);
        ids.push(rt.register_display(cfg, vec![0; 16 * 16 * 4], None, Box::new(panel)));
    }
    let (unit, executor) = deferred::channel(4, rt.dispatch_signal());
    rt.add_draw_unit(Box::new(unit));

    // The executor holds every ticket until `release` is dropped.
    let (release, hold) = mpsc::channel::<()>();
    let worker = thread::spawn(move || {
        executor.run(|_| {
            let _ = hold.recv();
        });
    });

    let head = rt.display(ids[0]).expect("display").layer_head();
    let draw = rt.dispatcher_mut();
    let layer = draw.create_layer(head, ColorFormat::Argb8888, Area::new(0, 0, 7, 7));
    let fill = || TaskKind::Fill(FillDsc::solid(Color::WHITE));
    let first = draw.add_task(layer, Area::new(0, 0, 7, 7), fill());
    draw.finalize_task(layer, first);
    assert_eq!(draw.queue().task(first).state, TaskState::InProgress);

    // Overlaps the held task, so nothing can be claimed in this pass.
    let second = draw.add_task(layer, Area::new(2, 2, 5, 5), fill());
    draw.finalize_task(layer, second);
    assert_eq!(draw.queue().task(first).state, TaskState::InProgress, "still held by the executor");
    assert_eq!(draw.queue().task(second).state, TaskState::Queued);
    assert!(draw.queue().has_in_flight());

    drop(release);
    drop(rt);
    worker.join().expect("executor thread");
}

#[test]
fn flush_completion_from_another_thread() {
    let mut bench = Bench::bare(
        DisplayConfig::new(24, 24),
        BenchOptions {
            rows: Some(6),
            double_buffered: true,
            ready: ReadyMode::Thread,
            ..BenchOptions::default()
        },
    );
    bench
        .runtime
        .add_draw_unit(Box::new(sediment_render::ImmediateUnit::new()));
    scene(&mut bench);
    bench.refresh().expect("refresh");

    let flushes = bench.panel.flushes();
    assert_eq!(flushes.len(), 4);
    assert_eq!(
        flushes.last(),
        Some(&FlushRecord {
            area: Area::new(0, 18, 23, 23),
            last: true,
        })
    );
    assert_eq!(bench.panel.color(3, 3), Some(Color::new(255, 0, 0)));
    assert_eq!(bench.panel.color(6, 6), Some(Color::new(0, 0, 255)));
    assert_eq!(bench.panel.color(23, 0), Some(Color::WHITE));
}

#[test]
fn direct_mode_flushes_each_area_in_place() {
    let mut bench = Bench::bare(
        DisplayConfig::new(16, 16).with_render_mode(RenderMode::Direct),
        BenchOptions {
            double_buffered: true,
            ready: ReadyMode::Thread,
            ..BenchOptions::default()
        },
    );
    bench
        .runtime
        .add_draw_unit(Box::new(sediment_render::ImmediateUnit::new()));
    let screen = bench.screen;
    let dot = bench.rect(screen, Area::new(2, 2, 3, 3), Color::BLACK);
    bench.refresh().expect("initial refresh");
    bench.panel.reset();

    bench.restyle(dot, |s| s.bg_color = Color::new(255, 0, 0));
    bench.commit();
    bench.invalidate(Area::new(12, 12, 13, 13));
    bench.refresh().expect("first change");
    bench.restyle(dot, |s| s.bg_color = Color::new(0, 255, 0));
    bench.refresh().expect("second change");

    let flushes = bench.panel.flushes();
    assert_eq!(
        flushes,
        vec![
            FlushRecord {
                area: Area::new(2, 2, 3, 3),
                last: false,
            },
            FlushRecord {
                area: Area::new(12, 12, 13, 13),
                last: true,
            },
            FlushRecord {
                area: Area::new(2, 2, 3, 3),
                last: true,
            },
        ]
    );
    assert_eq!(bench.panel.color(2, 2), Some(Color::new(0, 255, 0)));
    assert_eq!(bench.panel.color(12, 12), Some(Color::WHITE));
}
