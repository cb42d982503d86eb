// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Several displays driven by one runtime.

use std::sync::Arc;

use sediment_core::area::Area;
use sediment_core::backend::DisplayEvent;
use sediment_core::color::Color;
use sediment_core::config::{DisplayConfig, RuntimeConfig};
use sediment_core::draw::CondvarSignal;
use sediment_core::error::RefreshError;
use sediment_core::output::DisplayId;
use sediment_core::refresh::Runtime;
use sediment_core::scene::{ObjectId, ObjectTree};
use sediment_core::trace::Tracer;
use sediment_harness::{HeadlessPanel, PanelProbe, ReadyMode};
use sediment_render::ImmediateUnit;

const RED: Color = Color::new(255, 0, 0);
const BLUE: Color = Color::new(0, 0, 255);

struct Rig {
    rt: Runtime,
    tree: ObjectTree,
    small: (DisplayId, PanelProbe),
    offset: (DisplayId, PanelProbe),
}

fn screen(tree: &mut ObjectTree, rt: &mut Runtime, id: DisplayId, color: Color) -> ObjectId {
    let disp = rt.display_mut(id).expect("display");
    let s = tree.create_object(disp.screen_area());
    let mut style = tree.style(s);
    style.bg_color = color;
    tree.set_style(s, style);
    disp.load_screen(s);
    s
}

/// A 16×8 display and a 32×16 display placed at (8, 4) on a 48×24 panel.
fn rig() -> Rig {
    let mut rt = Runtime::with_signal(RuntimeConfig::default(), Arc::new(CondvarSignal::new()));
    rt.add_draw_unit(Box::new(ImmediateUnit::new()));
    let mut tree = ObjectTree::new();

    let cfg = DisplayConfig::new(16, 8);
    let (panel, probe) = HeadlessPanel::new(&cfg, ReadyMode::Immediate);
    let small = rt.register_display(cfg, vec![0; 16 * 8 * 4], None, Box::new(panel));
    let _ = screen(&mut tree, &mut rt, small, RED);

    let cfg = DisplayConfig::new(32, 16).with_offset(8, 4, 48, 24);
    let (panel, offset_probe) = HeadlessPanel::new(&cfg, ReadyMode::Immediate);
    let offset = rt.register_display(cfg, vec![0; 32 * 4 * 4], None, Box::new(panel));
    let _ = screen(&mut tree, &mut rt, offset, BLUE);

    let _ = tree.take_invalidations();
    Rig {
        rt,
        tree,
        small: (small, probe),
        offset: (offset, offset_probe),
    }
}

#[test]
fn each_display_renders_its_own_screen() {
    let mut rig = rig();
    assert_eq!(rig.rt.tick(&rig.tree, &mut Tracer::none()), Ok(2));

    let (_, small) = &rig.small;
    assert_eq!(small.flushes().len(), 1);
    assert_eq!(small.color(0, 0), Some(RED));
    assert_eq!(small.color(15, 7), Some(RED));

    let (_, offset) = &rig.offset;
    let areas: Vec<_> = offset.flushes().iter().map(|f| f.area).collect();
    assert_eq!(
        areas,
        vec![
            Area::new(8, 4, 39, 7),
            Area::new(8, 8, 39, 11),
            Area::new(8, 12, 39, 15),
            Area::new(8, 16, 39, 19),
        ]
    );
    assert_eq!(offset.color(8, 4), Some(BLUE));
    assert_eq!(offset.color(39, 19), Some(BLUE));
    assert_eq!(offset.color(7, 4), Some(Color::BLACK), "outside the display, untouched");
    assert_eq!(offset.color(40, 19), Some(Color::BLACK));
}

#[test]
fn invalidation_goes_to_the_default_display() {
    let mut rig = rig();
    rig.rt.tick(&rig.tree, &mut Tracer::none()).expect("initial tick");
    let (small, small_probe) = &rig.small;
    let (offset, offset_probe) = &rig.offset;
    assert_eq!(rig.rt.displays().default_id(), Some(*small));
    small_probe.reset();
    offset_probe.reset();

    rig.rt.invalidate(None, Some(&Area::new(0, 0, 3, 3)));
    assert_eq!(rig.rt.tick(&rig.tree, &mut Tracer::none()), Ok(1));
    assert_eq!(small_probe.flushes().len(), 1);
    assert!(offset_probe.flushes().is_empty());

    rig.rt.displays_mut().set_default(*offset);
    rig.rt.invalidate(None, Some(&Area::new(0, 0, 3, 3)));
    assert_eq!(rig.rt.tick(&rig.tree, &mut Tracer::none()), Ok(1));
    assert_eq!(
        offset_probe.flushes().first().map(|f| f.area),
        Some(Area::new(8, 4, 11, 7))
    );
    assert_eq!(small_probe.flushes().len(), 1, "the first display stays idle");
}

#[test]
fn removed_display_stops_resolving() {
    let mut rig = rig();
    let (small, _) = rig.small;
    let (offset, _) = rig.offset;

    assert!(rig.rt.remove_display(small));
    assert!(!rig.rt.remove_display(small));
    assert!(rig.rt.display(small).is_none());
    assert_eq!(rig.rt.displays().default_id(), Some(offset), "the next display takes over");
    assert_eq!(
        rig.rt.refresh_now(Some(small), &rig.tree),
        Err(RefreshError::UnknownDisplay(small))
    );
    assert_eq!(rig.rt.tick(&rig.tree, &mut Tracer::none()), Ok(1));
}

#[test]
fn refresh_events_frame_the_flushes() {
    let mut rig = rig();
    rig.rt.tick(&rig.tree, &mut Tracer::none()).expect("initial tick");
    let (small, probe) = &rig.small;
    probe.reset();

    let area = Area::new(2, 2, 5, 5);
    rig.rt.invalidate(Some(*small), Some(&area));
    rig.rt.refresh_now(Some(*small), &rig.tree).expect("refresh");
    assert_eq!(
        probe.events(),
        vec![
            DisplayEvent::RefreshRequest,
            DisplayEvent::RefreshStart,
            DisplayEvent::FlushStart(area),
            DisplayEvent::FlushFinish(area),
            DisplayEvent::RenderReady,
            DisplayEvent::RefreshFinish,
        ]
    );
}
