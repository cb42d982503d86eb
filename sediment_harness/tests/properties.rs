// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for the region joiner, area clipping and band splitting.

use proptest::prelude::*;
use sediment_core::area::Area;
use sediment_core::config::DisplayConfig;
use sediment_core::display::InvalidAreas;
use sediment_harness::Bench;

const W: i32 = 64;
const H: i32 = 48;

fn arb_area() -> impl Strategy<Value = Area> {
    (0..W, 0..H, 1..=W, 1..=H)
        .prop_map(|(x, y, w, h)| Area::new(x, y, (x + w - 1).min(W - 1), (y + h - 1).min(H - 1)))
}

proptest! {
    #[test]
    fn join_never_regresses_total_area(rects in prop::collection::vec(arb_area(), 1..12)) {
        let screen = Area::new(0, 0, W - 1, H - 1);
        let mut inv = InvalidAreas::new(32);
        for r in &rects {
            inv.add(*r, &screen);
        }
        let before = inv.unjoined_size();
        inv.join();
        prop_assert!(inv.unjoined_size() <= before);

        // Everything that was dirty is still covered.
        for r in &rects {
            prop_assert!(inv.unjoined().any(|a| r.is_in(&a, 0)), "{r:?} lost");
        }
    }

    #[test]
    fn clipping_is_idempotent(a in arb_area(), b in arb_area()) {
        let once = a.intersect(&b);
        prop_assert_eq!(once, b.intersect(&a));
        if let Some(c) = once {
            prop_assert_eq!(c.intersect(&b), Some(c));
            prop_assert!(c.is_in(&a, 0) && c.is_in(&b, 0));
        } else {
            prop_assert!(!a.is_on(&b));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn bands_cover_the_area_exactly(area in arb_area(), rows in 1_usize..20) {
        let mut bench = Bench::new(DisplayConfig::new(W, H), rows);
        bench.runtime.invalidate(Some(bench.display), None);
        bench.invalidate(area);
        let summary = bench.refresh().expect("refresh");

        let budget = rows as u64 * W as u64;
        let flushes = bench.panel.flushes();
        prop_assert!(!flushes.is_empty());
        let mut next = area.y1;
        for (i, f) in flushes.iter().enumerate() {
            prop_assert_eq!((f.area.x1, f.area.x2), (area.x1, area.x2));
            prop_assert_eq!(f.area.y1, next);
            prop_assert!(f.area.height() >= 1);
            prop_assert!(f.area.size() <= budget, "{:?} overflows the buffer", f.area);
            prop_assert_eq!(f.last, i + 1 == flushes.len());
            next = f.area.y2 + 1;
        }
        prop_assert_eq!(next, area.y2 + 1);
        prop_assert_eq!(summary.pixels, area.size());
    }
}
