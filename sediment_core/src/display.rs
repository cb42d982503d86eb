// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Displays, their dirty areas and the display registry.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::area::Area;
use crate::backend::{DisplayBackend, DisplayEvent, FlushState};
use crate::color::ColorFormat;
use crate::config::{DisplayConfig, RenderMode};
use crate::draw::{LayerId, Signal};
use crate::output::DisplayId;
use crate::scene::ObjectId;

/// The bounded list of areas waiting to be redrawn.
///
/// Areas are never removed by [`join`](Self::join); absorbed areas are
/// flagged instead, so indices stay stable for the refresh cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidAreas {
    capacity: usize,
    areas: Vec<Area>,
    joined: Vec<bool>,
}

impl InvalidAreas {
    /// Creates an empty list holding at most `capacity` areas (at least 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            areas: Vec::with_capacity(capacity),
            joined: Vec::with_capacity(capacity),
        }
    }

    /// Maximum number of areas before the list collapses to the screen.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored areas, joined or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Stored areas in insertion order.
    #[must_use]
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    /// Whether the area at `index` was absorbed by another.
    #[must_use]
    pub fn is_joined(&self, index: usize) -> bool {
        self.joined.get(index).copied().unwrap_or(false)
    }

    /// Areas still to be drawn, in order.
    pub fn unjoined(&self) -> impl Iterator<Item = Area> + '_ {
        self.areas
            .iter()
            .zip(&self.joined)
            .filter(|(_, j)| !**j)
            .map(|(a, _)| *a)
    }

    /// Total pixels of the areas still to be drawn.
    #[must_use]
    pub fn unjoined_size(&self) -> u64 {
        self.unjoined().map(|a| a.size()).sum()
    }

    /// Drops every area.
    pub fn clear(&mut self) {
        self.areas.clear();
        self.joined.clear();
    }

    /// Records `area` unless a stored area already contains it. When the
    /// list is full it collapses to the single area `screen`.
    pub fn add(&mut self, area: Area, screen: &Area) {
        if self.areas.iter().any(|a| area.is_in(a, 0)) {
            return;
        }
        if self.areas.len() >= self.capacity {
            self.reset_to(*screen);
            return;
        }
        self.areas.push(area);
        self.joined.push(false);
    }

    /// Replaces the list with the single area `area`.
    pub fn reset_to(&mut self, area: Area) {
        self.clear();
        self.areas.push(area);
        self.joined.push(false);
    }

    /// Merges overlapping areas whose bounding box costs fewer pixels than
    /// drawing both.
    ///
    /// One pass: each unjoined area absorbs every later-tested unjoined area
    /// it overlaps, when `size(union) < size(a) + size(b)`. The pass is not
    /// repeated, so a chain of areas may stay partly unjoined.
    pub fn join(&mut self) {
        let n = self.areas.len();
        for into in 0..n {
            if self.joined[into] {
                continue;
            }
            for from in 0..n {
                if self.joined[from] || into == from {
                    continue;
                }
                let (a, b) = (self.areas[into], self.areas[from]);
                if !a.is_on(&b) {
                    continue;
                }
                let union = a.join(&b);
                if union.size() < a.size() + b.size() {
                    self.areas[into] = union;
                    self.joined[from] = true;
                }
            }
        }
    }
}

/// The objects a display draws, bottom to top.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Screens {
    /// The active screen.
    pub act: Option<ObjectId>,
    /// The screen being replaced during a transition.
    pub prev: Option<ObjectId>,
    /// Drawn above both screens.
    pub top: Option<ObjectId>,
    /// Drawn above everything.
    pub sys: Option<ObjectId>,
    /// Drawn below the screens when neither covers the area.
    pub bottom: Option<ObjectId>,
    /// Draw `prev` above `act` instead of below.
    pub draw_prev_over_act: bool,
}

/// One display: configuration, draw buffers, dirty areas and screens.
pub struct Display {
    pub(crate) config: DisplayConfig,
    pub(crate) bufs: [Option<Vec<u8>>; 2],
    pub(crate) buf_size: usize,
    pub(crate) active: usize,
    pub(crate) double_buffered: bool,
    pub(crate) inv: InvalidAreas,
    pub(crate) screens: Screens,
    pub(crate) backend: Box<dyn DisplayBackend>,
    pub(crate) flush: Arc<FlushState>,
    pub(crate) layer_head: LayerId,
    pub(crate) refreshed_area: Area,

    // -- Per-cycle flags --
    pub(crate) last_area: bool,
    pub(crate) last_part: bool,
    pub(crate) rendering_in_progress: bool,
    pub(crate) refresh_requested: bool,

    inv_disabled: u32,
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Display")
            .field("config", &self.config)
            .field("buf_size", &self.buf_size)
            .field("double_buffered", &self.double_buffered)
            .field("inv", &self.inv)
            .field("screens", &self.screens)
            .field("flush", &self.flush)
            .field("layer_head", &self.layer_head)
            .finish_non_exhaustive()
    }
}

impl Display {
    pub(crate) fn new(
        config: DisplayConfig,
        buf1: Vec<u8>,
        buf2: Option<Vec<u8>>,
        backend: Box<dyn DisplayBackend>,
        layer_head: LayerId,
        inv_capacity: usize,
        signal: Arc<dyn Signal>,
    ) -> Self {
        let buf_size = match &buf2 {
            Some(b) => buf1.len().min(b.len()),
            None => buf1.len(),
        };
        let double_buffered = buf2.is_some();
        Self {
            config,
            bufs: [Some(buf1), buf2],
            buf_size,
            active: 0,
            double_buffered,
            inv: InvalidAreas::new(inv_capacity),
            screens: Screens::default(),
            backend,
            flush: Arc::new(FlushState::new(signal)),
            layer_head,
            refreshed_area: Area::new(0, 0, -1, -1),
            last_area: false,
            last_part: false,
            rendering_in_progress: false,
            refresh_requested: false,
            inv_disabled: 0,
        }
    }

    // -- Geometry --

    /// Static configuration.
    #[must_use]
    pub const fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Logical horizontal resolution (after rotation).
    #[must_use]
    pub const fn hor_res(&self) -> i32 {
        self.config.logical_res().0
    }

    /// Logical vertical resolution (after rotation).
    #[must_use]
    pub const fn ver_res(&self) -> i32 {
        self.config.logical_res().1
    }

    /// The whole screen in logical coordinates.
    #[must_use]
    pub const fn screen_area(&self) -> Area {
        self.config.screen_area()
    }

    /// Pixel format of the draw buffers.
    #[must_use]
    pub const fn color_format(&self) -> ColorFormat {
        self.config.color_format
    }

    /// Render mode.
    #[must_use]
    pub const fn render_mode(&self) -> RenderMode {
        self.config.render_mode
    }

    /// Bytes usable in each draw buffer.
    #[must_use]
    pub const fn buf_size(&self) -> usize {
        self.buf_size
    }

    /// Whether two draw buffers alternate.
    #[must_use]
    pub const fn is_double_buffered(&self) -> bool {
        self.double_buffered
    }

    /// The display's own layer.
    #[must_use]
    pub const fn layer_head(&self) -> LayerId {
        self.layer_head
    }

    // -- Screens --

    /// The screens drawn by this display.
    #[must_use]
    pub const fn screens(&self) -> &Screens {
        &self.screens
    }

    /// The screens, mutably. Changing them does not invalidate anything.
    pub fn screens_mut(&mut self) -> &mut Screens {
        &mut self.screens
    }

    /// Makes `screen` the active screen and invalidates the whole display.
    pub fn load_screen(&mut self, screen: ObjectId) {
        self.screens.act = Some(screen);
        let all = self.screen_area();
        self.invalidate(Some(&all));
    }

    // -- Dirty areas --

    /// Marks `area` for redraw, or drops every pending area for `None`.
    ///
    /// The area is clipped to the screen; an area already covered by a
    /// pending one is not stored again. In [`RenderMode::Full`] any
    /// invalidation becomes the whole screen. The driver may veto or round
    /// the area through [`DisplayBackend::invalidate_area`].
    pub fn invalidate(&mut self, area: Option<&Area>) {
        if self.inv_disabled > 0 {
            return;
        }
        if self.rendering_in_progress {
            log::error!("detected modifying dirty areas in render");
            return;
        }
        let Some(area) = area else {
            self.inv.clear();
            return;
        };
        let screen = self.screen_area();
        let Some(mut area) = area.intersect(&screen) else {
            return;
        };
        if self.config.render_mode == RenderMode::Full {
            self.inv.reset_to(screen);
            self.request_refresh();
            return;
        }
        if !self.backend.invalidate_area(&mut area) {
            return;
        }
        self.inv.add(area, &screen);
        self.request_refresh();
    }

    /// Turns invalidation off or back on. Calls nest: every `false` needs a
    /// matching `true`.
    pub fn enable_invalidation(&mut self, enable: bool) {
        if enable {
            self.inv_disabled = self.inv_disabled.saturating_sub(1);
        } else {
            self.inv_disabled += 1;
        }
    }

    /// Whether [`invalidate`](Self::invalidate) currently records anything.
    #[must_use]
    pub const fn is_invalidation_enabled(&self) -> bool {
        self.inv_disabled == 0
    }

    /// Pending areas.
    #[must_use]
    pub const fn invalid_areas(&self) -> &InvalidAreas {
        &self.inv
    }

    /// Whether a refresh was requested since the last one started.
    #[must_use]
    pub const fn refresh_requested(&self) -> bool {
        self.refresh_requested
    }

    fn request_refresh(&mut self) {
        self.refresh_requested = true;
        self.backend.event(DisplayEvent::RefreshRequest);
    }

    // -- Flush state --

    /// Whether the driver still holds a flushed buffer.
    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.flush.is_flushing()
    }

    /// Whether the flush in progress is the final chunk of its refresh.
    #[must_use]
    pub fn is_flushing_last(&self) -> bool {
        self.flush.is_last()
    }

    /// Whether the display is between the first and last chunk of a refresh.
    #[must_use]
    pub const fn is_rendering(&self) -> bool {
        self.rendering_in_progress
    }
}

/// Owned registry of displays with stable ids and a default display.
///
/// Ids are never reused; a removed display leaves an empty slot.
#[derive(Debug, Default)]
pub struct DisplayManager {
    slots: Vec<Option<Display>>,
    default: Option<DisplayId>,
}

impl DisplayManager {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            default: None,
        }
    }

    /// The id the next inserted display receives.
    pub(crate) fn next_id(&self) -> DisplayId {
        DisplayId(u32::try_from(self.slots.len()).unwrap_or(u32::MAX))
    }

    /// Adds a display; the first one becomes the default.
    pub(crate) fn insert(&mut self, display: Display) -> DisplayId {
        let id = self.next_id();
        self.slots.push(Some(display));
        if self.default.is_none() {
            self.default = Some(id);
        }
        id
    }

    /// Removes a display. If it was the default, the first remaining display
    /// takes over.
    pub(crate) fn remove(&mut self, id: DisplayId) -> Option<Display> {
        let display = self.slots.get_mut(id.0 as usize)?.take()?;
        if self.default == Some(id) {
            self.default = self.ids().next();
        }
        Some(display)
    }

    /// A display.
    #[must_use]
    pub fn get(&self, id: DisplayId) -> Option<&Display> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    /// A display, mutably.
    pub fn get_mut(&mut self, id: DisplayId) -> Option<&mut Display> {
        self.slots.get_mut(id.0 as usize)?.as_mut()
    }

    /// Live display ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = DisplayId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_some())
            .map(|(i, _)| DisplayId(u32::try_from(i).unwrap_or(u32::MAX)))
    }

    /// Number of live displays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|d| d.is_some()).count()
    }

    /// Whether no display is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The default display.
    #[must_use]
    pub const fn default_id(&self) -> Option<DisplayId> {
        self.default
    }

    /// Changes the default display. Unknown ids are ignored.
    pub fn set_default(&mut self, id: DisplayId) {
        if self.get(id).is_some() {
            self.default = Some(id);
        }
    }

    /// `id`, or the default display for `None`.
    #[must_use]
    pub fn resolve(&self, id: Option<DisplayId>) -> Option<DisplayId> {
        id.or(self.default).filter(|id| self.get(*id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::draw::{Pixels, SpinSignal};
    use crate::backend::FlushReady;

    struct Sink {
        veto: bool,
    }

    impl DisplayBackend for Sink {
        fn flush(&mut self, _area: &Area, _px: Pixels<'_>, ready: FlushReady) {
            ready.ready();
        }

        fn invalidate_area(&mut self, area: &mut Area) -> bool {
            // Round to even rows.
            area.y1 &= !1;
            area.y2 |= 1;
            !self.veto
        }
    }

    fn display(config: DisplayConfig, capacity: usize, veto: bool) -> Display {
        Display::new(
            config,
            vec![0; 16],
            None,
            Box::new(Sink { veto }),
            LayerId { idx: 0, generation: 0 },
            capacity,
            Arc::new(SpinSignal::new()),
        )
    }

    #[test]
    fn invalidate_clips_rounds_and_dedups() {
        let mut d = display(DisplayConfig::new(100, 100), 8, false);
        d.invalidate(Some(&Area::new(-10, 3, 10, 4)));
        assert_eq!(d.invalid_areas().areas(), &[Area::new(0, 2, 10, 5)]);
        assert!(d.refresh_requested());

        d.invalidate(Some(&Area::new(1, 2, 5, 3)));
        assert_eq!(d.invalid_areas().len(), 1, "contained area is not stored");

        d.invalidate(Some(&Area::new(200, 200, 300, 300)));
        assert_eq!(d.invalid_areas().len(), 1, "off-screen area is ignored");

        d.invalidate(None);
        assert!(d.invalid_areas().is_empty());
    }

    #[test]
    fn veto_drops_area() {
        let mut d = display(DisplayConfig::new(100, 100), 8, true);
        d.invalidate(Some(&Area::new(0, 0, 9, 9)));
        assert!(d.invalid_areas().is_empty());
        assert!(!d.refresh_requested());
    }

    #[test]
    fn overflow_collapses_to_screen() {
        let mut d = display(DisplayConfig::new(100, 100), 2, false);
        d.invalidate(Some(&Area::new(0, 0, 1, 1)));
        d.invalidate(Some(&Area::new(10, 10, 11, 11)));
        d.invalidate(Some(&Area::new(20, 20, 21, 21)));
        assert_eq!(d.invalid_areas().areas(), &[Area::new(0, 0, 99, 99)]);
    }

    #[test]
    fn full_mode_always_invalidates_screen() {
        let cfg = DisplayConfig::new(50, 40).with_render_mode(RenderMode::Full);
        let mut d = display(cfg, 8, true);
        d.invalidate(Some(&Area::new(3, 3, 4, 4)));
        assert_eq!(d.invalid_areas().areas(), &[Area::new(0, 0, 49, 39)]);
    }

    #[test]
    fn disabled_and_rendering_refuse_changes() {
        let mut d = display(DisplayConfig::new(100, 100), 8, false);
        d.enable_invalidation(false);
        d.enable_invalidation(false);
        d.enable_invalidation(true);
        d.invalidate(Some(&Area::new(0, 0, 9, 9)));
        assert!(d.invalid_areas().is_empty());
        d.enable_invalidation(true);
        assert!(d.is_invalidation_enabled());

        d.rendering_in_progress = true;
        d.invalidate(Some(&Area::new(0, 0, 9, 9)));
        d.invalidate(None);
        assert!(d.invalid_areas().is_empty());
    }

    #[test]
    fn rotation_swaps_logical_resolution() {
        let cfg = DisplayConfig::new(320, 240).with_rotation(crate::config::Rotation::R90, false);
        let d = display(cfg, 8, false);
        assert_eq!(d.screen_area(), Area::new(0, 0, 239, 319));
    }

    #[test]
    fn join_merges_overlapping_areas() {
        let mut inv = InvalidAreas::new(8);
        let screen = Area::new(0, 0, 99, 99);
        inv.add(Area::new(0, 0, 9, 9), &screen);
        inv.add(Area::new(2, 2, 11, 11), &screen);
        inv.join();
        assert_eq!(inv.unjoined().collect::<Vec<_>>(), vec![Area::new(0, 0, 11, 11)]);
        assert!(inv.is_joined(1));
    }

    #[test]
    fn join_keeps_distant_areas_apart() {
        let mut inv = InvalidAreas::new(8);
        let screen = Area::new(0, 0, 999, 999);
        inv.add(Area::new(0, 0, 9, 9), &screen);
        inv.add(Area::new(990, 990, 999, 999), &screen);
        inv.join();
        assert_eq!(inv.unjoined().count(), 2);
    }

    #[test]
    fn join_rejects_barely_overlapping_areas() {
        let mut inv = InvalidAreas::new(8);
        let screen = Area::new(0, 0, 99, 99);
        inv.add(Area::new(0, 0, 9, 9), &screen);
        inv.add(Area::new(5, 5, 14, 14), &screen);
        inv.join();
        // 225 pixels joined vs. 200 separately.
        assert_eq!(inv.unjoined().count(), 2);
    }

    #[test]
    fn manager_keeps_ids_stable() {
        let mut m = DisplayManager::new();
        let a = m.insert(display(DisplayConfig::new(10, 10), 4, false));
        let b = m.insert(display(DisplayConfig::new(20, 20), 4, false));
        assert_eq!(m.default_id(), Some(a));
        assert!(m.remove(a).is_some());
        assert_eq!(m.default_id(), Some(b));
        assert_eq!(m.resolve(None), Some(b));
        assert_eq!(m.resolve(Some(a)), None);
        let c = m.insert(display(DisplayConfig::new(30, 30), 4, false));
        assert_ne!(c, a);
        assert_eq!(m.ids().collect::<Vec<_>>(), vec![b, c]);
    }
}
