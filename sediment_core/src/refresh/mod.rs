// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The refresh cycle.
//!
//! [`Runtime`] owns the displays and the draw dispatcher. One call to
//! [`Runtime::refresh_display`] runs one cycle of one display:
//!
//! 1. **Join** the pending dirty areas ([`InvalidAreas::join`]).
//! 2. For every unjoined area, **chunk** it into bands that fit the draw
//!    buffer (whole screen in `Direct` and `Full` mode).
//! 3. For every band, find the topmost covering object with the
//!    **occlusion** scan, **walk** the scene from there producing draw tasks,
//!    drain the tasks through the draw units and **flush** the band.
//! 4. In double-buffered `Direct` mode, copy the redrawn areas into the other
//!    buffer so both stay in sync.
//!
//! [`InvalidAreas::join`]: crate::display::InvalidAreas::join

mod chunk;
mod flush;
mod occlusion;
mod walker;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::area::Area;
use crate::backend::{DisplayBackend, DisplayEvent};
use crate::config::{DisplayConfig, RenderMode, Rotation, RuntimeConfig};
use crate::display::{Display, DisplayManager};
use crate::draw::{DispatchStats, Dispatcher, DrawUnit, Pixels, PixelsMut, Signal, default_signal};
use crate::error::RefreshError;
use crate::output::DisplayId;
use crate::scene::{ObjectTree, Scene};
use crate::trace::{
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, RefreshStartEvent, RefreshSummary, RefreshSummaryBuilder,
    Tracer,
};

pub use occlusion::find_top_covering_object;

fn zero_clock() -> u64 {
    0
}

/// Displays, draw units and the refresh cycle that ties them together.
pub struct Runtime {
    displays: DisplayManager,
    draw: Dispatcher,
    config: RuntimeConfig,
    refreshing: Option<DisplayId>,
    cycle: u64,
    clock: fn() -> u64,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("displays", &self.displays)
            .field("draw", &self.draw)
            .field("config", &self.config)
            .field("refreshing", &self.refreshing)
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Creates a runtime with the platform's default wake-up signal.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_signal(config, default_signal())
    }

    /// Creates a runtime whose dispatch requests go through `signal`.
    #[must_use]
    pub fn with_signal(config: RuntimeConfig, signal: Arc<dyn Signal>) -> Self {
        Self {
            displays: DisplayManager::new(),
            draw: Dispatcher::new(config.layer_max_memory_kb, signal),
            config,
            refreshing: None,
            cycle: 0,
            clock: zero_clock,
        }
    }

    /// Installs the clock used for trace timestamps.
    pub fn set_clock(&mut self, clock: fn() -> u64) {
        self.clock = clock;
    }

    /// Runtime settings.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // -- Displays --

    /// Registers a display with one or two draw buffers.
    ///
    /// In `Direct` and `Full` mode each buffer must hold the whole screen.
    pub fn register_display(
        &mut self,
        config: DisplayConfig,
        buf1: Vec<u8>,
        buf2: Option<Vec<u8>>,
        backend: Box<dyn DisplayBackend>,
    ) -> DisplayId {
        let id = self.displays.next_id();
        let head = self
            .draw
            .queue
            .add_display(id, config.screen_area(), config.color_format);
        let display = Display::new(
            config,
            buf1,
            buf2,
            backend,
            head,
            self.config.inv_buf_size,
            default_signal(),
        );
        let inserted = self.displays.insert(display);
        debug_assert_eq!(inserted, id, "display ids are assigned in order");
        log::debug!("registered display {id:?} ({}x{})", config.hor_res, config.ver_res);
        inserted
    }

    /// Removes a display together with its layers. Returns whether it
    /// existed.
    pub fn remove_display(&mut self, id: DisplayId) -> bool {
        if self.displays.remove(id).is_none() {
            return false;
        }
        self.draw.wait_for_units();
        self.draw.queue.remove_display(id);
        true
    }

    /// The display registry.
    #[must_use]
    pub const fn displays(&self) -> &DisplayManager {
        &self.displays
    }

    /// The display registry, mutably (e.g. to change the default display).
    pub fn displays_mut(&mut self) -> &mut DisplayManager {
        &mut self.displays
    }

    /// A display.
    #[must_use]
    pub fn display(&self, id: DisplayId) -> Option<&Display> {
        self.displays.get(id)
    }

    /// A display, mutably.
    pub fn display_mut(&mut self, id: DisplayId) -> Option<&mut Display> {
        self.displays.get_mut(id)
    }

    /// Rotates a display and invalidates all of it.
    pub fn set_rotation(&mut self, id: DisplayId, rotation: Rotation) {
        let Some(disp) = self.displays.get_mut(id) else {
            return;
        };
        disp.config.rotation = rotation;
        let screen = disp.screen_area();
        self.draw.queue.set_screen(id, screen);
        disp.invalidate(Some(&screen));
    }

    // -- Drawing --

    /// Registers a draw unit.
    pub fn add_draw_unit(&mut self, unit: Box<dyn DrawUnit>) {
        self.draw.add_unit(unit);
    }

    /// The draw dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.draw
    }

    /// The draw dispatcher, mutably.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.draw
    }

    /// The signal draw units notify when they finish work on another thread.
    #[must_use]
    pub fn dispatch_signal(&self) -> Arc<dyn Signal> {
        self.draw.queue.signal()
    }

    /// Dispatch counters.
    #[must_use]
    pub const fn stats(&self) -> DispatchStats {
        self.draw.queue.stats()
    }

    // -- Invalidation --

    /// Invalidates `area` on `display` (the default display for `None`);
    /// `None` for the area drops every pending area.
    pub fn invalidate(&mut self, display: Option<DisplayId>, area: Option<&Area>) {
        let Some(id) = self.displays.resolve(display) else {
            log::warn!("invalidate: no display");
            return;
        };
        if let Some(disp) = self.displays.get_mut(id) {
            disp.invalidate(area);
        }
    }

    /// Drains the dirty channels of `tree` and invalidates every area it
    /// reports on `display`. Returns the number of areas.
    pub fn invalidate_objects(&mut self, display: Option<DisplayId>, tree: &mut ObjectTree) -> usize {
        let areas = tree.take_invalidations();
        for area in &areas {
            self.invalidate(display, Some(area));
        }
        areas.len()
    }

    // -- Refresh --

    /// Runs one refresh cycle of `id` against `scene`.
    ///
    /// # Errors
    ///
    /// Returns an error (and logs it) when no draw unit is registered, the
    /// display is unknown or has no draw buffer, or no band height fits the
    /// draw buffer after rounding.
    pub fn refresh_display(
        &mut self,
        id: DisplayId,
        scene: &dyn Scene,
        tracer: &mut Tracer<'_>,
    ) -> Result<RefreshSummary, RefreshError> {
        if self.draw.unit_count() == 0 {
            log::warn!("no draw unit registered");
            return Err(RefreshError::NoDrawUnit);
        }
        let Some(disp) = self.displays.get_mut(id) else {
            log::warn!("refresh of unknown display {id:?}");
            return Err(RefreshError::UnknownDisplay(id));
        };
        if disp.buf_size == 0 || disp.bufs[disp.active].is_none() {
            log::warn!("display {id:?} has no draw buffer");
            return Err(RefreshError::NoDrawBuffer(id));
        }

        self.cycle += 1;
        let cycle = self.cycle;
        disp.refresh_requested = false;
        self.refreshing = Some(id);
        let cx = RefreshCx {
            id,
            disp,
            draw: &mut self.draw,
            scene,
            config: &self.config,
            tracer,
            summary: RefreshSummaryBuilder::new(cycle, id),
            cycle,
            clock: self.clock,
        };
        let res = cx.run();
        self.refreshing = None;
        res
    }

    /// Refreshes `display` right away, or every display for `None`.
    ///
    /// # Errors
    ///
    /// [`RefreshError::NoDisplay`] when there is nothing to refresh, otherwise
    /// the first error of [`refresh_display`](Self::refresh_display).
    pub fn refresh_now(&mut self, display: Option<DisplayId>, scene: &dyn Scene) -> Result<(), RefreshError> {
        let ids: Vec<DisplayId> = match display {
            Some(id) => vec![id],
            None => self.displays.ids().collect(),
        };
        if ids.is_empty() {
            log::warn!("no display registered");
            return Err(RefreshError::NoDisplay);
        }
        let mut tracer = Tracer::none();
        for id in ids {
            self.refresh_display(id, scene, &mut tracer)?;
        }
        Ok(())
    }

    /// Refreshes every display that requested it. Returns how many were
    /// refreshed.
    ///
    /// # Errors
    ///
    /// The first error of [`refresh_display`](Self::refresh_display).
    pub fn tick(&mut self, scene: &dyn Scene, tracer: &mut Tracer<'_>) -> Result<usize, RefreshError> {
        let due: Vec<DisplayId> = self
            .displays
            .ids()
            .filter(|id| self.displays.get(*id).is_some_and(Display::refresh_requested))
            .collect();
        for id in &due {
            self.refresh_display(*id, scene, tracer)?;
        }
        Ok(due.len())
    }

    /// The display currently being refreshed, if any.
    #[must_use]
    pub const fn disp_refreshing(&self) -> Option<DisplayId> {
        self.refreshing
    }

    /// Whether the flush in progress on `id` is the last of its cycle.
    #[must_use]
    pub fn is_flushing_last(&self, id: DisplayId) -> bool {
        self.displays.get(id).is_some_and(Display::is_flushing_last)
    }
}

/// State of one refresh cycle of one display.
pub(crate) struct RefreshCx<'a, 't> {
    pub(crate) id: DisplayId,
    pub(crate) disp: &'a mut Display,
    pub(crate) draw: &'a mut Dispatcher,
    pub(crate) scene: &'a dyn Scene,
    pub(crate) config: &'a RuntimeConfig,
    pub(crate) tracer: &'a mut Tracer<'t>,
    pub(crate) summary: RefreshSummaryBuilder,
    pub(crate) cycle: u64,
    pub(crate) clock: fn() -> u64,
}

impl RefreshCx<'_, '_> {
    fn run(mut self) -> Result<RefreshSummary, RefreshError> {
        self.tracer.refresh_start(&RefreshStartEvent {
            cycle: self.cycle,
            display: self.id,
            timestamp: (self.clock)(),
            pending_areas: self.disp.inv.len(),
        });
        self.disp.backend.event(DisplayEvent::RefreshStart);

        if self.disp.screens.act.is_none() {
            self.disp.inv.clear();
            log::warn!("display {:?} has no active screen", self.id);
            return Ok(self.finish());
        }

        self.phase_begin(PhaseKind::Join);
        self.disp.inv.join();
        self.phase_end(PhaseKind::Join);

        let areas: Vec<Area> = self.disp.inv.unjoined().collect();
        #[cfg(feature = "trace-rich")]
        self.tracer.damage_rects(self.cycle, &areas);
        self.summary.set_areas(areas.len());

        if !areas.is_empty() {
            if let Err(e) = self.refresh_areas(&areas) {
                log::error!("refresh of display {:?} aborted: {e}", self.id);
                let _ = self.finish();
                return Err(e);
            }
            self.disp.backend.event(DisplayEvent::RenderReady);
            if self.disp.double_buffered && self.disp.config.render_mode == RenderMode::Direct {
                self.sync_buffers(&areas);
            }
        }

        Ok(self.finish())
    }

    fn refresh_areas(&mut self, areas: &[Area]) -> Result<(), RefreshError> {
        let last = areas.len() - 1;
        self.disp.last_area = false;
        self.disp.last_part = false;
        self.disp.rendering_in_progress = true;
        for (i, area) in areas.iter().enumerate() {
            self.disp.last_area = i == last;
            self.disp.last_part = false;
            if let Err(e) = self.refresh_area(area) {
                self.disp.rendering_in_progress = false;
                return Err(e);
            }
        }
        self.disp.rendering_in_progress = false;
        Ok(())
    }

    /// Copies the redrawn areas from the on-screen buffer into the one that
    /// will be drawn next.
    fn sync_buffers(&mut self, areas: &[Area]) {
        self.phase_begin(PhaseKind::Sync);
        let disp = &mut *self.disp;
        disp.flush.wait_idle();
        let screen = disp.screen_area();
        let format = disp.config.color_format;
        let [b0, b1] = &mut disp.bufs;
        let (dst, src) = if disp.active == 0 { (b0, b1) } else { (b1, b0) };
        if let (Some(dst), Some(src)) = (dst.as_mut(), src.as_ref()) {
            for area in areas {
                disp.backend.buffer_copy(
                    PixelsMut::new(dst, screen, format),
                    Pixels::new(src, screen, format),
                    area,
                );
            }
        }
        self.phase_end(PhaseKind::Sync);
    }

    fn finish(self) -> RefreshSummary {
        let Self {
            disp, tracer, summary, ..
        } = self;
        disp.inv.clear();
        disp.last_area = false;
        disp.last_part = false;
        disp.backend.event(DisplayEvent::RefreshFinish);
        let summary = summary.finish();
        tracer.refresh_finish(&summary);
        summary
    }

    // -- Tracing --

    pub(crate) fn phase_begin(&mut self, phase: PhaseKind) {
        let timestamp = (self.clock)();
        self.summary.phase_begin(phase, timestamp);
        self.tracer.phase_begin(&PhaseBeginEvent {
            cycle: self.cycle,
            phase,
            timestamp,
        });
    }

    pub(crate) fn phase_end(&mut self, phase: PhaseKind) {
        let timestamp = (self.clock)();
        self.summary.phase_end(phase, timestamp);
        self.tracer.phase_end(&PhaseEndEvent {
            cycle: self.cycle,
            phase,
            timestamp,
        });
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A recording backend and an instant draw unit for refresh tests.

    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use crate::area::Area;
    use crate::backend::{DisplayBackend, DisplayEvent, FlushReady};
    use crate::draw::{DrawQueue, DrawUnit, LayerId, LayerInfo, Pixels, TaskKind, TaskState};

    /// What the backend saw.
    #[derive(Debug, Default)]
    pub(crate) struct Log {
        pub(crate) flushes: Vec<(Area, bool)>,
        pub(crate) events: Vec<DisplayEvent>,
        pub(crate) layers: Vec<LayerInfo>,
        pub(crate) released: usize,
        pub(crate) tasks: Vec<(LayerId, TaskKind)>,
    }

    pub(crate) type Shared = Rc<RefCell<Log>>;

    pub(crate) struct Backend(pub(crate) Shared);

    impl DisplayBackend for Backend {
        fn flush(&mut self, area: &Area, _px: Pixels<'_>, ready: FlushReady) {
            self.0.borrow_mut().flushes.push((*area, ready.is_last()));
            ready.ready();
        }

        fn event(&mut self, event: DisplayEvent) {
            self.0.borrow_mut().events.push(event);
        }

        fn layer_init(&mut self, layer: &LayerInfo) {
            self.0.borrow_mut().layers.push(*layer);
        }

        fn layer_deinit(&mut self, _layer: &LayerInfo) {
            self.0.borrow_mut().released += 1;
        }
    }

    /// Marks every available task ready without touching pixels.
    pub(crate) struct Instant(pub(crate) Shared);

    impl DrawUnit for Instant {
        fn dispatch(&mut self, queue: &mut DrawQueue, layer: LayerId) -> i32 {
            let mut n = 0;
            while let Some(t) = queue.next_available_task(layer, None) {
                queue.set_task_state(t, TaskState::InProgress);
                self.0.borrow_mut().tasks.push((layer, queue.task(t).kind.clone()));
                queue.set_task_state(t, TaskState::Ready);
                n += 1;
            }
            if n > 0 {
                queue.request_dispatch();
            }
            n
        }
    }
}
