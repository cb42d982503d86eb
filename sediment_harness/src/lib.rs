// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless harness for driving sediment end to end.
//!
//! - [`HeadlessPanel`] is a
//!   [`DisplayBackend`](sediment_core::backend::DisplayBackend) that copies every flushed
//!   chunk into an in-memory framebuffer and records what the refresh loop
//!   told it. The matching [`PanelProbe`] reads that record from the test.
//! - [`TallyUnit`] is a draw unit that completes tasks without touching
//!   pixels and remembers what it was given.
//! - [`Bench`] wires a runtime, one display, an object tree and its screen
//!   together.

mod panel;
mod tally;

use std::sync::Arc;

use sediment_core::area::Area;
use sediment_core::color::Color;
use sediment_core::config::{DisplayConfig, RuntimeConfig};
use sediment_core::draw::CondvarSignal;
use sediment_core::error::RefreshError;
use sediment_core::output::DisplayId;
use sediment_core::refresh::Runtime;
use sediment_core::scene::{ObjStyle, ObjectId, ObjectTree};
use sediment_core::trace::{RefreshSummary, TraceSink, Tracer};
use sediment_render::ImmediateUnit;

pub use panel::{FlushRecord, HeadlessPanel, PanelProbe, ReadyMode};
pub use tally::{TallyProbe, TallyUnit, TaskRecord};

/// How a [`Bench`] display is set up.
#[derive(Clone, Copy, Debug)]
pub struct BenchOptions {
    /// Rows per draw buffer; `None` for a screen-sized buffer.
    pub rows: Option<usize>,
    /// Register a second draw buffer.
    pub double_buffered: bool,
    /// How the panel completes flushes.
    pub ready: ReadyMode,
    /// Runtime settings.
    pub runtime: RuntimeConfig,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            rows: None,
            double_buffered: false,
            ready: ReadyMode::Immediate,
            runtime: RuntimeConfig::default(),
        }
    }
}

/// A runtime with one headless display showing one object tree.
#[derive(Debug)]
pub struct Bench {
    /// The runtime.
    pub runtime: Runtime,
    /// The display.
    pub display: DisplayId,
    /// What the display's panel saw.
    pub panel: PanelProbe,
    /// The scene.
    pub tree: ObjectTree,
    /// The active screen, covering the whole display.
    pub screen: ObjectId,
}

impl Bench {
    /// A display drawn by the software unit through a buffer of `rows` rows.
    #[must_use]
    pub fn new(config: DisplayConfig, rows: usize) -> Self {
        let mut bench = Self::bare(
            config,
            BenchOptions {
                rows: Some(rows),
                ..BenchOptions::default()
            },
        );
        bench.runtime.add_draw_unit(Box::new(ImmediateUnit::new()));
        bench
    }

    /// A display with no draw unit registered yet.
    ///
    /// The runtime blocks on a condition variable, so units may complete
    /// work on other threads.
    #[must_use]
    pub fn bare(config: DisplayConfig, options: BenchOptions) -> Self {
        let mut runtime = Runtime::with_signal(options.runtime, Arc::new(CondvarSignal::new()));
        let (panel, probe) = HeadlessPanel::new(&config, options.ready);

        let (w, h) = config.logical_res();
        let rows = options
            .rows
            .unwrap_or_else(|| usize::try_from(h).unwrap_or(0));
        let bytes = usize::try_from(w).unwrap_or(0) * rows * config.color_format.size();
        let buf2 = options.double_buffered.then(|| vec![0; bytes]);
        let display = runtime.register_display(config, vec![0; bytes], buf2, Box::new(panel));

        let mut tree = ObjectTree::new();
        let screen = tree.create_object(Area::new(0, 0, w - 1, h - 1));
        if let Some(disp) = runtime.display_mut(display) {
            disp.load_screen(screen);
        }
        // The screen load already invalidated everything.
        let _ = tree.take_invalidations();

        Self {
            runtime,
            display,
            panel: probe,
            tree,
            screen,
        }
    }

    // -- Scene building --

    /// Adds an opaque rectangle of `color` under `parent`.
    pub fn rect(&mut self, parent: ObjectId, area: Area, color: Color) -> ObjectId {
        let obj = self.tree.create_object(area);
        self.tree.add_child(parent, obj);
        self.restyle(obj, |s| s.bg_color = color);
        obj
    }

    /// Edits the style of `obj` in place.
    pub fn restyle(&mut self, obj: ObjectId, f: impl FnOnce(&mut ObjStyle)) {
        let mut style = self.tree.style(obj);
        f(&mut style);
        self.tree.set_style(obj, style);
    }

    // -- Refresh --

    /// Invalidates `area` on the display.
    pub fn invalidate(&mut self, area: Area) {
        self.runtime.invalidate(Some(self.display), Some(&area));
    }

    /// Moves the tree's pending changes to the display. Returns how many
    /// areas were invalidated.
    pub fn commit(&mut self) -> usize {
        self.runtime
            .invalidate_objects(Some(self.display), &mut self.tree)
    }

    /// Commits pending changes and refreshes the display.
    ///
    /// # Errors
    ///
    /// See [`Runtime::refresh_display`].
    pub fn refresh(&mut self) -> Result<RefreshSummary, RefreshError> {
        self.refresh_with(&mut Tracer::none())
    }

    /// Like [`refresh`](Self::refresh), reporting to `sink`.
    ///
    /// # Errors
    ///
    /// See [`Runtime::refresh_display`].
    pub fn refresh_traced(&mut self, sink: &mut dyn TraceSink) -> Result<RefreshSummary, RefreshError> {
        self.refresh_with(&mut Tracer::new(sink))
    }

    fn refresh_with(&mut self, tracer: &mut Tracer<'_>) -> Result<RefreshSummary, RefreshError> {
        self.commit();
        let summary = self
            .runtime
            .refresh_display(self.display, &self.tree, tracer)?;
        log::debug!(
            "bench refresh {}: {} chunks, {} px",
            summary.cycle,
            summary.chunks,
            summary.pixels
        );
        Ok(summary)
    }
}
