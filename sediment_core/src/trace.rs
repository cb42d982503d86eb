// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the refresh cycle.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! refresh cycle calls at each stage. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`RefreshSummaryBuilder`] accumulates phase durations and chunk counts
//! during a cycle and produces the [`RefreshSummary`] that
//! [`Runtime::refresh_display`](crate::refresh::Runtime::refresh_display)
//! returns.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates [`LayerEvent`] and damage-rect
//!   events plus the corresponding `TraceSink` methods.

use crate::area::Area;
#[cfg(feature = "trace-rich")]
use crate::color::ColorFormat;
#[cfg(feature = "trace-rich")]
use crate::draw::LayerId;
use crate::output::DisplayId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the refresh cycle is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Merging dirty areas.
    Join,
    /// Walking the scene and draining draw tasks for one chunk.
    Render,
    /// Handing one chunk to the driver.
    Flush,
    /// Copying dirty areas into the other buffer (double-buffered direct mode).
    Sync,
}

/// What happened to a layer.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerEventKind {
    /// A child layer was created.
    Created,
    /// A child layer was composited and freed.
    Released,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a refresh cycle starts.
#[derive(Clone, Copy, Debug)]
pub struct RefreshStartEvent {
    /// Monotonic cycle counter, shared by all displays.
    pub cycle: u64,
    /// Display being refreshed.
    pub display: DisplayId,
    /// Clock value at the start.
    pub timestamp: u64,
    /// Dirty areas waiting, before joining.
    pub pending_areas: usize,
}

/// Marks the beginning of a refresh phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Cycle counter.
    pub cycle: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Clock value at the start of the phase.
    pub timestamp: u64,
}

/// Marks the end of a refresh phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Cycle counter.
    pub cycle: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Clock value at the end of the phase.
    pub timestamp: u64,
}

/// Emitted after a chunk was handed to the driver.
#[derive(Clone, Copy, Debug)]
pub struct FlushEvent {
    /// Cycle counter.
    pub cycle: u64,
    /// Display flushed.
    pub display: DisplayId,
    /// Flushed area, display offset applied.
    pub area: Area,
    /// Whether this was the final chunk of the cycle.
    pub last: bool,
    /// Clock value after the driver returned.
    pub timestamp: u64,
}

/// A layer lifecycle record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct LayerEvent {
    /// Cycle counter.
    pub cycle: u64,
    /// Owning display.
    pub display: DisplayId,
    /// The layer.
    pub layer: LayerId,
    /// Created or released.
    pub kind: LayerEventKind,
    /// Buffer area of the layer.
    pub area: Area,
    /// Pixel format of the layer.
    pub format: ColorFormat,
}

/// Per-cycle summary produced by [`RefreshSummaryBuilder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Cycle counter.
    pub cycle: u64,
    /// Display refreshed.
    pub display: DisplayId,
    /// Unjoined areas rendered.
    pub areas: usize,
    /// Chunks flushed.
    pub chunks: usize,
    /// Pixels flushed, summed over chunks.
    pub pixels: u64,
    /// Join phase duration in ticks (0 if not measured).
    pub join_ticks: u64,
    /// Total render duration over all chunks.
    pub render_ticks: u64,
    /// Total flush duration over all chunks.
    pub flush_ticks: u64,
    /// Buffer sync duration (0 unless double-buffered direct mode).
    pub sync_ticks: u64,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the refresh cycle.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a refresh cycle starts.
    fn on_refresh_start(&mut self, e: &RefreshStartEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after each chunk is flushed.
    fn on_flush(&mut self, e: &FlushEvent) {
        _ = e;
    }

    /// Called with the summary once the cycle is over.
    fn on_refresh_finish(&mut self, s: &RefreshSummary) {
        _ = s;
    }

    /// Called with the joined dirty areas about to be rendered (requires
    /// `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, cycle: u64, rects: &[Area]) {
        _ = (cycle, rects);
    }

    /// Called when a child layer is created or released (requires
    /// `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_layer(&mut self, e: &LayerEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`RefreshStartEvent`].
    #[inline]
    pub fn refresh_start(&mut self, e: &RefreshStartEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_refresh_start(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FlushEvent`].
    #[inline]
    pub fn flush(&mut self, e: &FlushEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_flush(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RefreshSummary`].
    #[inline]
    pub fn refresh_finish(&mut self, s: &RefreshSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_refresh_finish(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits the joined dirty areas (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn damage_rects(&mut self, cycle: u64, rects: &[Area]) {
        if let Some(s) = &mut self.sink {
            s.on_damage_rects(cycle, rects);
        }
    }

    /// Emits a [`LayerEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn layer(&mut self, e: &LayerEvent) {
        if let Some(s) = &mut self.sink {
            s.on_layer(e);
        }
    }
}

// ---------------------------------------------------------------------------
// RefreshSummaryBuilder
// ---------------------------------------------------------------------------

/// Accumulates phase durations and flush counts during a cycle.
///
/// Render and flush run once per chunk; their durations are summed.
#[derive(Debug)]
pub struct RefreshSummaryBuilder {
    summary: RefreshSummary,
    open: [Option<u64>; 4],
    totals: [u64; 4],
}

impl RefreshSummaryBuilder {
    /// Starts a summary for `display` in `cycle`.
    #[must_use]
    pub fn new(cycle: u64, display: DisplayId) -> Self {
        Self {
            summary: RefreshSummary {
                cycle,
                display,
                ..RefreshSummary::default()
            },
            open: [None; 4],
            totals: [0; 4],
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: u64) {
        self.open[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase and adds its duration to the total.
    pub fn phase_end(&mut self, phase: PhaseKind, t: u64) {
        let idx = phase_index(phase);
        if let Some(start) = self.open[idx].take() {
            self.totals[idx] += t.saturating_sub(start);
        }
    }

    /// Sets the number of unjoined areas rendered.
    pub fn set_areas(&mut self, areas: usize) {
        self.summary.areas = areas;
    }

    /// Counts one flushed chunk of `area`.
    pub fn chunk_flushed(&mut self, area: &Area) {
        self.summary.chunks += 1;
        self.summary.pixels += area.size();
    }

    /// Consumes the builder and produces the final [`RefreshSummary`].
    #[must_use]
    pub fn finish(self) -> RefreshSummary {
        RefreshSummary {
            join_ticks: self.totals[phase_index(PhaseKind::Join)],
            render_ticks: self.totals[phase_index(PhaseKind::Render)],
            flush_ticks: self.totals[phase_index(PhaseKind::Flush)],
            sync_ticks: self.totals[phase_index(PhaseKind::Sync)],
            ..self.summary
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Join => 0,
        PhaseKind::Render => 1,
        PhaseKind::Flush => 2,
        PhaseKind::Sync => 3,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_start() -> RefreshStartEvent {
        RefreshStartEvent {
            cycle: 3,
            display: DisplayId(0),
            timestamp: 1_000,
            pending_areas: 2,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_refresh_start(&sample_start());
        sink.on_refresh_finish(&RefreshSummary::default());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.refresh_start(&sample_start());
        tracer.flush(&FlushEvent {
            cycle: 3,
            display: DisplayId(0),
            area: Area::new(0, 0, 9, 9),
            last: true,
            timestamp: 1_010,
        });
    }

    #[test]
    fn summary_builder_sums_repeated_phases() {
        let mut builder = RefreshSummaryBuilder::new(3, DisplayId(1));
        builder.phase_begin(PhaseKind::Join, 0);
        builder.phase_end(PhaseKind::Join, 5);
        for start in [10, 30] {
            builder.phase_begin(PhaseKind::Render, start);
            builder.phase_end(PhaseKind::Render, start + 7);
            builder.phase_begin(PhaseKind::Flush, start + 7);
            builder.phase_end(PhaseKind::Flush, start + 9);
            builder.chunk_flushed(&Area::new(0, 0, 9, 4));
        }
        builder.set_areas(1);

        let summary = builder.finish();
        assert_eq!(summary.join_ticks, 5);
        assert_eq!(summary.render_ticks, 14);
        assert_eq!(summary.flush_ticks, 4);
        assert_eq!(summary.sync_ticks, 0);
        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.pixels, 100);
        assert_eq!(summary.display, DisplayId(1));
    }

    #[test]
    fn unmatched_end_is_ignored() {
        let mut builder = RefreshSummaryBuilder::new(0, DisplayId(0));
        builder.phase_end(PhaseKind::Render, 50);
        assert_eq!(builder.finish().render_ticks, 0);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            cycles: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_refresh_start(&mut self, e: &RefreshStartEvent) {
                self.cycles.push(e.cycle);
            }
        }

        let mut sink = RecordingSink { cycles: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.refresh_start(&sample_start());
        drop(tracer);
        assert_eq!(sink.cycles, &[3]);
    }
}
