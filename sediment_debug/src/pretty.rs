// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are converted to microseconds using the clock's ticks per microsecond.

use std::io::Write;

use sediment_core::area::Area;
use sediment_core::trace::{
    FlushEvent, LayerEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, RefreshStartEvent, RefreshSummary,
    TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    ticks_per_us: f64,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("ticks_per_us", &self.ticks_per_us)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(ticks_per_us: f64) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            ticks_per_us,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, ticks_per_us: f64) -> Self {
        Self { writer, ticks_per_us }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, ticks_per_us: f64) -> Self {
        Self { writer, ticks_per_us }
    }

    /// Consumes the sink and returns the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn us(&self, ticks: u64) -> f64 {
        ticks as f64 / self.ticks_per_us
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Join => "join",
        PhaseKind::Render => "render",
        PhaseKind::Flush => "flush",
        PhaseKind::Sync => "sync",
    }
}

fn area(a: &Area) -> String {
    format!("({},{})-({},{})", a.x1, a.y1, a.x2, a.y2)
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_refresh_start(&mut self, e: &RefreshStartEvent) {
        let _ = writeln!(
            self.writer,
            "[refresh] cycle={} display={} at {:.1}µs pending={}",
            e.cycle,
            e.display.0,
            self.us(e.timestamp),
            e.pending_areas,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] cycle={} {} at {:.1}µs",
            e.cycle,
            phase_name(e.phase),
            self.us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] cycle={} {} at {:.1}µs",
            e.cycle,
            phase_name(e.phase),
            self.us(e.timestamp),
        );
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        let last = if e.last { " last" } else { "" };
        let _ = writeln!(
            self.writer,
            "[flush] cycle={} display={} area={}{last}",
            e.cycle,
            e.display.0,
            area(&e.area),
        );
    }

    fn on_refresh_finish(&mut self, s: &RefreshSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] cycle={} display={} areas={} chunks={} px={} join={:.1}µs \
             render={:.1}µs flush={:.1}µs sync={:.1}µs",
            s.cycle,
            s.display.0,
            s.areas,
            s.chunks,
            s.pixels,
            self.us(s.join_ticks),
            self.us(s.render_ticks),
            self.us(s.flush_ticks),
            self.us(s.sync_ticks),
        );
    }

    fn on_damage_rects(&mut self, cycle: u64, rects: &[Area]) {
        let list: Vec<String> = rects.iter().map(area).collect();
        let _ = writeln!(self.writer, "[damage] cycle={cycle} rects=[{}]", list.join(", "));
    }

    fn on_layer(&mut self, e: &LayerEvent) {
        let _ = writeln!(
            self.writer,
            "[layer] cycle={} {:?} {:?} area={} format={:?}",
            e.cycle,
            e.kind,
            e.layer,
            area(&e.area),
            e.format,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sediment_core::output::DisplayId;

    #[test]
    fn lines_per_event() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new(), 1.0);
        sink.on_phase_begin(&PhaseBeginEvent {
            cycle: 4,
            phase: PhaseKind::Flush,
            timestamp: 20,
        });
        sink.on_flush(&FlushEvent {
            cycle: 4,
            display: DisplayId(0),
            area: Area::new(0, 40, 239, 79),
            last: true,
            timestamp: 25,
        });
        sink.on_damage_rects(4, &[Area::new(0, 0, 1, 1), Area::new(5, 5, 6, 6)]);

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[phase:begin] cycle=4 flush at 20.0µs",
                "[flush] cycle=4 display=0 area=(0,40)-(239,79) last",
                "[damage] cycle=4 rects=[(0,0)-(1,1), (5,5)-(6,6)]",
            ]
        );
    }
}
