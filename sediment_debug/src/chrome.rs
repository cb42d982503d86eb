// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Displays map to processes (`pid`), so several displays refreshed by one
//! runtime show up as separate tracks.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds by dividing by `ticks_per_us`.
/// Phase events carry no display, so they are attributed to the display of
/// the most recent refresh start.
pub fn export(bytes: &[u8], ticks_per_us: f64, writer: &mut dyn Write) -> io::Result<()> {
    let us = |ticks: u64| ticks as f64 / ticks_per_us;
    let mut events: Vec<Value> = Vec::new();
    let mut pid = 0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::RefreshStart(e) => {
                pid = e.display.0;
                events.push(json!({
                    "ph": "i",
                    "name": "RefreshStart",
                    "cat": "Refresh",
                    "ts": us(e.timestamp),
                    "pid": pid,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "cycle": e.cycle,
                        "pending_areas": e.pending_areas,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": format!("{:?}", e.phase),
                    "cat": "Refresh",
                    "ts": us(e.timestamp),
                    "pid": pid,
                    "tid": 0,
                    "args": {
                        "cycle": e.cycle,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": format!("{:?}", e.phase),
                    "cat": "Refresh",
                    "ts": us(e.timestamp),
                    "pid": pid,
                    "tid": 0,
                    "args": {
                        "cycle": e.cycle,
                    }
                }));
            }
            RecordedEvent::Flush(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Flush",
                    "cat": "Flush",
                    "ts": us(e.timestamp),
                    "pid": e.display.0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "cycle": e.cycle,
                        "area": [e.area.x1, e.area.y1, e.area.x2, e.area.y2],
                        "last": e.last,
                    }
                }));
            }
            RecordedEvent::RefreshFinish(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "RefreshSummary",
                    "cat": "Summary",
                    "ts": 0,
                    "pid": s.display.0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "cycle": s.cycle,
                        "areas": s.areas,
                        "chunks": s.chunks,
                        "pixels": s.pixels,
                        "join_us": us(s.join_ticks),
                        "render_us": us(s.render_ticks),
                        "flush_us": us(s.flush_ticks),
                        "sync_us": us(s.sync_ticks),
                    }
                }));
            }
            RecordedEvent::DamageRectsCount { cycle, count } => {
                events.push(json!({
                    "ph": "i",
                    "name": "DamageRects",
                    "cat": "Rich",
                    "ts": 0,
                    "pid": pid,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "cycle": cycle,
                        "count": count,
                    }
                }));
            }
            RecordedEvent::Layer(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("Layer{:?}", e.kind),
                    "cat": "Rich",
                    "ts": 0,
                    "pid": e.display.0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "cycle": e.cycle,
                        "layer": format!("{:?}", e.layer),
                        "area": [e.area.x1, e.area.y1, e.area.x2, e.area.y2],
                        "format": format!("{:?}", e.format),
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
