// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! [`on_damage_rects`](TraceSink::on_damage_rects) stores only the count.

use sediment_core::area::Area;
use sediment_core::color::ColorFormat;
use sediment_core::draw::LayerId;
use sediment_core::output::DisplayId;
use sediment_core::trace::{
    FlushEvent, LayerEvent, LayerEventKind, PhaseBeginEvent, PhaseEndEvent, PhaseKind, RefreshStartEvent,
    RefreshSummary, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_REFRESH_START: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_FLUSH: u8 = 4;
const TAG_REFRESH_FINISH: u8 = 5;
const TAG_DAMAGE_RECTS_COUNT: u8 = 6;
const TAG_LAYER: u8 = 7;

const FORMATS: [ColorFormat; 6] = [
    ColorFormat::Rgb565,
    ColorFormat::Rgb888,
    ColorFormat::Xrgb8888,
    ColorFormat::Argb8888,
    ColorFormat::L8,
    ColorFormat::A8,
];

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_area(&mut self, a: &Area) {
        for v in [a.x1, a.y1, a.x2, a.y2] {
            self.write_i32(v);
        }
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Join => 0,
            PhaseKind::Render => 1,
            PhaseKind::Flush => 2,
            PhaseKind::Sync => 3,
        });
    }

    fn write_format(&mut self, f: ColorFormat) {
        let idx = FORMATS.iter().position(|x| *x == f).unwrap_or(0);
        self.write_u8(u8::try_from(idx).unwrap_or(0));
    }
}

impl TraceSink for RecorderSink {
    fn on_refresh_start(&mut self, e: &RefreshStartEvent) {
        self.write_u8(TAG_REFRESH_START);
        self.write_u64(e.cycle);
        self.write_u32(e.display.0);
        self.write_u64(e.timestamp);
        self.write_u32(count(e.pending_areas));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.cycle);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.cycle);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp);
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        self.write_u8(TAG_FLUSH);
        self.write_u64(e.cycle);
        self.write_u32(e.display.0);
        self.write_area(&e.area);
        self.write_u8(u8::from(e.last));
        self.write_u64(e.timestamp);
    }

    fn on_refresh_finish(&mut self, s: &RefreshSummary) {
        self.write_u8(TAG_REFRESH_FINISH);
        self.write_u64(s.cycle);
        self.write_u32(s.display.0);
        self.write_u32(count(s.areas));
        self.write_u32(count(s.chunks));
        self.write_u64(s.pixels);
        self.write_u64(s.join_ticks);
        self.write_u64(s.render_ticks);
        self.write_u64(s.flush_ticks);
        self.write_u64(s.sync_ticks);
    }

    fn on_damage_rects(&mut self, cycle: u64, rects: &[Area]) {
        self.write_u8(TAG_DAMAGE_RECTS_COUNT);
        self.write_u64(cycle);
        self.write_u32(count(rects.len()));
    }

    fn on_layer(&mut self, e: &LayerEvent) {
        self.write_u8(TAG_LAYER);
        self.write_u64(e.cycle);
        self.write_u32(e.display.0);
        self.write_u32(e.layer.index());
        self.write_u32(e.layer.generation());
        self.write_u8(match e.kind {
            LayerEventKind::Created => 0,
            LayerEventKind::Released => 1,
        });
        self.write_area(&e.area);
        self.write_format(e.format);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`RefreshStartEvent`].
    RefreshStart(RefreshStartEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`FlushEvent`].
    Flush(FlushEvent),
    /// A [`RefreshSummary`].
    RefreshFinish(RefreshSummary),
    /// Damage-rect count for a cycle.
    DamageRectsCount {
        /// Cycle counter.
        cycle: u64,
        /// Number of damage rects.
        count: u32,
    },
    /// A [`LayerEvent`].
    Layer(LayerEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter { data: bytes, pos: 0 }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.take().map(i32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_count(&mut self) -> Option<usize> {
        self.read_u32().and_then(|n| usize::try_from(n).ok())
    }

    fn read_area(&mut self) -> Option<Area> {
        Some(Area::new(self.read_i32()?, self.read_i32()?, self.read_i32()?, self.read_i32()?))
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Join,
            1 => PhaseKind::Render,
            2 => PhaseKind::Flush,
            _ => PhaseKind::Sync,
        })
    }

    fn read_format(&mut self) -> Option<ColorFormat> {
        FORMATS.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_refresh_start(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RefreshStart(RefreshStartEvent {
            cycle: self.read_u64()?,
            display: DisplayId(self.read_u32()?),
            timestamp: self.read_u64()?,
            pending_areas: self.read_count()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            cycle: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_u64()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            cycle: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_u64()?,
        }))
    }

    fn decode_flush(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Flush(FlushEvent {
            cycle: self.read_u64()?,
            display: DisplayId(self.read_u32()?),
            area: self.read_area()?,
            last: self.read_u8()? != 0,
            timestamp: self.read_u64()?,
        }))
    }

    fn decode_refresh_finish(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RefreshFinish(RefreshSummary {
            cycle: self.read_u64()?,
            display: DisplayId(self.read_u32()?),
            areas: self.read_count()?,
            chunks: self.read_count()?,
            pixels: self.read_u64()?,
            join_ticks: self.read_u64()?,
            render_ticks: self.read_u64()?,
            flush_ticks: self.read_u64()?,
            sync_ticks: self.read_u64()?,
        }))
    }

    fn decode_damage_rects_count(&mut self) -> Option<RecordedEvent> {
        let cycle = self.read_u64()?;
        let count = self.read_u32()?;
        Some(RecordedEvent::DamageRectsCount { cycle, count })
    }

    fn decode_layer(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Layer(LayerEvent {
            cycle: self.read_u64()?,
            display: DisplayId(self.read_u32()?),
            layer: LayerId::from_raw(self.read_u32()?, self.read_u32()?),
            kind: match self.read_u8()? {
                0 => LayerEventKind::Created,
                _ => LayerEventKind::Released,
            },
            area: self.read_area()?,
            format: self.read_format()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_REFRESH_START => self.decode_refresh_start(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_FLUSH => self.decode_flush(),
            TAG_REFRESH_FINISH => self.decode_refresh_finish(),
            TAG_DAMAGE_RECTS_COUNT => self.decode_damage_rects_count(),
            TAG_LAYER => self.decode_layer(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
