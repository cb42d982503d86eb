// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositing layers.

use alloc::vec::Vec;
use core::fmt;

use crate::area::Area;
use crate::color::ColorFormat;
use crate::output::DisplayId;

use super::pixels::{Pixels, PixelsMut};
use super::task::TaskId;

/// A handle to a layer in a [`DrawQueue`](super::DrawQueue).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a layer is released and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl LayerId {
    /// Rebuilds a handle from its parts, e.g. one recorded by a draw unit
    /// that crossed a thread boundary. A handle that never existed is simply
    /// stale.
    #[inline]
    #[must_use]
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self {
            idx: index,
            generation,
        }
    }

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({}@gen{})", self.idx, self.generation)
    }
}

/// A drawing target.
///
/// The display's own layer borrows the display's active draw buffer for the
/// duration of one band (`loaned`); every other layer owns a buffer that the
/// dispatch pass allocates on first use and frees once the layer has been
/// composited into its parent.
#[derive(Debug)]
pub struct Layer {
    pub(crate) buf: Option<Vec<u8>>,
    pub(crate) loaned: bool,
    pub(crate) buf_area: Area,
    pub(crate) clip_area: Area,
    pub(crate) color_format: ColorFormat,
    pub(crate) parent: Option<LayerId>,
    pub(crate) display: DisplayId,
    pub(crate) tasks: Vec<TaskId>,
    pub(crate) all_tasks_added: bool,
}

impl Layer {
    /// Placement of the buffer in absolute coordinates.
    #[must_use]
    pub const fn buf_area(&self) -> Area {
        self.buf_area
    }

    /// Current drawing restriction.
    #[must_use]
    pub const fn clip_area(&self) -> Area {
        self.clip_area
    }

    /// Pixel format.
    #[must_use]
    pub const fn color_format(&self) -> ColorFormat {
        self.color_format
    }

    /// The layer this one is composited into, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<LayerId> {
        self.parent
    }

    /// The display the layer belongs to.
    #[must_use]
    pub const fn display(&self) -> DisplayId {
        self.display
    }

    /// Tasks in submission order.
    #[must_use]
    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    /// Whether the producer has finished adding tasks.
    #[must_use]
    pub const fn all_tasks_added(&self) -> bool {
        self.all_tasks_added
    }

    /// Whether a buffer is attached.
    #[must_use]
    pub const fn has_buffer(&self) -> bool {
        self.buf.is_some()
    }

    /// Bytes a buffer for this layer needs.
    #[must_use]
    pub const fn buf_size(&self) -> usize {
        self.buf_area.size() as usize * self.color_format.size()
    }

    /// Read-only view of the buffer.
    #[must_use]
    pub fn pixels(&self) -> Option<Pixels<'_>> {
        let data = self.buf.as_deref()?;
        Some(Pixels::new(data, self.buf_area, self.color_format))
    }

    /// Mutable view of the buffer.
    pub fn pixels_mut(&mut self) -> Option<PixelsMut<'_>> {
        let data = self.buf.as_deref_mut()?;
        Some(PixelsMut::new(data, self.buf_area, self.color_format))
    }

    /// A description for driver hooks.
    #[must_use]
    pub const fn info(&self, id: LayerId) -> LayerInfo {
        LayerInfo {
            id,
            buf_area: self.buf_area,
            color_format: self.color_format,
            parent: self.parent,
        }
    }
}

/// Summary of a layer passed to the driver's layer hooks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerInfo {
    /// The layer.
    pub id: LayerId,
    /// Placement in absolute coordinates.
    pub buf_area: Area,
    /// Pixel format.
    pub color_format: ColorFormat,
    /// Parent layer.
    pub parent: Option<LayerId>,
}

/// Memory a buffer of `bytes` bytes is accounted as, in KiB (at least 1).
#[must_use]
pub const fn size_kb(bytes: usize) -> usize {
    if bytes < 1024 { 1 } else { bytes >> 10 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kb_accounting_rounds_small_buffers_up() {
        assert_eq!(size_kb(0), 1);
        assert_eq!(size_kb(1023), 1);
        assert_eq!(size_kb(1024), 1);
        assert_eq!(size_kb(4096 + 100), 4);
    }
}
