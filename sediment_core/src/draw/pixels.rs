// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Borrowed views of layer and display buffers.
//!
//! A view pairs raw bytes with the absolute [`Area`] they cover and their
//! [`ColorFormat`]. Rows are tightly packed: the stride is the area width
//! times the pixel size.

use crate::area::Area;
use crate::color::ColorFormat;

/// Read-only pixel view.
#[derive(Clone, Copy, Debug)]
pub struct Pixels<'a> {
    /// Pixel bytes, row-major.
    pub data: &'a [u8],
    /// Absolute area covered by the first `stride * height` bytes.
    pub area: Area,
    /// Pixel format.
    pub format: ColorFormat,
}

/// Mutable pixel view.
#[derive(Debug)]
pub struct PixelsMut<'a> {
    /// Pixel bytes, row-major.
    pub data: &'a mut [u8],
    /// Absolute area covered by the first `stride * height` bytes.
    pub area: Area,
    /// Pixel format.
    pub format: ColorFormat,
}

/// Bytes per row for a buffer covering `area` in `format`.
#[must_use]
pub const fn stride(area: &Area, format: ColorFormat) -> usize {
    area.width() as usize * format.size()
}

/// Byte range of the row segment `x1..=x2` on row `y` inside `buf_area`, or
/// `None` if it falls outside `len` bytes.
fn row_span(buf_area: &Area, format: ColorFormat, len: usize, y: i32, x1: i32, x2: i32) -> Option<core::ops::Range<usize>> {
    let px = format.size();
    let start = (y - buf_area.y1) as usize * stride(buf_area, format) + (x1 - buf_area.x1) as usize * px;
    let end = start + (x2 - x1 + 1) as usize * px;
    (end <= len).then_some(start..end)
}

impl<'a> Pixels<'a> {
    /// Creates a view.
    #[must_use]
    pub const fn new(data: &'a [u8], area: Area, format: ColorFormat) -> Self {
        Self { data, area, format }
    }

    /// Bytes per row.
    #[must_use]
    pub const fn stride(&self) -> usize {
        stride(&self.area, self.format)
    }

    /// The bytes of row `y` restricted to columns `x1..=x2`.
    #[must_use]
    pub fn row(&self, y: i32, x1: i32, x2: i32) -> Option<&'a [u8]> {
        row_span(&self.area, self.format, self.data.len(), y, x1, x2).map(|r| &self.data[r])
    }
}

impl<'a> PixelsMut<'a> {
    /// Creates a view.
    #[must_use]
    pub fn new(data: &'a mut [u8], area: Area, format: ColorFormat) -> Self {
        Self { data, area, format }
    }

    /// Bytes per row.
    #[must_use]
    pub const fn stride(&self) -> usize {
        stride(&self.area, self.format)
    }

    /// Reborrows as a read-only view.
    #[must_use]
    pub fn as_pixels(&self) -> Pixels<'_> {
        Pixels::new(self.data, self.area, self.format)
    }

    /// The mutable bytes of row `y` restricted to columns `x1..=x2`.
    pub fn row_mut(&mut self, y: i32, x1: i32, x2: i32) -> Option<&mut [u8]> {
        let span = row_span(&self.area, self.format, self.data.len(), y, x1, x2)?;
        Some(&mut self.data[span])
    }

    /// Zeroes the part of `area` that lies inside the buffer.
    pub fn clear(&mut self, area: &Area) {
        let Some(a) = area.intersect(&self.area) else {
            return;
        };
        for y in a.y1..=a.y2 {
            if let Some(row) = self.row_mut(y, a.x1, a.x2) {
                row.fill(0);
            }
        }
    }

    /// Copies the part of `area` present in both buffers from `src`.
    ///
    /// Both views must share a pixel format; mismatched formats copy nothing.
    pub fn copy_from(&mut self, src: &Pixels<'_>, area: &Area) {
        if src.format != self.format {
            return;
        }
        let Some(a) = area
            .intersect(&self.area)
            .and_then(|a| a.intersect(&src.area))
        else {
            return;
        };
        for y in a.y1..=a.y2 {
            if let (Some(from), Some(to)) = (src.row(y, a.x1, a.x2), self.row_mut(y, a.x1, a.x2)) {
                to.copy_from_slice(from);
            }
        }
    }
}
