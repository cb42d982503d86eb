// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime and per-display configuration.

use crate::area::Area;
use crate::color::ColorFormat;

/// Number of pending dirty areas a display keeps before collapsing them into
/// one full-screen area.
pub const DEFAULT_INV_BUF_SIZE: usize = 32;

/// Scratch memory budget for one strip of a `Simple` layer, in bytes.
pub const DEFAULT_LAYER_SIMPLE_BUF_SIZE: usize = 24 * 1024;

/// Total memory all layer buffers may use at once, in KiB.
pub const DEFAULT_LAYER_MAX_MEMORY_KB: usize = 1024;

/// Process-wide refresh settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Capacity of each display's dirty-area list.
    pub inv_buf_size: usize,
    /// Byte budget used to size the strips of `Simple` layers.
    pub layer_simple_buf_size: usize,
    /// Upper bound on memory held by layer buffers, in KiB.
    pub layer_max_memory_kb: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inv_buf_size: DEFAULT_INV_BUF_SIZE,
            layer_simple_buf_size: DEFAULT_LAYER_SIMPLE_BUF_SIZE,
            layer_max_memory_kb: DEFAULT_LAYER_MAX_MEMORY_KB,
        }
    }
}

/// How a display's draw buffer relates to the screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// The buffer is smaller than the screen; dirty areas are rendered in
    /// row bands and each band is flushed separately.
    #[default]
    Partial,
    /// The buffer is screen-sized; dirty areas are rendered in place at their
    /// absolute position.
    Direct,
    /// The buffer is screen-sized and the whole screen is redrawn whenever
    /// anything is dirty.
    Full,
}

/// Display rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// No rotation.
    #[default]
    R0,
    /// 90° clockwise.
    R90,
    /// 180°.
    R180,
    /// 270° clockwise.
    R270,
}

impl Rotation {
    /// Whether the logical axes are swapped relative to the panel.
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::R90 | Self::R270)
    }
}

/// Static configuration of one display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Horizontal resolution in pixels (unrotated).
    pub hor_res: i32,
    /// Vertical resolution in pixels (unrotated).
    pub ver_res: i32,
    /// Horizontal resolution of the physical panel.
    pub physical_hor_res: i32,
    /// Vertical resolution of the physical panel.
    pub physical_ver_res: i32,
    /// Horizontal position of this display on the physical panel.
    pub offset_x: i32,
    /// Vertical position of this display on the physical panel.
    pub offset_y: i32,
    /// How the draw buffer maps onto the screen.
    pub render_mode: RenderMode,
    /// Pixel format of the draw buffers.
    pub color_format: ColorFormat,
    /// Display rotation.
    pub rotation: Rotation,
    /// Rotate in software before flushing (unsupported; logs a warning).
    pub sw_rotate: bool,
    /// Antialias transformed layers.
    pub antialiasing: bool,
}

impl DisplayConfig {
    /// Creates a configuration for a `hor_res` × `ver_res` display whose panel
    /// is the same size.
    #[must_use]
    pub const fn new(hor_res: i32, ver_res: i32) -> Self {
        Self {
            hor_res,
            ver_res,
            physical_hor_res: hor_res,
            physical_ver_res: ver_res,
            offset_x: 0,
            offset_y: 0,
            render_mode: RenderMode::Partial,
            color_format: ColorFormat::Xrgb8888,
            rotation: Rotation::R0,
            sw_rotate: false,
            antialiasing: true,
        }
    }

    /// Sets the render mode.
    #[must_use]
    pub const fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    /// Sets the pixel format.
    #[must_use]
    pub const fn with_color_format(mut self, format: ColorFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Places the display on a larger physical panel.
    #[must_use]
    pub const fn with_offset(mut self, x: i32, y: i32, physical_hor: i32, physical_ver: i32) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self.physical_hor_res = physical_hor;
        self.physical_ver_res = physical_ver;
        self
    }

    /// Logical resolution, with the axes swapped for 90° and 270°.
    #[must_use]
    pub const fn logical_res(&self) -> (i32, i32) {
        if self.rotation.swaps_axes() {
            (self.ver_res, self.hor_res)
        } else {
            (self.hor_res, self.ver_res)
        }
    }

    /// The whole logical screen.
    #[must_use]
    pub const fn screen_area(&self) -> Area {
        let (w, h) = self.logical_res();
        Area::new(0, 0, w - 1, h - 1)
    }

    /// Sets the rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Rotation, sw_rotate: bool) -> Self {
        self.rotation = rotation;
        self.sw_rotate = sw_rotate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_defaults() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.inv_buf_size, 32);
        assert_eq!(cfg.layer_simple_buf_size, 24 * 1024);
        assert_eq!(cfg.layer_max_memory_kb, 1024);
    }

    #[test]
    fn builder_sets_fields() {
        let cfg = DisplayConfig::new(320, 240)
            .with_render_mode(RenderMode::Direct)
            .with_color_format(ColorFormat::Rgb565)
            .with_offset(10, 20, 480, 320);
        assert_eq!(cfg.render_mode, RenderMode::Direct);
        assert_eq!(cfg.color_format, ColorFormat::Rgb565);
        assert_eq!((cfg.offset_x, cfg.offset_y), (10, 20));
        assert_eq!(cfg.physical_hor_res, 480);
        assert!(Rotation::R90.swaps_axes());
    }
}
