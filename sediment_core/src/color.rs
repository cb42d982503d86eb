// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel formats, colors and opacity levels.

/// Opacity levels on the 0–255 scale.
pub mod opa {
    /// Fully transparent.
    pub const TRANSP: u8 = 0;
    /// Anything at or below this is treated as invisible.
    pub const MIN: u8 = 2;
    /// Anything at or above this is treated as opaque.
    pub const MAX: u8 = 253;
    /// Fully opaque.
    pub const COVER: u8 = 255;
    /// Half transparent.
    pub const P50: u8 = 127;
}

/// In-memory layout of a pixel buffer.
///
/// Multi-byte formats are stored little-endian, so `Argb8888` is laid out as
/// `B, G, R, A` in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ColorFormat {
    /// 16-bit 5-6-5 RGB.
    Rgb565,
    /// 24-bit RGB.
    Rgb888,
    /// 32-bit RGB with an unused byte.
    #[default]
    Xrgb8888,
    /// 32-bit RGB with alpha.
    Argb8888,
    /// 8-bit luminance.
    L8,
    /// 8-bit alpha only.
    A8,
}

impl ColorFormat {
    /// Bytes per pixel.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Rgb565 => 2,
            Self::Rgb888 => 3,
            Self::Xrgb8888 | Self::Argb8888 => 4,
            Self::L8 | Self::A8 => 1,
        }
    }

    /// Whether pixels carry an alpha channel.
    #[must_use]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Argb8888 | Self::A8)
    }
}

/// A 24-bit RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Black.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// White.
    pub const WHITE: Self = Self::new(0xff, 0xff, 0xff);

    /// Creates a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Creates a color from `0xRRGGBB`.
    #[must_use]
    pub const fn from_hex(hex: u32) -> Self {
        Self::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Luminance used by single-channel formats.
    #[must_use]
    pub const fn luma(self) -> u8 {
        ((self.r as u16 * 77 + self.g as u16 * 151 + self.b as u16 * 28) >> 8) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_and_alpha() {
        assert_eq!(ColorFormat::Rgb565.size(), 2);
        assert_eq!(ColorFormat::Argb8888.size(), 4);
        assert!(ColorFormat::Argb8888.has_alpha());
        assert!(!ColorFormat::Xrgb8888.has_alpha());
        assert!(!ColorFormat::Rgb565.has_alpha());
    }

    #[test]
    fn hex_and_luma() {
        let c = Color::from_hex(0x11_22_33);
        assert_eq!(c, Color::new(0x11, 0x22, 0x33));
        assert_eq!(Color::WHITE.luma(), 255);
        assert_eq!(Color::BLACK.luma(), 0);
    }
}
