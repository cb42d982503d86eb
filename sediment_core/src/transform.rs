// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object transforms (rotation and zoom about a pivot).
//!
//! Angles are in tenths of a degree and zoom is fixed point with
//! [`ZOOM_NONE`] (256) meaning 100 %. The pivot is relative to the top-left
//! corner of the object it belongs to.

use kurbo::{Affine, Point as KPoint};

use crate::area::{Area, Point};

/// Zoom value meaning "no scaling".
pub const ZOOM_NONE: u16 = 256;

/// Rotation and zoom of an object about a pivot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjTransform {
    /// Rotation in 0.1° units.
    pub angle: i32,
    /// Scale factor, 256 = 100 %.
    pub zoom: u16,
    /// Pivot relative to the object's top-left corner.
    pub pivot: Point,
}

impl Default for ObjTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ObjTransform {
    /// No rotation, no zoom.
    pub const IDENTITY: Self = Self {
        angle: 0,
        zoom: ZOOM_NONE,
        pivot: Point::new(0, 0),
    };

    /// Creates a transform.
    #[must_use]
    pub const fn new(angle: i32, zoom: u16, pivot: Point) -> Self {
        Self { angle, zoom, pivot }
    }

    /// Whether this transform changes anything.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.angle % 3600 == 0 && self.zoom == ZOOM_NONE
    }

    /// Angle normalized into `0..3600`.
    #[must_use]
    pub const fn normalized_angle(&self) -> i32 {
        self.angle.rem_euclid(3600)
    }

    /// The affine map for an object whose top-left corner is at `origin`.
    #[must_use]
    pub fn affine(&self, origin: Point) -> Affine {
        affine_about(
            self.angle,
            self.zoom,
            KPoint::new(
                f64::from(origin.x + self.pivot.x),
                f64::from(origin.y + self.pivot.y),
            ),
        )
    }

    /// Maps `area` through the transform (or its inverse) and returns the
    /// bounding box in whole pixels.
    ///
    /// Returns `None` for zoom 0, which collapses every area and has no
    /// inverse.
    #[must_use]
    pub fn transform_area(&self, area: &Area, origin: Point, inverse: bool) -> Option<Area> {
        if self.is_identity() {
            return Some(*area);
        }
        if self.zoom == 0 {
            return None;
        }
        let mut affine = self.affine(origin);
        if inverse {
            affine = affine.inverse();
        }
        let out = Area::from_rect_outer(affine.transform_rect_bbox((*area).into()));
        out.is_valid().then_some(out)
    }
}

/// Rotation by `angle` tenths of a degree and zoom by `zoom / 256` about
/// `pivot` (absolute coordinates).
#[must_use]
pub fn affine_about(angle: i32, zoom: u16, pivot: KPoint) -> Affine {
    let radians = f64::from(angle.rem_euclid(3600)).to_radians() / 10.0;
    let scale = f64::from(zoom) / f64::from(ZOOM_NONE);
    Affine::rotate_about(radians, pivot) * Affine::scale_about(scale, pivot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_passthrough() {
        let a = Area::new(10, 10, 19, 19);
        let t = ObjTransform::IDENTITY;
        assert_eq!(t.transform_area(&a, Point::new(10, 10), false), Some(a));
        assert_eq!(t.transform_area(&a, Point::new(10, 10), true), Some(a));
    }

    #[test]
    fn zoom_doubles_about_center() {
        let a = Area::new(0, 0, 9, 9);
        let t = ObjTransform::new(0, 512, Point::new(5, 5));
        let out = t.transform_area(&a, Point::new(0, 0), false).unwrap();
        assert_eq!(out, Area::new(-5, -5, 14, 14));
        let back = t.transform_area(&out, Point::new(0, 0), true).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn quarter_turn_about_center_keeps_square() {
        let a = Area::new(0, 0, 9, 9);
        let t = ObjTransform::new(900, ZOOM_NONE, Point::new(5, 5));
        let out = t.transform_area(&a, Point::new(0, 0), false).unwrap();
        assert_eq!(out, a);
    }

    #[test]
    fn zero_zoom_is_not_invertible() {
        let a = Area::new(0, 0, 9, 9);
        let t = ObjTransform::new(0, 0, Point::new(5, 5));
        assert_eq!(t.transform_area(&a, Point::new(0, 0), true), None);
    }

    #[test]
    fn angle_normalizes() {
        assert_eq!(ObjTransform::new(-900, 256, Point::default()).normalized_angle(), 2700);
        assert_eq!(ObjTransform::new(3600, 256, Point::default()).normalized_angle(), 0);
        assert!(ObjTransform::new(3600, 256, Point::default()).is_identity());
    }
}
