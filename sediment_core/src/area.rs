// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer pixel rectangles.
//!
//! An [`Area`] uses *inclusive* coordinates: `(0, 0)-(9, 9)` is a 10×10
//! square. Every dirty rectangle, clip rectangle and layer placement in the
//! refresh pipeline is an `Area` in absolute display coordinates.
//!
//! Empty results are expressed as `None` (see [`Area::intersect`]) rather
//! than as degenerate rectangles, so "nothing to draw" is visible in the type.

use core::fmt;

/// An integer point in display coordinates.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// Creates a point.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle with inclusive integer coordinates.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Area {
    /// Left edge (inclusive).
    pub x1: i32,
    /// Top edge (inclusive).
    pub y1: i32,
    /// Right edge (inclusive).
    pub x2: i32,
    /// Bottom edge (inclusive).
    pub y2: i32,
}

impl Area {
    /// Creates an area from its inclusive corners.
    #[inline]
    #[must_use]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Creates an area from an origin and a size.
    #[inline]
    #[must_use]
    pub const fn from_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width - 1, y + height - 1)
    }

    /// Returns the width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.x2 - self.x1 + 1
    }

    /// Returns the height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.y2 - self.y1 + 1
    }

    /// Returns whether the area contains at least one pixel.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Returns the number of pixels covered (0 for invalid areas).
    #[must_use]
    pub const fn size(&self) -> u64 {
        if !self.is_valid() {
            return 0;
        }
        self.width() as u64 * self.height() as u64
    }

    /// Returns the common part of two areas, or `None` if they do not
    /// overlap.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let res = Self {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        res.is_valid().then_some(res)
    }

    /// Returns the bounding box of both areas.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Returns whether the two areas share at least one pixel.
    #[must_use]
    pub fn is_on(&self, other: &Self) -> bool {
        self.x1 <= other.x2 && self.x2 >= other.x1 && self.y1 <= other.y2 && self.y2 >= other.y1
    }

    /// Returns whether `self` lies completely inside `holder`.
    ///
    /// With a non-zero `radius` the holder is treated as a rounded rectangle
    /// and all four corners of `self` must fall inside it.
    #[must_use]
    pub fn is_in(&self, holder: &Self, radius: i32) -> bool {
        let inside = self.x1 >= holder.x1
            && self.y1 >= holder.y1
            && self.x2 <= holder.x2
            && self.y2 <= holder.y2;
        if !inside {
            return false;
        }
        if radius == 0 {
            return true;
        }
        [
            Point::new(self.x1, self.y1),
            Point::new(self.x2, self.y1),
            Point::new(self.x1, self.y2),
            Point::new(self.x2, self.y2),
        ]
        .iter()
        .all(|p| holder.is_point_on(*p, radius))
    }

    /// Returns whether `p` lies inside the area treated as a rounded
    /// rectangle with the given corner `radius`.
    ///
    /// The radius is clamped to half of the shorter side.
    #[must_use]
    pub fn is_point_on(&self, p: Point, radius: i32) -> bool {
        if p.x < self.x1 || p.x > self.x2 || p.y < self.y1 || p.y > self.y2 {
            return false;
        }
        if radius <= 0 {
            return true;
        }
        let r = radius.min(self.width() / 2).min(self.height() / 2);

        // Corner squares; a point inside one must also be inside its circle.
        let corners = [
            (Self::new(self.x1, self.y1, self.x1 + r, self.y1 + r), self.x1 + r, self.y1 + r),
            (Self::new(self.x2 - r, self.y1, self.x2, self.y1 + r), self.x2 - r, self.y1 + r),
            (Self::new(self.x1, self.y2 - r, self.x1 + r, self.y2), self.x1 + r, self.y2 - r),
            (Self::new(self.x2 - r, self.y2 - r, self.x2, self.y2), self.x2 - r, self.y2 - r),
        ];
        for (corner, cx, cy) in corners {
            if corner.is_point_on(p, 0) {
                let dx = i64::from(p.x - cx);
                let dy = i64::from(p.y - cy);
                return dx * dx + dy * dy <= i64::from(r) * i64::from(r);
            }
        }
        true
    }

    /// Grows the area by `w` pixels left and right and `h` pixels up and down.
    #[must_use]
    pub const fn increase(&self, w: i32, h: i32) -> Self {
        Self::new(self.x1 - w, self.y1 - h, self.x2 + w, self.y2 + h)
    }

    /// Moves the area by `(dx, dy)`.
    #[must_use]
    pub const fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }

    /// Returns the smallest area covering the given floating-point rectangle.
    ///
    /// Used to turn transformed bounding boxes back into whole pixels.
    #[must_use]
    pub fn from_rect_outer(rect: kurbo::Rect) -> Self {
        // Snap values within float noise of a pixel edge before rounding out.
        const EPS: f64 = 1e-6;
        let r = kurbo::Rect::new(rect.x0 + EPS, rect.y0 + EPS, rect.x1 - EPS, rect.y1 - EPS).expand();
        Self::new(r.x0 as i32, r.y0 as i32, r.x1 as i32 - 1, r.y1 as i32 - 1)
    }
}

impl From<Area> for kurbo::Rect {
    fn from(a: Area) -> Self {
        Self::new(
            f64::from(a.x1),
            f64::from(a.y1),
            f64::from(a.x2) + 1.0,
            f64::from(a.y2) + 1.0,
        )
    }
}

impl fmt::Debug for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Area(({}, {})-({}, {}))", self.x1, self.y1, self.x2, self.y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_counts_inclusive_pixels() {
        assert_eq!(Area::new(0, 0, 9, 9).size(), 100);
        assert_eq!(Area::from_size(5, 5, 3, 4), Area::new(5, 5, 7, 8));
        assert_eq!(Area::new(5, 0, 4, 0).size(), 0);
    }

    #[test]
    fn intersect_disjoint_is_none() {
        let a = Area::new(0, 0, 9, 9);
        let b = Area::new(10, 0, 19, 9);
        assert_eq!(a.intersect(&b), None);
        assert!(!a.is_on(&b));
    }

    #[test]
    fn intersect_overlapping() {
        let a = Area::new(0, 0, 9, 9);
        let b = Area::new(5, 5, 14, 14);
        assert_eq!(a.intersect(&b), Some(Area::new(5, 5, 9, 9)));
        assert!(a.is_on(&b));
        assert_eq!(a.join(&b), Area::new(0, 0, 14, 14));
    }

    #[test]
    fn clipping_is_idempotent() {
        let screen = Area::new(0, 0, 99, 99);
        let dirty = Area::new(-20, 50, 130, 140);
        let once = dirty.intersect(&screen).unwrap();
        let twice = once.intersect(&screen).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, Area::new(0, 50, 99, 99));
    }

    #[test]
    fn is_in_without_radius() {
        let holder = Area::new(0, 0, 99, 99);
        assert!(Area::new(10, 10, 20, 20).is_in(&holder, 0));
        assert!(holder.is_in(&holder, 0));
        assert!(!Area::new(-1, 10, 20, 20).is_in(&holder, 0));
    }

    #[test]
    fn is_in_with_radius_rejects_corners() {
        let holder = Area::new(0, 0, 99, 99);
        // The exact corner pixel is outside a 20px rounded corner.
        assert!(!Area::new(0, 0, 5, 5).is_in(&holder, 20));
        // The middle is unaffected.
        assert!(Area::new(40, 40, 60, 60).is_in(&holder, 20));
        // A full-width band away from the corners is still inside.
        assert!(Area::new(0, 30, 99, 60).is_in(&holder, 20));
    }

    #[test]
    fn point_on_rounded_rect() {
        let a = Area::new(0, 0, 99, 99);
        assert!(a.is_point_on(Point::new(50, 0), 10));
        assert!(!a.is_point_on(Point::new(0, 0), 10));
        assert!(a.is_point_on(Point::new(10, 10), 10));
        assert!(!a.is_point_on(Point::new(100, 50), 0));
    }

    #[test]
    fn rect_round_trip_covers_pixels() {
        let a = Area::new(3, 4, 10, 12);
        let r: kurbo::Rect = a.into();
        assert_eq!(Area::from_rect_outer(r), a);
        let fractional = kurbo::Rect::new(2.5, 3.2, 10.1, 12.9);
        assert_eq!(Area::from_rect_outer(fractional), Area::new(2, 3, 10, 12));
    }
}
