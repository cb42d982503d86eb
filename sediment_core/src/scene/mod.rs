// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The object model the refresh walker draws.
//!
//! The walker never owns objects; it reads them through the [`Scene`] trait.
//! An object has:
//!
//! - An identity ([`ObjectId`]), a generational handle.
//! - Geometry: absolute coordinates plus an extra draw size for shadows and
//!   outlines that spill past the coordinates.
//! - Topology: a parent and an ordered list of children, drawn first to last.
//! - Compositing properties: opacity, blend mode and transform, which decide
//!   whether the object is drawn directly or through an intermediate layer
//!   ([`LayerType`]).
//!
//! [`ObjectTree`] is a struct-of-arrays implementation with dirty tracking
//! that paints plain rectangles and accepts per-object [`Painter`]s.

mod dirty;
mod tree;

use core::fmt;

use crate::area::{Area, Point};
use crate::draw::{DrawCtx, TaskId};
use crate::transform::ObjTransform;

pub use crate::draw::BlendMode;
pub use dirty::{GEOMETRY, STYLE, TOPOLOGY, VISIBILITY};
pub use tree::{Children, ObjFlags, ObjStyle, ObjectTree, Painter};

/// A handle to an object in a [`Scene`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl ObjectId {
    /// Builds a handle from a slot index and generation, for scenes that
    /// store objects themselves.
    #[inline]
    #[must_use]
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self {
            idx: index,
            generation,
        }
    }

    /// Returns the raw slot index.
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

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}@gen{})", self.idx, self.generation)
    }
}

/// How an object is composited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayerType {
    /// Drawn straight into the parent's layer.
    #[default]
    None,
    /// Drawn into an intermediate layer in strips, then blended.
    Simple,
    /// Drawn into one intermediate layer, then rotated/zoomed and blended.
    Transform,
}

/// Whether an object fully hides an area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoverResult {
    /// Every pixel of the area is opaque.
    Cover,
    /// Something shows through.
    NotCover,
    /// Children are clipped by a mask; nothing below may be used as a
    /// covering object.
    Masked,
}

/// Draw events sent to an object while it is rendered.
///
/// `Main*` draw the object itself, `Post*` draw on top of its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawEvent {
    /// Before the object's main drawing.
    MainBegin,
    /// The object's main drawing.
    Main,
    /// After the object's main drawing.
    MainEnd,
    /// Before drawing over the children.
    PostBegin,
    /// Drawing over the children.
    Post,
    /// After drawing over the children.
    PostEnd,
}

/// Read access to an object tree for one refresh.
///
/// Every method takes an [`ObjectId`] the scene handed out; implementations
/// may panic on ids they do not know.
pub trait Scene {
    /// Absolute coordinates.
    fn coords(&self, obj: ObjectId) -> Area;

    /// Extra pixels drawn beyond the coordinates on every side.
    fn ext_draw_size(&self, obj: ObjectId) -> i32 {
        _ = obj;
        0
    }

    /// The parent object, `None` for a screen.
    fn parent(&self, obj: ObjectId) -> Option<ObjectId>;

    /// Number of children.
    fn child_count(&self, obj: ObjectId) -> usize;

    /// The `index`th child, in draw order.
    fn child(&self, obj: ObjectId, index: usize) -> Option<ObjectId>;

    /// Whether the object (and so its subtree) is skipped.
    fn is_hidden(&self, obj: ObjectId) -> bool;

    /// How the object is composited.
    fn layer_type(&self, obj: ObjectId) -> LayerType;

    /// Opacity applied to the whole layered object.
    fn opa(&self, obj: ObjectId) -> u8;

    /// Rotation, zoom and pivot.
    fn transform(&self, obj: ObjectId) -> ObjTransform {
        _ = obj;
        ObjTransform::IDENTITY
    }

    /// Blend mode of the layered object.
    fn blend_mode(&self, obj: ObjectId) -> BlendMode {
        _ = obj;
        BlendMode::Normal
    }

    /// Corner radius.
    fn radius(&self, obj: ObjectId) -> i32 {
        _ = obj;
        0
    }

    /// Whether children are clipped to the rounded corners.
    fn clip_corner(&self, obj: ObjectId) -> bool {
        _ = obj;
        false
    }

    /// Whether [`task_added`](Self::task_added) should be called for the
    /// object's draw tasks.
    fn sends_task_events(&self, obj: ObjectId) -> bool {
        _ = obj;
        false
    }

    /// Whether the object fully covers `area`.
    fn cover_check(&self, obj: ObjectId, area: &Area) -> CoverResult;

    /// Draws one phase of the object through `ctx`.
    fn draw_event(&self, obj: ObjectId, event: DrawEvent, ctx: &mut DrawCtx<'_>);

    /// Called for every task the object added while it asked for task events.
    ///
    /// Tasks added through `ctx` here are not reported again.
    fn task_added(&self, obj: ObjectId, task: TaskId, ctx: &mut DrawCtx<'_>) {
        _ = (obj, task, ctx);
    }

    /// Coordinates extended by the extra draw size.
    fn ext_coords(&self, obj: ObjectId) -> Area {
        let ext = self.ext_draw_size(obj);
        self.coords(obj).increase(ext, ext)
    }

    /// Maps `area` through the object's own transform (or its inverse), with
    /// the pivot measured from the object's top-left corner.
    ///
    /// Returns `None` when the transform collapses the area (zoom 0).
    fn transformed_area(&self, obj: ObjectId, area: &Area, inverse: bool) -> Option<Area> {
        let coords = self.coords(obj);
        self.transform(obj)
            .transform_area(area, Point::new(coords.x1, coords.y1), inverse)
    }
}
