// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw tasks and their descriptors.

use alloc::borrow::Cow;
use core::fmt;

use crate::area::{Area, Point};
use crate::color::{Color, opa};
use crate::scene::ObjectId;
use crate::transform::ZOOM_NONE;

use super::layer::LayerId;

/// A handle to a task in a [`DrawQueue`](super::DrawQueue).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl TaskId {
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

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({}@gen{})", self.idx, self.generation)
    }
}

/// Where a task is in its lifecycle.
///
/// `Waiting` is only used by layer composites whose source layer is still
/// being drawn. Units pick `Queued` tasks, move them to `InProgress` while
/// executing and to `Ready` when done; the dispatch pass frees `Ready` tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Blocked on a producer.
    Waiting,
    /// Available to draw units.
    Queued,
    /// Claimed by a draw unit.
    InProgress,
    /// Finished; freed by the next dispatch pass.
    Ready,
}

/// How a source is combined with what is already in the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source over destination.
    #[default]
    Normal,
    /// Channels are added.
    Additive,
    /// Source channels are subtracted from the destination.
    Subtractive,
    /// Channels are multiplied.
    Multiply,
}

/// A filled (optionally rounded) rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillDsc {
    /// Fill color.
    pub color: Color,
    /// Fill opacity.
    pub opa: u8,
    /// Corner radius.
    pub radius: i32,
}

impl FillDsc {
    /// An opaque square-cornered fill.
    #[must_use]
    pub const fn solid(color: Color) -> Self {
        Self {
            color,
            opa: opa::COVER,
            radius: 0,
        }
    }
}

/// A text run.
///
/// The text is either borrowed for the program lifetime or owned by the task
/// and released with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelDsc {
    /// The text.
    pub text: Cow<'static, str>,
    /// Text color.
    pub color: Color,
    /// Text opacity.
    pub opa: u8,
}

/// Clears everything outside a rounded rectangle in an alpha layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskRectDsc {
    /// The rectangle to keep, in absolute coordinates.
    pub area: Area,
    /// Its corner radius.
    pub radius: i32,
}

/// Composites a finished child layer into its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerDsc {
    /// The layer to composite.
    pub src: LayerId,
    /// Opacity applied to the whole layer.
    pub opa: u8,
    /// Rotation in 0.1° units, within `0..3600`.
    pub angle: i32,
    /// Scale, 256 = 100 %.
    pub zoom: u16,
    /// How the layer is blended.
    pub blend_mode: BlendMode,
    /// Rotation/zoom pivot relative to the source layer's top-left corner.
    pub pivot: Point,
    /// Antialias transformed edges.
    pub antialias: bool,
}

impl LayerDsc {
    /// Plain opaque composite of `src`.
    #[must_use]
    pub const fn new(src: LayerId) -> Self {
        Self {
            src,
            opa: opa::COVER,
            angle: 0,
            zoom: ZOOM_NONE,
            blend_mode: BlendMode::Normal,
            pivot: Point::new(0, 0),
            antialias: true,
        }
    }
}

/// What a task draws.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskKind {
    /// Rectangle fill.
    Fill(FillDsc),
    /// Text.
    Label(LabelDsc),
    /// Alpha mask outside a rounded rectangle.
    MaskRect(MaskRectDsc),
    /// Child layer composite.
    Layer(LayerDsc),
}

impl TaskKind {
    /// Short name for logs and traces.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fill(_) => "fill",
            Self::Label(_) => "label",
            Self::MaskRect(_) => "mask_rect",
            Self::Layer(_) => "layer",
        }
    }
}

/// One unit of deferred drawing work.
#[derive(Clone, Debug)]
pub struct DrawTask {
    /// The shape's area in absolute coordinates.
    pub area: Area,
    /// The area the task actually touches; for transformed composites this is
    /// the transformed bounding box. Used for ordering.
    pub real_area: Area,
    /// The layer's clip area when the task was created.
    pub clip_area: Area,
    /// What to draw.
    pub kind: TaskKind,
    /// Lifecycle state.
    pub state: TaskState,
    /// Owning layer, stamped when the task is finalized.
    pub layer: Option<LayerId>,
    /// The object whose drawing produced the task.
    pub obj: Option<ObjectId>,
}

impl DrawTask {
    /// The pixels this task may write: its area within its clip.
    #[must_use]
    pub fn draw_area(&self) -> Option<Area> {
        self.real_area.intersect(&self.clip_area)
    }
}
