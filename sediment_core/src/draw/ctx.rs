// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing context handed to objects during a refresh.

use alloc::borrow::Cow;
use core::fmt;

use crate::area::Area;
use crate::color::Color;
use crate::scene::ObjectId;

use super::dispatch::{Dispatcher, FinalizeMode};
use super::layer::LayerId;
use super::task::{DrawTask, FillDsc, LabelDsc, MaskRectDsc, TaskId, TaskKind};

/// Issues draw tasks into one layer on behalf of one object.
///
/// Every primitive is dropped when its area misses the layer's clip area.
pub struct DrawCtx<'a> {
    draw: &'a mut Dispatcher,
    layer: LayerId,
    obj: Option<ObjectId>,
    mode: FinalizeMode,
}

impl fmt::Debug for DrawCtx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawCtx")
            .field("layer", &self.layer)
            .field("obj", &self.obj)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<'a> DrawCtx<'a> {
    /// Context for an object's draw events.
    pub(crate) fn render(draw: &'a mut Dispatcher, layer: LayerId, obj: ObjectId, notify: bool) -> Self {
        Self {
            draw,
            layer,
            obj: Some(obj),
            mode: FinalizeMode::Render { notify },
        }
    }

    /// Context for a task-added notification; tasks added here neither
    /// notify nor dispatch.
    pub(crate) fn task_event(draw: &'a mut Dispatcher, layer: LayerId, obj: ObjectId) -> Self {
        Self {
            draw,
            layer,
            obj: Some(obj),
            mode: FinalizeMode::TaskEvent,
        }
    }

    /// Context with no originating object, for drawing into a layer directly.
    pub fn detached(draw: &'a mut Dispatcher, layer: LayerId) -> Self {
        Self {
            draw,
            layer,
            obj: None,
            mode: FinalizeMode::Render { notify: false },
        }
    }

    /// The target layer.
    #[must_use]
    pub const fn layer(&self) -> LayerId {
        self.layer
    }

    /// The layer's current clip area.
    #[must_use]
    pub fn clip_area(&self) -> Area {
        self.draw.queue.layer(self.layer).clip_area()
    }

    /// The layer's buffer area.
    #[must_use]
    pub fn buf_area(&self) -> Area {
        self.draw.queue.layer(self.layer).buf_area()
    }

    /// Reads a task, e.g. the one passed to a task-added notification.
    #[must_use]
    pub fn task(&self, id: TaskId) -> &DrawTask {
        self.draw.queue.task(id)
    }

    /// Adjusts a task before any unit picks it up.
    pub fn task_mut(&mut self, id: TaskId) -> &mut DrawTask {
        self.draw.queue.task_mut(id)
    }

    /// Fills `area` (optionally with rounded corners).
    pub fn fill(&mut self, area: &Area, dsc: FillDsc) -> Option<TaskId> {
        self.push(area, TaskKind::Fill(dsc))
    }

    /// Draws a static string.
    pub fn label(&mut self, area: &Area, text: &'static str, color: Color, opa: u8) -> Option<TaskId> {
        self.push(
            area,
            TaskKind::Label(LabelDsc {
                text: Cow::Borrowed(text),
                color,
                opa,
            }),
        )
    }

    /// Draws an owned string, released together with the task.
    pub fn label_owned(&mut self, area: &Area, text: alloc::string::String, color: Color, opa: u8) -> Option<TaskId> {
        self.push(
            area,
            TaskKind::Label(LabelDsc {
                text: Cow::Owned(text),
                color,
                opa,
            }),
        )
    }

    /// Clears everything outside the rounded rectangle `area` in the whole
    /// layer.
    pub fn mask_rect(&mut self, area: &Area, radius: i32) -> Option<TaskId> {
        let buf_area = self.buf_area();
        self.push(
            &buf_area,
            TaskKind::MaskRect(MaskRectDsc {
                area: *area,
                radius,
            }),
        )
    }

    fn push(&mut self, area: &Area, kind: TaskKind) -> Option<TaskId> {
        area.intersect(&self.clip_area())?;
        let task = self.draw.add_task(self.layer, *area, kind);
        self.draw.finalize_with(self.layer, task, self.obj, self.mode);
        Some(task)
    }
}
