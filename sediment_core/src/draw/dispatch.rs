// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatching draw tasks to draw units.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::area::Area;
use crate::color::ColorFormat;
use crate::scene::ObjectId;
use crate::transform::ObjTransform;

use super::layer::LayerId;
use super::queue::DrawQueue;
use super::signal::Signal;
use super::task::{LayerDsc, TaskId, TaskKind, TaskState};

/// A backend that executes draw tasks.
///
/// Units are offered one layer at a time. A unit claims tasks with
/// [`DrawQueue::next_available_task`], marks them
/// [`InProgress`](TaskState::InProgress), and eventually marks them
/// [`Ready`](TaskState::Ready). A unit that completes work must call
/// [`DrawQueue::request_dispatch`] (or notify [`DrawQueue::signal`] from
/// another thread) so the refresh thread wakes up and frees the finished
/// tasks.
pub trait DrawUnit {
    /// Claims and starts zero or more tasks of `layer`.
    ///
    /// Returns the number of tasks claimed, or a negative value when the unit
    /// is saturated; a negative value stops offering `layer` to the
    /// remaining units in this pass.
    fn dispatch(&mut self, queue: &mut DrawQueue, layer: LayerId) -> i32;

    /// Marks tasks finished asynchronously as `Ready`. Returns how many.
    fn collect_ready(&mut self, queue: &mut DrawQueue) -> usize {
        _ = queue;
        0
    }

    /// Blocks until every task this unit has claimed is `Ready`.
    fn wait_for_finish(&mut self, queue: &mut DrawQueue) {
        _ = queue;
    }

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "draw unit"
    }
}

/// How a finalized task continues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FinalizeMode {
    /// Normal drawing: notify the object if it asked for it, otherwise
    /// dispatch right away.
    Render { notify: bool },
    /// Drawing from inside a task-added notification: no notification, no
    /// dispatch.
    TaskEvent,
}

/// The layer/task queue together with the registered draw units.
pub struct Dispatcher {
    pub(crate) queue: DrawQueue,
    units: Vec<Box<dyn DrawUnit>>,
    pending_events: Vec<(ObjectId, TaskId)>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queue", &self.queue)
            .field("units", &self.units.iter().map(|u| u.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with no units.
    #[must_use]
    pub fn new(max_memory_kb: usize, signal: Arc<dyn Signal>) -> Self {
        Self {
            queue: DrawQueue::new(max_memory_kb, signal),
            units: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    /// Registers a draw unit. Units are offered layers in registration order.
    pub fn add_unit(&mut self, unit: Box<dyn DrawUnit>) {
        log::debug!("registered draw unit `{}`", unit.name());
        self.units.push(unit);
    }

    /// Number of registered units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// The underlying queue.
    #[must_use]
    pub const fn queue(&self) -> &DrawQueue {
        &self.queue
    }

    /// The underlying queue, mutably.
    pub fn queue_mut(&mut self) -> &mut DrawQueue {
        &mut self.queue
    }

    // -- Task creation --

    /// Appends a task to `layer`. See [`DrawQueue::add_task`].
    pub fn add_task(&mut self, layer: LayerId, area: Area, kind: TaskKind) -> TaskId {
        self.queue.add_task(layer, area, kind)
    }

    /// Completes the creation of `task`: stamps the owning layer and runs a
    /// dispatch pass.
    pub fn finalize_task(&mut self, layer: LayerId, task: TaskId) {
        self.finalize_with(layer, task, None, FinalizeMode::Render { notify: false });
    }

    pub(crate) fn finalize_with(&mut self, layer: LayerId, task: TaskId, obj: Option<ObjectId>, mode: FinalizeMode) {
        self.queue.stamp(task, layer, obj);
        match (mode, obj) {
            (FinalizeMode::Render { notify: true }, Some(obj)) => self.pending_events.push((obj, task)),
            (FinalizeMode::Render { .. }, _) => {
                self.dispatch();
            }
            (FinalizeMode::TaskEvent, _) => {}
        }
    }

    /// Task-added notifications queued since the last call.
    pub(crate) fn take_pending_events(&mut self) -> Vec<(ObjectId, TaskId)> {
        core::mem::take(&mut self.pending_events)
    }

    /// Creates a child layer. See [`DrawQueue::create_layer`].
    pub fn create_layer(&mut self, parent: LayerId, format: ColorFormat, area: Area) -> LayerId {
        self.queue.create_layer(parent, format, area)
    }

    /// Adds the composite of `dsc.src` into `parent` at `coords`.
    ///
    /// The task starts `Waiting` and is released once the source layer has
    /// drained; the source layer is marked complete.
    ///
    /// # Panics
    ///
    /// Panics if `parent` or `dsc.src` is stale.
    pub fn draw_layer(&mut self, parent: LayerId, dsc: LayerDsc, coords: Area) -> TaskId {
        let task = self.queue.add_task(parent, coords, TaskKind::Layer(dsc));
        let origin = crate::area::Point::new(coords.x1, coords.y1);
        let real = ObjTransform::new(dsc.angle, dsc.zoom, dsc.pivot)
            .transform_area(&coords, origin, false)
            .unwrap_or(coords);
        {
            let t = self.queue.task_mut(task);
            t.state = TaskState::Waiting;
            t.real_area = real;
        }
        self.queue.layer_mut(dsc.src).all_tasks_added = true;
        self.finalize_task(parent, task);
        task
    }

    // -- Dispatch --

    /// Runs one dispatch pass over every layer of every display.
    ///
    /// Returns whether any unit claimed work. When no layer anywhere could
    /// proceed and no task is in flight, one layer deferred by the memory
    /// budget is allocated anyway; if that does not help either, another pass
    /// is requested so a waiting refresh loop re-checks its layer instead of
    /// stalling. In-flight tasks wake the loop themselves when they finish.
    pub fn dispatch(&mut self) -> bool {
        for unit in &mut self.units {
            unit.collect_ready(&mut self.queue);
        }

        let mut any = self.dispatch_displays();
        if !any && !self.queue.has_in_flight() {
            // Composites released during the first pass free layer memory
            // once they run.
            any = self.dispatch_displays();
            if !any && !self.queue.has_in_flight() && self.queue.alloc_deferred_layer() {
                any = self.dispatch_displays();
            }
            if !any {
                self.queue.request_dispatch();
            }
        }
        any
    }

    fn dispatch_displays(&mut self) -> bool {
        let mut any = false;
        let displays: Vec<_> = self.queue.displays().collect();
        for display in displays {
            let layers = self.queue.chain(display).to_vec();
            for layer in layers {
                if self.queue.is_layer_alive(layer) && self.dispatch_layer(layer) {
                    any = true;
                }
            }
        }
        any
    }

    /// Blocks until every unit has finished the tasks it claimed.
    pub fn wait_for_units(&mut self) {
        for unit in &mut self.units {
            unit.wait_for_finish(&mut self.queue);
        }
    }

    /// Frees finished tasks of `layer` and offers the rest to the units.
    ///
    /// A child layer that has drained releases its consumer in the parent
    /// instead. A layer without a buffer is skipped while the memory budget
    /// does not allow allocating one.
    ///
    /// # Panics
    ///
    /// Panics if `layer` is stale.
    pub fn dispatch_layer(&mut self, layer: LayerId) -> bool {
        self.queue.sweep_ready(layer);

        let l = self.queue.layer(layer);
        let (parent, drained, has_buffer, loaned) =
            (l.parent, l.all_tasks_added && l.tasks.is_empty(), l.has_buffer(), l.loaned);
        let idle = l.tasks.is_empty();

        if let Some(parent) = parent {
            if drained {
                if self.queue.release_consumer(parent, layer) {
                    self.queue.request_dispatch();
                }
                return false;
            }
        }

        if !has_buffer && (loaned || idle || !self.queue.alloc_layer_buf(layer)) {
            return false;
        }

        let mut dispatched = false;
        for unit in &mut self.units {
            let taken = unit.dispatch(&mut self.queue, layer);
            if taken < 0 {
                break;
            }
            if taken > 0 {
                dispatched = true;
            }
        }
        dispatched
    }

    /// Blocks until a unit or driver requests another dispatch pass.
    pub fn wait_for_request(&self) {
        self.queue.wait_for_request();
    }

    /// Runs dispatch passes until `layer` has no tasks left.
    pub fn drain_layer(&mut self, layer: LayerId) {
        loop {
            self.dispatch();
            if self.queue.layer(layer).tasks.is_empty() {
                break;
            }
            self.wait_for_request();
        }
    }
}
