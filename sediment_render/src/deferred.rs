// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A draw unit that hands tasks to an executor on another thread.
//!
//! [`channel`] returns a [`DeferredUnit`], registered with the runtime, and
//! an [`Executor`], moved to the thread (or interrupt handler, or hardware
//! completion callback) doing the work. The unit claims tasks and sends a
//! [`TaskTicket`] per task; the executor reports each finished ticket with
//! [`Executor::complete`], which wakes the refresh thread through the
//! dispatch [`Signal`]. Completed tasks are marked `Ready` the next time the
//! dispatcher collects from the unit.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvError, Sender, TryRecvError};
use std::vec::Vec;

use sediment_core::area::Area;
use sediment_core::color::ColorFormat;
use sediment_core::draw::{DrawQueue, DrawUnit, LayerId, Signal, TaskId, TaskKind, TaskState};

/// One claimed task, as seen by the executor.
#[derive(Clone, Debug)]
pub struct TaskTicket {
    /// The task.
    pub task: TaskId,
    /// Its layer.
    pub layer: LayerId,
    /// What to draw.
    pub kind: TaskKind,
    /// The shape's area.
    pub area: Area,
    /// The pixels the task may write.
    pub draw_area: Area,
    /// Placement of the layer buffer.
    pub buf_area: Area,
    /// Pixel format of the layer buffer.
    pub format: ColorFormat,
}

/// Draw unit side of a [`channel`].
#[derive(Debug)]
pub struct DeferredUnit {
    tickets: Sender<TaskTicket>,
    done: Receiver<TaskId>,
    in_flight: Vec<TaskId>,
    capacity: usize,
}

/// Executor side of a [`channel`].
pub struct Executor {
    tickets: Receiver<TaskTicket>,
    done: Sender<TaskId>,
    signal: Arc<dyn Signal>,
}

impl core::fmt::Debug for Executor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Executor").finish_non_exhaustive()
    }
}

/// Creates a deferred unit that keeps at most `capacity` tasks in flight
/// (at least one) and the executor serving it.
///
/// `signal` must be the runtime's dispatch signal
/// ([`Runtime::dispatch_signal`](sediment_core::refresh::Runtime::dispatch_signal)).
#[must_use]
pub fn channel(capacity: usize, signal: Arc<dyn Signal>) -> (DeferredUnit, Executor) {
    let (ticket_tx, ticket_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();
    (
        DeferredUnit {
            tickets: ticket_tx,
            done: done_rx,
            in_flight: Vec::new(),
            capacity: capacity.max(1),
        },
        Executor {
            tickets: ticket_rx,
            done: done_tx,
            signal,
        },
    )
}

impl DeferredUnit {
    /// Tasks sent but not yet reported back.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn retire(&mut self, queue: &mut DrawQueue, task: TaskId) -> bool {
        let Some(pos) = self.in_flight.iter().position(|t| *t == task) else {
            return false;
        };
        self.in_flight.swap_remove(pos);
        // The task may have been dropped with its display meanwhile.
        if queue.is_task_alive(task) {
            queue.set_task_state(task, TaskState::Ready);
        }
        true
    }

    /// Gives up on every in-flight task after the executor went away.
    fn abandon(&mut self, queue: &mut DrawQueue) {
        log::error!("deferred executor disconnected with {} tasks in flight", self.in_flight.len());
        for task in core::mem::take(&mut self.in_flight) {
            if queue.is_task_alive(task) {
                queue.set_task_state(task, TaskState::Ready);
            }
        }
    }
}

impl DrawUnit for DeferredUnit {
    fn dispatch(&mut self, queue: &mut DrawQueue, layer: LayerId) -> i32 {
        self.collect_ready(queue);
        if self.in_flight.len() >= self.capacity {
            return -1;
        }

        let mut taken = 0;
        while self.in_flight.len() < self.capacity {
            let Some(task) = queue.next_available_task(layer, None) else {
                break;
            };
            let l = queue.layer(layer);
            let (buf_area, format) = (l.buf_area(), l.color_format());
            let t = queue.task(task);
            let ticket = TaskTicket {
                task,
                layer,
                kind: t.kind.clone(),
                area: t.area,
                draw_area: t.draw_area().unwrap_or(t.area),
                buf_area,
                format,
            };
            if self.tickets.send(ticket).is_err() {
                log::error!("deferred executor disconnected; task {task:?} left queued");
                return -1;
            }
            queue.set_task_state(task, TaskState::InProgress);
            self.in_flight.push(task);
            taken += 1;
        }
        taken
    }

    fn collect_ready(&mut self, queue: &mut DrawQueue) -> usize {
        let mut n = 0;
        loop {
            match self.done.try_recv() {
                Ok(task) => n += usize::from(self.retire(queue, task)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    n += self.in_flight.len();
                    self.abandon(queue);
                    break;
                }
            }
        }
        n
    }

    fn wait_for_finish(&mut self, queue: &mut DrawQueue) {
        while !self.in_flight.is_empty() {
            match self.done.recv() {
                Ok(task) => {
                    self.retire(queue, task);
                }
                Err(RecvError) => self.abandon(queue),
            }
        }
    }

    fn name(&self) -> &'static str {
        "deferred"
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        // Wake the refresh loop so the unit notices the disconnect.
        self.signal.notify();
    }
}

impl Executor {
    /// Blocks for the next ticket. `None` once the unit is dropped.
    #[must_use]
    pub fn recv(&self) -> Option<TaskTicket> {
        self.tickets.recv().ok()
    }

    /// Reports a ticket as done and wakes the refresh thread.
    pub fn complete(&self, ticket: &TaskTicket) {
        if self.done.send(ticket.task).is_ok() {
            self.signal.notify();
        }
    }

    /// Serves tickets with `f` until the unit is dropped.
    pub fn run(self, mut f: impl FnMut(&TaskTicket)) {
        while let Some(ticket) = self.recv() {
            f(&ticket);
            self.complete(&ticket);
        }
    }
}
