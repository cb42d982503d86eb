// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A draw unit that only counts.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use sediment_core::area::Area;
use sediment_core::draw::{DrawQueue, DrawUnit, LayerId, TaskKind, TaskState};

/// A task as the unit received it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskRecord {
    /// The layer the task drew into.
    pub layer: LayerId,
    /// The task's area.
    pub area: Area,
    /// What it drew.
    pub kind: TaskKind,
}

/// Marks every available task ready without drawing it.
pub struct TallyUnit {
    seen: Rc<RefCell<Vec<TaskRecord>>>,
}

impl fmt::Debug for TallyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TallyUnit")
            .field("seen", &self.seen.borrow().len())
            .finish()
    }
}

impl TallyUnit {
    /// Creates a unit and the probe listing what it executed.
    #[must_use]
    pub fn new() -> (Self, TallyProbe) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                seen: Rc::clone(&seen),
            },
            TallyProbe { seen },
        )
    }
}

impl DrawUnit for TallyUnit {
    fn dispatch(&mut self, queue: &mut DrawQueue, layer: LayerId) -> i32 {
        let mut n = 0;
        while let Some(task) = queue.next_available_task(layer, None) {
            queue.set_task_state(task, TaskState::InProgress);
            let t = queue.task(task);
            self.seen.borrow_mut().push(TaskRecord {
                layer,
                area: t.area,
                kind: t.kind.clone(),
            });
            queue.set_task_state(task, TaskState::Ready);
            n += 1;
        }
        if n > 0 {
            queue.request_dispatch();
        }
        n
    }

    fn name(&self) -> &'static str {
        "tally"
    }
}

/// Test-side view of a [`TallyUnit`].
#[derive(Debug)]
pub struct TallyProbe {
    seen: Rc<RefCell<Vec<TaskRecord>>>,
}

impl TallyProbe {
    /// Every task executed so far, in execution order.
    #[must_use]
    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.seen.borrow().clone()
    }

    /// Forgets the tasks seen so far.
    pub fn reset(&self) {
        self.seen.borrow_mut().clear();
    }
}
