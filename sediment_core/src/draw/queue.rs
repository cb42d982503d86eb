// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer and task storage shared by the refresh walker and draw units.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::arena::Arena;
use crate::area::Area;
use crate::color::ColorFormat;
use crate::output::DisplayId;
use crate::scene::ObjectId;

use super::layer::{Layer, LayerId, LayerInfo, size_kb};
use super::pixels::PixelsMut;
use super::signal::Signal;
use super::task::{DrawTask, TaskId, TaskKind, TaskState};

/// Counters describing dispatch activity since the queue was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Tasks added.
    pub tasks_added: u64,
    /// Tasks freed after completing.
    pub tasks_freed: u64,
    /// Child layers created.
    pub layers_created: u64,
    /// Child layers freed after being composited.
    pub layers_freed: u64,
    /// Memory currently held by layer buffers, in KiB.
    pub used_memory_kb: usize,
    /// Highest value `used_memory_kb` has reached.
    pub peak_memory_kb: usize,
}

/// The layers of one display, head (the display's own layer) first.
#[derive(Debug)]
struct LayerChain {
    display: DisplayId,
    screen: Area,
    layers: Vec<LayerId>,
}

/// Arena storage for layers and draw tasks.
///
/// Each display owns a chain of layers whose first entry is the display's
/// own layer; each layer owns its task list. Draw units receive the queue in
/// [`DrawUnit::dispatch`](super::DrawUnit::dispatch) and use
/// [`next_available_task`](Self::next_available_task),
/// [`set_task_state`](Self::set_task_state) and
/// [`target`](Self::target) to execute work.
pub struct DrawQueue {
    layers: Arena<Layer>,
    tasks: Arena<DrawTask>,
    chains: Vec<LayerChain>,
    max_memory_kb: usize,
    stats: DispatchStats,
    retired: Vec<(DisplayId, LayerInfo)>,
    signal: Arc<dyn Signal>,
}

impl fmt::Debug for DrawQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawQueue")
            .field("layers", &self.layers.len())
            .field("tasks", &self.tasks.len())
            .field("chains", &self.chains)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl DrawQueue {
    /// Creates an empty queue with a layer memory budget in KiB.
    #[must_use]
    pub fn new(max_memory_kb: usize, signal: Arc<dyn Signal>) -> Self {
        Self {
            layers: Arena::new(),
            tasks: Arena::new(),
            chains: Vec::new(),
            max_memory_kb,
            stats: DispatchStats::default(),
            retired: Vec::new(),
            signal,
        }
    }

    // -- Displays --

    /// Registers a display and creates its head layer.
    pub(crate) fn add_display(&mut self, display: DisplayId, screen: Area, format: ColorFormat) -> LayerId {
        let (idx, generation) = self.layers.insert(Layer {
            buf: None,
            loaned: true,
            buf_area: screen,
            clip_area: screen,
            color_format: format,
            parent: None,
            display,
            tasks: Vec::new(),
            all_tasks_added: false,
        });
        let head = LayerId { idx, generation };
        self.chains.push(LayerChain {
            display,
            screen,
            layers: alloc::vec![head],
        });
        head
    }

    /// Drops a display's chain with every layer and task on it.
    pub(crate) fn remove_display(&mut self, display: DisplayId) {
        let Some(pos) = self.chains.iter().position(|c| c.display == display) else {
            return;
        };
        let chain = self.chains.remove(pos);
        for id in chain.layers {
            if let Some(layer) = self.layers.remove(id.idx, id.generation) {
                for t in layer.tasks {
                    let _ = self.tasks.remove(t.idx, t.generation);
                }
                if !layer.loaned {
                    if let Some(buf) = layer.buf {
                        self.stats.used_memory_kb = self.stats.used_memory_kb.saturating_sub(size_kb(buf.len()));
                    }
                }
            }
        }
    }

    /// Updates the screen bounds of a display (after a resolution or
    /// rotation change).
    pub(crate) fn set_screen(&mut self, display: DisplayId, screen: Area) {
        if let Some(chain) = self.chains.iter_mut().find(|c| c.display == display) {
            chain.screen = screen;
        }
    }

    /// Displays with a layer chain, in registration order.
    pub fn displays(&self) -> impl Iterator<Item = DisplayId> + '_ {
        self.chains.iter().map(|c| c.display)
    }

    /// The layers of `display`, head first.
    #[must_use]
    pub fn chain(&self, display: DisplayId) -> &[LayerId] {
        self.chains
            .iter()
            .find(|c| c.display == display)
            .map_or(&[], |c| c.layers.as_slice())
    }

    // -- Layers --

    /// Creates a child layer of `parent` covering `area` and appends it to
    /// the parent's display chain.
    ///
    /// The buffer is allocated lazily by the dispatch pass.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale.
    pub fn create_layer(&mut self, parent: LayerId, format: ColorFormat, area: Area) -> LayerId {
        let display = self.layer(parent).display;
        let (idx, generation) = self.layers.insert(Layer {
            buf: None,
            loaned: false,
            buf_area: area,
            clip_area: area,
            color_format: format,
            parent: Some(parent),
            display,
            tasks: Vec::new(),
            all_tasks_added: false,
        });
        let id = LayerId { idx, generation };
        if let Some(chain) = self.chains.iter_mut().find(|c| c.display == display) {
            chain.layers.push(id);
        }
        self.stats.layers_created += 1;
        id
    }

    /// Returns whether `id` refers to a live layer.
    #[must_use]
    pub fn is_layer_alive(&self, id: LayerId) -> bool {
        self.layers.get(id.idx, id.generation).is_some()
    }

    /// Returns a layer.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn layer(&self, id: LayerId) -> &Layer {
        match self.layers.get(id.idx, id.generation) {
            Some(layer) => layer,
            None => panic!(
                "stale LayerId: {id:?} (current gen: {})",
                self.layers.generation_of(id.idx)
            ),
        }
    }

    /// Returns a layer mutably.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn layer_mut(&mut self, id: LayerId) -> &mut Layer {
        let current = self.layers.generation_of(id.idx);
        match self.layers.get_mut(id.idx, id.generation) {
            Some(layer) => layer,
            None => panic!("stale LayerId: {id:?} (current gen: {current})"),
        }
    }

    /// Narrows (or restores) the clip area of a layer.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn set_clip_area(&mut self, id: LayerId, clip: Area) {
        self.layer_mut(id).clip_area = clip;
    }

    /// Gives the display's draw buffer to its head layer for one band.
    pub(crate) fn loan_buffer(&mut self, id: LayerId, buf: Vec<u8>, buf_area: Area, format: ColorFormat) {
        let layer = self.layer_mut(id);
        layer.buf = Some(buf);
        layer.buf_area = buf_area;
        layer.clip_area = buf_area;
        layer.color_format = format;
    }

    /// Takes the loaned draw buffer back from a head layer.
    pub(crate) fn reclaim_buffer(&mut self, id: LayerId) -> Option<Vec<u8>> {
        self.layer_mut(id).buf.take()
    }

    /// Allocates the buffer of a layer if the memory budget allows it.
    ///
    /// A layer is always allowed its buffer when no other layer holds memory,
    /// so a single oversized layer still makes progress.
    pub(crate) fn alloc_layer_buf(&mut self, id: LayerId) -> bool {
        let kb = size_kb(self.layer(id).buf_size());
        let used = self.stats.used_memory_kb;
        if used > 0 && used + kb > self.max_memory_kb {
            log::debug!("layer {id:?} deferred: {kb} KiB requested, {used} of {} KiB in use", self.max_memory_kb);
            return false;
        }
        self.attach_buf(id);
        true
    }

    /// Allocates the buffer of the newest layer that waits for one with
    /// tasks pending, ignoring the memory budget.
    ///
    /// Nested layers hold their buffers until their own composite finishes,
    /// so an inner layer deferred behind an outer one would never be served.
    /// The dispatch pass calls this once nothing else can proceed.
    pub(crate) fn alloc_deferred_layer(&mut self) -> bool {
        let deferred = self.chains.iter().find_map(|c| {
            c.layers.iter().rev().copied().find(|id| {
                self.layers
                    .get(id.idx, id.generation)
                    .is_some_and(|l| !l.loaned && !l.has_buffer() && !l.tasks.is_empty())
            })
        });
        let Some(id) = deferred else {
            return false;
        };
        log::warn!(
            "layer {id:?} allocated over the {} KiB layer budget ({} KiB in use)",
            self.max_memory_kb,
            self.stats.used_memory_kb
        );
        self.attach_buf(id);
        true
    }

    fn attach_buf(&mut self, id: LayerId) {
        let bytes = self.layer(id).buf_size();
        let kb = size_kb(bytes);
        self.layer_mut(id).buf = Some(alloc::vec![0; bytes]);
        self.stats.used_memory_kb += kb;
        self.stats.peak_memory_kb = self.stats.peak_memory_kb.max(self.stats.used_memory_kb);
        log::debug!("layer {id:?} allocated {kb} KiB ({} KiB in use)", self.stats.used_memory_kb);
    }

    /// Takes a layer's buffer out so it can be read while another layer is
    /// written. Pair with [`restore_layer_buf`](Self::restore_layer_buf).
    pub fn take_layer_buf(&mut self, id: LayerId) -> Option<Vec<u8>> {
        self.layers.get_mut(id.idx, id.generation)?.buf.take()
    }

    /// Puts back a buffer taken with [`take_layer_buf`](Self::take_layer_buf).
    pub fn restore_layer_buf(&mut self, id: LayerId, buf: Vec<u8>) {
        if let Some(layer) = self.layers.get_mut(id.idx, id.generation) {
            layer.buf = Some(buf);
        }
    }

    /// Releases a child layer: its buffer, its chain entry and its slot.
    fn free_layer(&mut self, id: LayerId) {
        let Some(layer) = self.layers.remove(id.idx, id.generation) else {
            return;
        };
        for t in &layer.tasks {
            let _ = self.tasks.remove(t.idx, t.generation);
        }
        if let Some(buf) = &layer.buf {
            if !layer.loaned {
                let kb = size_kb(buf.len());
                self.stats.used_memory_kb = self.stats.used_memory_kb.saturating_sub(kb);
                log::debug!("layer {id:?} freed {kb} KiB ({} KiB in use)", self.stats.used_memory_kb);
            }
        }
        if let Some(chain) = self.chains.iter_mut().find(|c| c.display == layer.display) {
            chain.layers.retain(|l| *l != id);
        }
        self.stats.layers_freed += 1;
        self.retired.push((layer.display, layer.info(id)));
    }

    /// Drains the layers of `display` released since the last call.
    pub fn take_retired(&mut self, display: DisplayId) -> Vec<LayerInfo> {
        let mut mine = Vec::new();
        self.retired.retain(|(d, info)| {
            if *d == display {
                mine.push(*info);
                false
            } else {
                true
            }
        });
        mine
    }

    // -- Tasks --

    /// Appends a `Queued` task to `layer`, capturing its current clip area.
    ///
    /// # Panics
    ///
    /// Panics if `layer` is stale.
    pub fn add_task(&mut self, layer: LayerId, area: Area, kind: TaskKind) -> TaskId {
        let clip_area = self.layer(layer).clip_area;
        let (idx, generation) = self.tasks.insert(DrawTask {
            area,
            real_area: area,
            clip_area,
            kind,
            state: TaskState::Queued,
            layer: None,
            obj: None,
        });
        let id = TaskId { idx, generation };
        self.layer_mut(layer).tasks.push(id);
        self.stats.tasks_added += 1;
        id
    }

    /// Returns whether `id` refers to a live task.
    #[must_use]
    pub fn is_task_alive(&self, id: TaskId) -> bool {
        self.tasks.get(id.idx, id.generation).is_some()
    }

    /// Returns a task.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn task(&self, id: TaskId) -> &DrawTask {
        match self.tasks.get(id.idx, id.generation) {
            Some(task) => task,
            None => panic!(
                "stale TaskId: {id:?} (current gen: {})",
                self.tasks.generation_of(id.idx)
            ),
        }
    }

    /// Returns a task mutably.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn task_mut(&mut self, id: TaskId) -> &mut DrawTask {
        let current = self.tasks.generation_of(id.idx);
        match self.tasks.get_mut(id.idx, id.generation) {
            Some(task) => task,
            None => panic!("stale TaskId: {id:?} (current gen: {current})"),
        }
    }

    /// Moves a task to a new state.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn set_task_state(&mut self, id: TaskId, state: TaskState) {
        self.task_mut(id).state = state;
    }

    /// Records the owning layer and originating object of a task.
    pub(crate) fn stamp(&mut self, id: TaskId, layer: LayerId, obj: Option<ObjectId>) {
        let task = self.task_mut(id);
        task.layer = Some(layer);
        if obj.is_some() {
            task.obj = obj;
        }
    }

    /// The task's descriptor together with a writable view of its layer.
    ///
    /// Returns `None` if the layer has no buffer.
    pub fn target(&mut self, layer: LayerId, task: TaskId) -> Option<(&DrawTask, PixelsMut<'_>)> {
        let task = self.tasks.get(task.idx, task.generation)?;
        let layer = self.layers.get_mut(layer.idx, layer.generation)?;
        let (area, format) = (layer.buf_area, layer.color_format);
        let data = layer.buf.as_deref_mut()?;
        Some((task, PixelsMut::new(data, area, format)))
    }

    /// Finds the next task of `layer` a draw unit may start, searching after
    /// `after` (or from the head).
    ///
    /// A task is available when it is `Queued` and no older task that is not
    /// yet `Ready` overlaps it. While the first task covers the whole screen
    /// and has been picked up, nothing else is available.
    ///
    /// # Panics
    ///
    /// Panics if `layer` is stale.
    #[must_use]
    pub fn next_available_task(&self, layer: LayerId, after: Option<TaskId>) -> Option<TaskId> {
        let l = self.layer(layer);
        let first = self.task(*l.tasks.first()?);
        if first.state != TaskState::Queued {
            let screen = self.chains.iter().find(|c| c.display == l.display).map(|c| c.screen);
            if screen.is_some_and(|s| s.is_in(&first.area, 0)) {
                return None;
            }
        }

        let start = after
            .and_then(|a| l.tasks.iter().position(|t| *t == a))
            .map_or(0, |p| p + 1);
        l.tasks
            .iter()
            .enumerate()
            .skip(start)
            .find(|(i, id)| {
                let t = self.task(**id);
                t.state == TaskState::Queued && self.is_independent(&l.tasks[..*i], t)
            })
            .map(|(_, id)| *id)
    }

    fn is_independent(&self, older: &[TaskId], t: &DrawTask) -> bool {
        older.iter().all(|o| {
            let o = self.task(*o);
            o.state == TaskState::Ready || !o.real_area.is_on(&t.real_area)
        })
    }

    /// Whether any task of any layer is claimed by a unit and not yet
    /// `Ready`.
    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        self.chains.iter().flat_map(|c| &c.layers).any(|id| {
            self.layers.get(id.idx, id.generation).is_some_and(|l| {
                l.tasks
                    .iter()
                    .any(|t| self.tasks.get(t.idx, t.generation).is_some_and(|t| t.state == TaskState::InProgress))
            })
        })
    }

    /// Frees every `Ready` task of `layer`. A finished composite also frees
    /// the child layer it consumed.
    pub(crate) fn sweep_ready(&mut self, layer: LayerId) {
        let ids = core::mem::take(&mut self.layer_mut(layer).tasks);
        let mut kept = Vec::with_capacity(ids.len());
        for id in ids {
            if self.task(id).state != TaskState::Ready {
                kept.push(id);
                continue;
            }
            if let Some(task) = self.tasks.remove(id.idx, id.generation) {
                if let TaskKind::Layer(dsc) = task.kind {
                    self.free_layer(dsc.src);
                }
                // Owned label text drops with the task.
                self.stats.tasks_freed += 1;
            }
        }
        self.layer_mut(layer).tasks = kept;
    }

    /// Moves the `Waiting` composite of `child` in `parent` to `Queued`.
    pub(crate) fn release_consumer(&mut self, parent: LayerId, child: LayerId) -> bool {
        let Some(p) = self.layers.get(parent.idx, parent.generation) else {
            return false;
        };
        let consumer = p.tasks.iter().copied().find(|t| {
            let t = self.task(*t);
            t.state == TaskState::Waiting && matches!(t.kind, TaskKind::Layer(dsc) if dsc.src == child)
        });
        match consumer {
            Some(t) => {
                self.set_task_state(t, TaskState::Queued);
                true
            }
            None => false,
        }
    }

    // -- Signalling and stats --

    /// Asks the refresh thread to run another dispatch pass.
    pub fn request_dispatch(&self) {
        self.signal.notify();
    }

    /// The dispatch signal, for units that complete work on other threads.
    #[must_use]
    pub fn signal(&self) -> Arc<dyn Signal> {
        Arc::clone(&self.signal)
    }

    /// Blocks until a dispatch is requested.
    pub(crate) fn wait_for_request(&self) {
        self.signal.wait();
    }

    /// Dispatch counters.
    #[must_use]
    pub const fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Memory currently held by layer buffers, in KiB.
    #[must_use]
    pub const fn used_memory_kb(&self) -> usize {
        self.stats.used_memory_kb
    }
}
