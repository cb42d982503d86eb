// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synchronous software draw unit.

use sediment_core::draw::{DrawQueue, DrawUnit, LayerDsc, LayerId, Pixels, TaskId, TaskKind, TaskState};

use crate::raster;

/// Counters kept by [`ImmediateUnit`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnitStats {
    /// Tasks executed.
    pub executed: u64,
    /// Composites whose source layer had no pixels to read.
    pub empty_composites: u64,
    /// Label tasks accepted without drawing glyphs.
    pub skipped_labels: u64,
}

/// Executes every available task of the offered layer on the calling thread.
///
/// Each call to [`dispatch`](DrawUnit::dispatch) keeps picking tasks until
/// none is available, so one pass drains everything whose dependencies are
/// already satisfied.
#[derive(Debug, Default)]
pub struct ImmediateUnit {
    stats: UnitStats,
}

impl ImmediateUnit {
    /// Creates a unit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Execution counters.
    #[must_use]
    pub const fn stats(&self) -> UnitStats {
        self.stats
    }
}

impl DrawUnit for ImmediateUnit {
    fn dispatch(&mut self, queue: &mut DrawQueue, layer: LayerId) -> i32 {
        let mut taken = 0;
        while let Some(task) = queue.next_available_task(layer, None) {
            queue.set_task_state(task, TaskState::InProgress);
            execute(queue, layer, task, &mut self.stats);
            queue.set_task_state(task, TaskState::Ready);
            self.stats.executed += 1;
            taken += 1;
        }
        if taken > 0 {
            queue.request_dispatch();
        }
        taken
    }

    fn name(&self) -> &'static str {
        "immediate"
    }
}

/// Runs one task against its layer's buffer.
fn execute(queue: &mut DrawQueue, layer: LayerId, task: TaskId, stats: &mut UnitStats) {
    if let TaskKind::Layer(dsc) = queue.task(task).kind {
        if !composite(queue, layer, task, &dsc) {
            stats.empty_composites += 1;
        }
        return;
    }

    let Some((t, mut px)) = queue.target(layer, task) else {
        log::warn!("task {task:?} on {layer:?} has no buffer to draw into");
        return;
    };
    match &t.kind {
        TaskKind::Fill(dsc) => raster::fill(&mut px, t, dsc),
        TaskKind::MaskRect(dsc) => raster::mask_rect(&mut px, t, dsc),
        TaskKind::Label(dsc) => {
            log::trace!("label {:?} accepted without glyph rendering", dsc.text);
            stats.skipped_labels += 1;
        }
        TaskKind::Layer(_) => {}
    }
}

/// Composites the source layer of `dsc`. Returns `false` when the source
/// never got a buffer (nothing was drawn into it).
fn composite(queue: &mut DrawQueue, layer: LayerId, task: TaskId, dsc: &LayerDsc) -> bool {
    if !queue.is_layer_alive(dsc.src) {
        return false;
    }
    let src = queue.layer(dsc.src);
    let (area, format) = (src.buf_area(), src.color_format());
    let Some(buf) = queue.take_layer_buf(dsc.src) else {
        return false;
    };
    if let Some((t, mut px)) = queue.target(layer, task) {
        raster::composite(&mut px, t, dsc, &Pixels::new(&buf, area, format));
    }
    queue.restore_layer_buf(dsc.src, buf);
    true
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use sediment_core::area::Area;
    use sediment_core::backend::{DisplayBackend, FlushReady};
    use sediment_core::color::{Color, ColorFormat, opa};
    use sediment_core::config::{DisplayConfig, RuntimeConfig};
    use sediment_core::draw::{DrawCtx, Pixels, SpinSignal};
    use sediment_core::refresh::Runtime;
    use sediment_core::scene::{DrawEvent, ObjectId, ObjectTree, Painter};
    use sediment_core::trace::Tracer;

    use super::*;
    use crate::raster::{Rgba, read};

    /// Copies every flushed band into a full-screen framebuffer.
    struct Panel {
        fb: Rc<RefCell<Vec<u8>>>,
        width: i32,
    }

    impl DisplayBackend for Panel {
        fn flush(&mut self, area: &Area, px: Pixels<'_>, ready: FlushReady) {
            let mut fb = self.fb.borrow_mut();
            let stride = usize::try_from(self.width).unwrap_or(0) * 4;
            for y in area.y1..=area.y2 {
                if let Some(row) = px.row(y, area.x1, area.x2) {
                    let start = usize::try_from(y).unwrap_or(0) * stride + usize::try_from(area.x1).unwrap_or(0) * 4;
                    fb[start..start + row.len()].copy_from_slice(row);
                }
            }
            ready.ready();
        }
    }

    fn render(tree: &ObjectTree, screen: ObjectId) -> Vec<u8> {
        let fb = Rc::new(RefCell::new(vec![0_u8; 20 * 20 * 4]));
        let mut rt = Runtime::with_signal(RuntimeConfig::default(), Arc::new(SpinSignal::new()));
        rt.add_draw_unit(Box::new(ImmediateUnit::new()));
        let cfg = DisplayConfig::new(20, 20);
        let id = rt.register_display(
            cfg,
            vec![0; 20 * 5 * 4],
            None,
            Box::new(Panel {
                fb: Rc::clone(&fb),
                width: 20,
            }),
        );
        rt.display_mut(id).expect("display").load_screen(screen);
        rt.refresh_display(id, tree, &mut Tracer::none()).expect("refresh");
        assert_eq!(rt.stats().tasks_added, rt.stats().tasks_freed, "every task drained");
        fb.take()
    }

    fn at(fb: &[u8], x: usize, y: usize) -> Rgba {
        let i = (y * 20 + x) * 4;
        read(&fb[i..i + 4], ColorFormat::Xrgb8888)
    }

    #[test]
    fn nested_objects_paint_in_order() {
        let mut tree = ObjectTree::new();
        let screen = tree.create_object(Area::new(0, 0, 19, 19));
        let card = tree.create_object(Area::new(5, 5, 14, 14));
        tree.add_child(screen, card);
        let mut style = tree.style(card);
        style.bg_color = Color::new(0, 0, 255);
        tree.set_style(card, style);

        let fb = render(&tree, screen);
        assert_eq!(at(&fb, 0, 0).rgb(), Color::WHITE);
        assert_eq!(at(&fb, 10, 10).rgb(), Color::new(0, 0, 255));
        assert_eq!(at(&fb, 15, 10).rgb(), Color::WHITE);
    }

    #[test]
    fn translucent_object_is_composited_through_a_layer() {
        let mut tree = ObjectTree::new();
        let screen = tree.create_object(Area::new(0, 0, 19, 19));
        let mut style = tree.style(screen);
        style.bg_color = Color::BLACK;
        tree.set_style(screen, style);
        let card = tree.create_object(Area::new(4, 4, 11, 11));
        tree.add_child(screen, card);
        let mut style = tree.style(card);
        style.bg_color = Color::new(255, 0, 0);
        style.opa = opa::P50;
        tree.set_style(card, style);

        let fb = render(&tree, screen);
        assert_eq!(at(&fb, 8, 8).r, 127);
        assert_eq!(at(&fb, 2, 2).rgb(), Color::BLACK);
    }

    struct Caption;

    impl Painter for Caption {
        fn draw(&self, _obj: ObjectId, event: DrawEvent, ctx: &mut DrawCtx<'_>) {
            if event == DrawEvent::Main {
                let area = ctx.clip_area();
                let _ = ctx.label(&area, "caption", Color::WHITE, opa::COVER);
            }
        }
    }

    #[test]
    fn clipped_corners_and_labels() {
        let mut tree = ObjectTree::new();
        let screen = tree.create_object(Area::new(0, 0, 19, 19));
        let mut style = tree.style(screen);
        style.bg_color = Color::BLACK;
        tree.set_style(screen, style);

        let card = tree.create_object(Area::new(2, 2, 17, 17));
        tree.add_child(screen, card);
        let mut style = tree.style(card);
        style.radius = 6;
        style.clip_corner = true;
        tree.set_style(card, style);
        tree.set_painter(card, Some(Box::new(Caption)));

        let fill = tree.create_object(Area::new(2, 2, 17, 17));
        tree.add_child(card, fill);
        let mut style = tree.style(fill);
        style.bg_color = Color::new(0, 0, 255);
        tree.set_style(fill, style);

        let fb = render(&tree, screen);
        assert_eq!(at(&fb, 2, 2).rgb(), Color::BLACK, "corner masked");
        assert_eq!(at(&fb, 10, 3).rgb(), Color::new(0, 0, 255), "top band composited");
        assert_eq!(at(&fb, 10, 10).rgb(), Color::new(0, 0, 255));
    }
}
