// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Walking the scene and turning objects into draw tasks.
//!
//! Objects with [`LayerType::None`] draw straight into the current layer.
//! Layered objects draw into child layers (in strips for `Simple`, one piece
//! for `Transform`) which are then composited into the current layer.
//! Children of an object with clipped rounded corners are drawn in three
//! bands: the top and bottom bands go through masked child layers, the
//! middle band is drawn directly.

use crate::area::{Area, Point};
use crate::color::{ColorFormat, opa};
use crate::draw::{DrawCtx, LayerDsc, LayerId};
use crate::scene::{CoverResult, DrawEvent, LayerType, ObjectId};
#[cfg(feature = "trace-rich")]
use crate::trace::{LayerEvent, LayerEventKind};

use super::RefreshCx;

impl RefreshCx<'_, '_> {
    /// Draws `top`, then everything drawn after it: its younger siblings and
    /// the younger siblings of each ancestor, closing every ancestor with
    /// its post-draw events.
    pub(super) fn refresh_obj_and_children(&mut self, layer: LayerId, top: ObjectId) {
        let scene = self.scene;
        self.refresh_obj(layer, top);

        let mut border = top;
        let mut parent = scene.parent(top);
        while let Some(p) = parent {
            let mut after = false;
            for i in 0..scene.child_count(p) {
                let Some(child) = scene.child(p, i) else {
                    continue;
                };
                if after {
                    self.refresh_obj(layer, child);
                } else if child == border {
                    after = true;
                }
            }
            self.send_post_events(layer, p);
            border = p;
            parent = scene.parent(p);
        }
    }

    /// Draws one object and its subtree into `layer`, through child layers
    /// when the object asks for one.
    pub(super) fn refresh_obj(&mut self, layer: LayerId, obj: ObjectId) {
        let scene = self.scene;
        if scene.is_hidden(obj) {
            return;
        }
        let layer_type = scene.layer_type(obj);
        if layer_type == LayerType::None {
            self.redraw(layer, obj);
            return;
        }

        let opa = scene.opa(obj);
        if opa < opa::MIN {
            return;
        }
        let clip = self.draw.queue.layer(layer).clip_area();
        let Some(full) = self.layer_area(obj, layer_type, &clip) else {
            return;
        };

        let native = self.disp.config.color_format;
        let (rgb_rows, argb_rows) = if layer_type == LayerType::Simple {
            let budget = self.config.layer_simple_buf_size;
            let w = usize::try_from(full.width()).unwrap_or(1).max(1);
            (strip_rows(budget / w / native.size()), strip_rows(budget / w / 4))
        } else {
            (full.height(), full.height())
        };

        let transform = scene.transform(obj);
        let coords = scene.coords(obj);
        let mut y1 = full.y1;
        while y1 <= full.y2 {
            let mut strip = Area::new(full.x1, y1, full.x2, (y1 + rgb_rows - 1).min(full.y2));
            let alpha = self.needs_alpha(obj, &strip);
            if alpha {
                strip.y2 = (y1 + argb_rows - 1).min(full.y2);
            }
            let format = if alpha { ColorFormat::Argb8888 } else { native };

            let child = self.create_child_layer(layer, format, strip);
            self.redraw(child, obj);

            let dsc = LayerDsc {
                src: child,
                opa,
                angle: transform.normalized_angle(),
                zoom: transform.zoom,
                blend_mode: scene.blend_mode(obj),
                pivot: Point::new(
                    coords.x1 + transform.pivot.x - strip.x1,
                    coords.y1 + transform.pivot.y - strip.y1,
                ),
                antialias: self.disp.config.antialiasing,
            };
            self.draw.draw_layer(layer, dsc, strip);
            y1 = strip.y2 + 1;
        }
    }

    /// Draws an object's own events and its children, restricted to the
    /// layer's clip area. The clip area is restored afterwards.
    pub(super) fn redraw(&mut self, layer: LayerId, obj: ObjectId) {
        let scene = self.scene;
        let clip_ori = self.draw.queue.layer(layer).clip_area();
        let Some(clip_obj) = clip_ori.intersect(&scene.ext_coords(obj)) else {
            return;
        };
        self.draw.queue.set_clip_area(layer, clip_obj);
        self.send_draw_event(layer, obj, DrawEvent::MainBegin);
        self.send_draw_event(layer, obj, DrawEvent::Main);
        self.send_draw_event(layer, obj, DrawEvent::MainEnd);

        let coords = scene.coords(obj);
        if let Some(clip_children) = clip_ori.intersect(&coords) {
            if scene.child_count(obj) == 0 {
                self.draw.queue.set_clip_area(layer, clip_obj);
                self.send_post_events(layer, obj);
            } else {
                self.draw.queue.set_clip_area(layer, clip_children);
                let radius = scene.radius(obj);
                if scene.clip_corner(obj) && radius != 0 {
                    self.redraw_clipped_children(layer, obj, clip_ori, radius);
                } else {
                    self.refresh_children(layer, obj);
                    self.draw.queue.set_clip_area(layer, clip_obj);
                    self.send_post_events(layer, obj);
                }
            }
        }

        self.draw.queue.set_clip_area(layer, clip_ori);
    }

    fn redraw_clipped_children(&mut self, layer: LayerId, obj: ObjectId, clip_ori: Area, radius: i32) {
        let coords = self.scene.coords(obj);
        let rout = radius.min(coords.width().min(coords.height()) >> 1);

        let bottom = Area::new(coords.x1, coords.y2 - rout + 1, coords.x2, coords.y2);
        let top = Area::new(coords.x1, coords.y1, coords.x2, coords.y1 + rout - 1);
        for band in [bottom, top] {
            let Some(band) = band.intersect(&clip_ori) else {
                continue;
            };
            let child = self.create_child_layer(layer, ColorFormat::Argb8888, band);
            self.refresh_children(child, obj);
            self.send_post_events(child, obj);
            DrawCtx::detached(self.draw, child).mask_rect(&coords, radius);
            self.draw.draw_layer(layer, LayerDsc::new(child), band);
        }

        let mid = Area::new(coords.x1, coords.y1 + rout, coords.x2, coords.y2 - rout);
        if let Some(mid) = mid.intersect(&clip_ori) {
            self.draw.queue.set_clip_area(layer, mid);
            self.refresh_children(layer, obj);
            self.send_post_events(layer, obj);
        }
    }

    fn refresh_children(&mut self, layer: LayerId, obj: ObjectId) {
        let scene = self.scene;
        for i in 0..scene.child_count(obj) {
            if let Some(child) = scene.child(obj, i) {
                self.refresh_obj(layer, child);
            }
        }
    }

    /// The part of a layered object that has to be rendered for `clip`.
    ///
    /// For a transformed object this maps the visible part back into the
    /// object's own space, grown by a pixel for rounding.
    fn layer_area(&self, obj: ObjectId, layer_type: LayerType, clip: &Area) -> Option<Area> {
        let scene = self.scene;
        let ext = scene.ext_coords(obj);
        match layer_type {
            LayerType::Transform => {
                let visible = scene.transformed_area(obj, &ext, false)?.intersect(clip)?;
                let back = scene.transformed_area(obj, &visible, true)?;
                Some(back.intersect(&ext)?.increase(1, 1))
            }
            LayerType::Simple => clip.intersect(&ext),
            LayerType::None => {
                log::warn!("unhandled layer type for {obj:?}");
                None
            }
        }
    }

    /// Whether a strip of a layered object may contain transparent pixels.
    fn needs_alpha(&self, obj: ObjectId, strip: &Area) -> bool {
        if !strip.is_in(&self.scene.coords(obj), 0) {
            return true;
        }
        self.scene.cover_check(obj, strip) != CoverResult::Cover
    }

    fn create_child_layer(&mut self, parent: LayerId, format: ColorFormat, area: Area) -> LayerId {
        let id = self.draw.create_layer(parent, format, area);
        let info = self.draw.queue.layer(id).info(id);
        self.disp.backend.layer_init(&info);
        #[cfg(feature = "trace-rich")]
        self.tracer.layer(&LayerEvent {
            cycle: self.cycle,
            display: self.id,
            layer: id,
            kind: LayerEventKind::Created,
            area,
            format,
        });
        id
    }

    // -- Draw events --

    fn send_post_events(&mut self, layer: LayerId, obj: ObjectId) {
        self.send_draw_event(layer, obj, DrawEvent::PostBegin);
        self.send_draw_event(layer, obj, DrawEvent::Post);
        self.send_draw_event(layer, obj, DrawEvent::PostEnd);
    }

    fn send_draw_event(&mut self, layer: LayerId, obj: ObjectId, event: DrawEvent) {
        let scene = self.scene;
        let notify = scene.sends_task_events(obj);
        scene.draw_event(obj, event, &mut DrawCtx::render(self.draw, layer, obj, notify));
        if notify {
            self.deliver_task_events();
        }
    }

    /// Hands queued task-added notifications to their objects, dispatching
    /// after each one.
    fn deliver_task_events(&mut self) {
        let scene = self.scene;
        for (obj, task) in self.draw.take_pending_events() {
            if !self.draw.queue.is_task_alive(task) {
                continue;
            }
            let Some(layer) = self.draw.queue.task(task).layer else {
                continue;
            };
            scene.task_added(obj, task, &mut DrawCtx::task_event(self.draw, layer, obj));
            self.draw.dispatch();
        }
    }
}

fn strip_rows(rows: usize) -> i32 {
    i32::try_from(rows).unwrap_or(i32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    use crate::area::{Area, Point};
    use crate::color::{ColorFormat, opa};
    use crate::config::{DisplayConfig, RuntimeConfig};
    use crate::draw::{DrawCtx, FillDsc, SpinSignal, TaskId, TaskKind};
    use crate::output::DisplayId;
    use crate::refresh::Runtime;
    use crate::refresh::testing::{Backend, Instant, Shared};
    use crate::scene::{DrawEvent, ObjFlags, ObjStyle, ObjectId, ObjectTree, Painter};
    use crate::trace::Tracer;
    use crate::transform::ObjTransform;

    fn setup(w: i32, h: i32, simple_buf: usize) -> (Runtime, DisplayId, Shared, ObjectTree, ObjectId) {
        setup_with(
            w,
            h,
            RuntimeConfig {
                layer_simple_buf_size: simple_buf,
                ..RuntimeConfig::default()
            },
        )
    }

    fn setup_with(w: i32, h: i32, config: RuntimeConfig) -> (Runtime, DisplayId, Shared, ObjectTree, ObjectId) {
        let log: Shared = Rc::new(RefCell::new(Default::default()));
        let mut rt = Runtime::with_signal(config, Arc::new(SpinSignal::new()));
        rt.add_draw_unit(Box::new(Instant(Rc::clone(&log))));
        let cfg = DisplayConfig::new(w, h);
        let bytes = (w * h * 4) as usize;
        let id = rt.register_display(cfg, vec![0; bytes], None, Box::new(Backend(Rc::clone(&log))));
        let mut tree = ObjectTree::new();
        let screen = tree.create_object(cfg.screen_area());
        rt.display_mut(id).expect("display").screens_mut().act = Some(screen);
        (rt, id, log, tree, screen)
    }

    fn refresh(rt: &mut Runtime, id: DisplayId, tree: &ObjectTree, area: Area) {
        rt.invalidate(Some(id), Some(&area));
        rt.refresh_display(id, tree, &mut Tracer::none()).expect("refresh");
    }

    #[test]
    fn half_opaque_object_composites_each_strip() {
        // 20 px wide, 800 byte budget: 10 ARGB rows per strip.
        let (mut rt, id, log, mut tree, screen) = setup(50, 50, 800);
        let obj = tree.create_object(Area::new(10, 10, 29, 34));
        tree.add_child(screen, obj);
        tree.set_style(
            obj,
            ObjStyle {
                opa: 128,
                ..ObjStyle::default()
            },
        );
        refresh(&mut rt, id, &tree, Area::new(0, 0, 49, 49));

        let log = log.borrow();
        let strips: Vec<_> = log.layers.iter().map(|l| (l.buf_area, l.color_format)).collect();
        assert_eq!(
            strips,
            vec![
                (Area::new(10, 10, 29, 19), ColorFormat::Argb8888),
                (Area::new(10, 20, 29, 29), ColorFormat::Argb8888),
                (Area::new(10, 30, 29, 34), ColorFormat::Argb8888),
            ]
        );
        let composites: Vec<_> = log
            .tasks
            .iter()
            .filter_map(|(_, k)| match k {
                TaskKind::Layer(dsc) => Some((dsc.opa, dsc.angle, dsc.zoom)),
                _ => None,
            })
            .collect();
        assert_eq!(composites, vec![(128, 0, 256); 3]);
        assert_eq!(log.released, 3, "every strip is released after its composite");
    }

    #[test]
    fn transparent_object_is_skipped() {
        let (mut rt, id, log, mut tree, screen) = setup(20, 20, 24 * 1024);
        let obj = tree.create_object(Area::new(0, 0, 9, 9));
        tree.add_child(screen, obj);
        tree.set_style(
            obj,
            ObjStyle {
                opa: opa::TRANSP,
                ..ObjStyle::default()
            },
        );
        refresh(&mut rt, id, &tree, Area::new(0, 0, 19, 19));
        assert!(log.borrow().layers.is_empty());
        assert_eq!(log.borrow().tasks.len(), 1, "only the screen background");
    }

    #[test]
    fn transformed_object_uses_one_layer_with_pivot() {
        let (mut rt, id, log, mut tree, screen) = setup(100, 100, 24 * 1024);
        let obj = tree.create_object(Area::new(40, 40, 59, 59));
        tree.add_child(screen, obj);
        tree.set_style(
            obj,
            ObjStyle {
                transform: ObjTransform::new(900, 256, Point::new(10, 10)),
                ..ObjStyle::default()
            },
        );
        refresh(&mut rt, id, &tree, Area::new(0, 0, 99, 99));

        let log = log.borrow();
        assert_eq!(log.layers.len(), 1);
        let layer = log.layers[0];
        assert_eq!(layer.color_format, ColorFormat::Argb8888);
        assert!(Area::new(40, 40, 59, 59).is_in(&layer.buf_area, 0));
        let dsc = log
            .tasks
            .iter()
            .find_map(|(_, k)| match k {
                TaskKind::Layer(dsc) => Some(*dsc),
                _ => None,
            })
            .expect("composite task");
        assert_eq!(dsc.angle, 900);
        assert_eq!(
            dsc.pivot,
            Point::new(50 - layer.buf_area.x1, 50 - layer.buf_area.y1)
        );
    }

    #[test]
    fn sequential_strips_stay_within_the_memory_budget() {
        // 20 × 10 ARGB strips take 1 KiB each; a strip is freed before the next allocates.
        let (mut rt, id, log, mut tree, screen) = setup_with(
            50,
            50,
            RuntimeConfig {
                layer_simple_buf_size: 800,
                layer_max_memory_kb: 1,
                ..RuntimeConfig::default()
            },
        );
        let obj = tree.create_object(Area::new(10, 10, 29, 34));
        tree.add_child(screen, obj);
        tree.set_style(
            obj,
            ObjStyle {
                opa: 128,
                ..ObjStyle::default()
            },
        );
        refresh(&mut rt, id, &tree, Area::new(0, 0, 49, 49));

        assert_eq!(log.borrow().layers.len(), 3);
        assert_eq!(rt.stats().peak_memory_kb, 1);
        assert_eq!(rt.stats().used_memory_kb, 0);
    }

    #[test]
    fn nested_layers_over_the_memory_budget_still_drain() {
        // Each transform layer needs more than the whole 4 KiB budget.
        let (mut rt, id, log, mut tree, screen) = setup_with(
            40,
            40,
            RuntimeConfig {
                layer_max_memory_kb: 4,
                ..RuntimeConfig::default()
            },
        );
        let outer = tree.create_object(Area::new(5, 5, 34, 34));
        let inner = tree.create_object(Area::new(10, 10, 29, 29));
        tree.add_child(screen, outer);
        tree.add_child(outer, inner);
        for (obj, pivot) in [(outer, Point::new(15, 15)), (inner, Point::new(10, 10))] {
            tree.set_style(
                obj,
                ObjStyle {
                    transform: ObjTransform::new(0, 300, pivot),
                    ..ObjStyle::default()
                },
            );
        }
        refresh(&mut rt, id, &tree, Area::new(0, 0, 39, 39));

        let log = log.borrow();
        assert_eq!(log.layers.len(), 2);
        assert_eq!(log.layers[1].parent, Some(log.layers[0].id), "inner layer nests in the outer one");
        assert_eq!(log.released, 2);
        let stats = rt.stats();
        assert!(stats.peak_memory_kb > 4, "the inner layer was allocated over budget");
        assert_eq!(stats.used_memory_kb, 0);
        assert_eq!(stats.layers_freed, stats.layers_created);
        assert_eq!(stats.tasks_freed, stats.tasks_added);
    }

    #[test]
    fn clip_corner_draws_masked_bands() {
        let (mut rt, id, log, mut tree, screen) = setup(100, 100, 24 * 1024);
        let card = tree.create_object(Area::new(10, 10, 49, 49));
        let inner = tree.create_object(Area::new(10, 10, 49, 49));
        tree.add_child(screen, card);
        tree.add_child(card, inner);
        tree.set_style(
            card,
            ObjStyle {
                radius: 8,
                clip_corner: true,
                ..ObjStyle::default()
            },
        );
        refresh(&mut rt, id, &tree, Area::new(0, 0, 99, 99));

        let log = log.borrow();
        let bands: Vec<_> = log.layers.iter().map(|l| l.buf_area).collect();
        assert_eq!(bands, vec![Area::new(10, 42, 49, 49), Area::new(10, 10, 49, 17)]);
        let masks = log
            .tasks
            .iter()
            .filter(|(_, k)| matches!(k, TaskKind::MaskRect(m) if m.radius == 8))
            .count();
        assert_eq!(masks, 2);
    }

    #[test]
    fn hidden_subtree_is_not_drawn() {
        let (mut rt, id, log, mut tree, screen) = setup(20, 20, 24 * 1024);
        let obj = tree.create_object(Area::new(0, 0, 9, 9));
        tree.add_child(screen, obj);
        tree.set_flags(
            obj,
            ObjFlags {
                hidden: true,
                ..ObjFlags::default()
            },
        );
        refresh(&mut rt, id, &tree, Area::new(0, 0, 19, 19));
        assert_eq!(log.borrow().tasks.len(), 1);
    }

    #[test]
    fn drawing_starts_at_covering_object_and_posts_to_ancestors() {
        struct Events(Rc<RefCell<Vec<(ObjectId, DrawEvent)>>>);
        impl Painter for Events {
            fn draw(&self, obj: ObjectId, event: DrawEvent, _ctx: &mut DrawCtx<'_>) {
                self.0.borrow_mut().push((obj, event));
            }
        }

        let (mut rt, id, _log, mut tree, screen) = setup(100, 100, 24 * 1024);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let card = tree.create_object(Area::new(0, 0, 49, 49));
        let sibling = tree.create_object(Area::new(60, 60, 69, 69));
        tree.add_child(screen, card);
        tree.add_child(screen, sibling);
        for obj in [screen, card, sibling] {
            tree.set_painter(obj, Some(Box::new(Events(Rc::clone(&seen)))));
        }
        refresh(&mut rt, id, &tree, Area::new(5, 5, 9, 9));

        let seen = seen.borrow();
        let mains: Vec<_> = seen.iter().filter(|(_, e)| *e == DrawEvent::Main).map(|(o, _)| *o).collect();
        assert_eq!(mains, vec![card], "the screen below the card is skipped");
        let posts: Vec<_> = seen.iter().filter(|(_, e)| *e == DrawEvent::Post).map(|(o, _)| *o).collect();
        assert_eq!(posts, vec![card, screen]);
    }

    #[test]
    fn task_events_reach_the_object_once() {
        struct Counting(Rc<Cell<usize>>);
        impl Painter for Counting {
            fn draw(&self, _obj: ObjectId, event: DrawEvent, ctx: &mut DrawCtx<'_>) {
                if event == DrawEvent::Main {
                    let _ = ctx.fill(&Area::new(0, 0, 4, 4), FillDsc::solid(crate::color::Color::BLACK));
                }
            }

            fn task_added(&self, _obj: ObjectId, task: TaskId, ctx: &mut DrawCtx<'_>) {
                self.0.set(self.0.get() + 1);
                // Drawn from the notification, not reported again.
                let area = ctx.task(task).area;
                let _ = ctx.fill(&area, FillDsc::solid(crate::color::Color::WHITE));
            }
        }

        let (mut rt, id, log, mut tree, screen) = setup(20, 20, 24 * 1024);
        let calls = Rc::new(Cell::new(0));
        tree.set_painter(screen, Some(Box::new(Counting(Rc::clone(&calls)))));
        tree.set_flags(
            screen,
            ObjFlags {
                send_task_events: true,
                ..ObjFlags::default()
            },
        );
        refresh(&mut rt, id, &tree, Area::new(0, 0, 19, 19));
        // Background fill and painter fill.
        assert_eq!(calls.get(), 2);
        assert_eq!(log.borrow().tasks.len(), 4);
    }
}
