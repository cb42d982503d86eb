// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays object storage with topology, styling and dirty tracking.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use crate::area::{Area, Point};
use crate::color::{Color, opa};
use crate::draw::{DrawCtx, FillDsc, TaskId};
use crate::transform::ObjTransform;

use super::dirty;
use super::{BlendMode, CoverResult, DrawEvent, LayerType, ObjectId, Scene};

const INVALID: u32 = u32::MAX;

/// Paint properties of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjStyle {
    /// Background color.
    pub bg_color: Color,
    /// Background opacity.
    pub bg_opa: u8,
    /// Corner radius.
    pub radius: i32,
    /// Clip children to the rounded corners.
    pub clip_corner: bool,
    /// Opacity of the whole object including children.
    pub opa: u8,
    /// How the object is blended into what is below it.
    pub blend_mode: BlendMode,
    /// Rotation and zoom of the whole object.
    pub transform: ObjTransform,
}

impl Default for ObjStyle {
    fn default() -> Self {
        Self {
            bg_color: Color::WHITE,
            bg_opa: opa::COVER,
            radius: 0,
            clip_corner: false,
            opa: opa::COVER,
            blend_mode: BlendMode::Normal,
            transform: ObjTransform::IDENTITY,
        }
    }
}

/// Per-object boolean flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjFlags {
    /// Whether the object and its subtree are hidden.
    pub hidden: bool,
    /// Whether the painter's
    /// [`task_added`](Painter::task_added) hook is called.
    pub send_task_events: bool,
}

/// Custom drawing attached to an object, on top of the default background.
pub trait Painter {
    /// Draws one phase. Called after the background fill for
    /// [`DrawEvent::Main`].
    fn draw(&self, obj: ObjectId, event: DrawEvent, ctx: &mut DrawCtx<'_>) {
        _ = (obj, event, ctx);
    }

    /// Observes a task the object added (when task events are enabled).
    fn task_added(&self, obj: ObjectId, task: TaskId, ctx: &mut DrawCtx<'_>) {
        _ = (obj, task, ctx);
    }

    /// Overrides the default cover check.
    fn cover_check(&self, obj: ObjectId, area: &Area) -> Option<CoverResult> {
        _ = (obj, area);
        None
    }
}

/// Struct-of-arrays storage for objects.
///
/// Objects are addressed by [`ObjectId`] handles. Destroyed objects are
/// recycled via a free list and generation counters reject stale handles.
/// Coordinates are absolute; moving a parent does not move its children.
pub struct ObjectTree {
    // -- Topology --
    parent: Vec<u32>,
    children: Vec<Vec<u32>>,

    // -- Properties --
    coords: Vec<Area>,
    ext_draw: Vec<i32>,
    style: Vec<ObjStyle>,
    flags: Vec<ObjFlags>,
    painter: Vec<Option<Box<dyn Painter>>>,

    // -- Invalidation --
    last_extent: Vec<Option<Area>>,
    removed_extents: Vec<Area>,
    dirty: DirtyTracker<u32>,

    // -- Allocation --
    generation: Vec<u32>,
    free_list: Vec<u32>,
    len: u32,
}

impl fmt::Debug for ObjectTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTree")
            .field("len", &self.len)
            .field("free", &self.free_list.len())
            .field("coords", &self.coords)
            .finish_non_exhaustive()
    }
}

impl Default for ObjectTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            children: Vec::new(),
            coords: Vec::new(),
            ext_draw: Vec::new(),
            style: Vec::new(),
            flags: Vec::new(),
            painter: Vec::new(),
            last_extent: Vec::new(),
            removed_extents: Vec::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    // -- Allocation --

    /// Creates a parentless object (a screen, until added as a child) with
    /// the default style.
    pub fn create_object(&mut self, coords: Area) -> ObjectId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.children[i].clear();
            self.coords[i] = coords;
            self.ext_draw[i] = 0;
            self.style[i] = ObjStyle::default();
            self.flags[i] = ObjFlags::default();
            self.painter[i] = None;
            self.last_extent[i] = None;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.children.push(Vec::new());
            self.coords.push(coords);
            self.ext_draw.push(0);
            self.style.push(ObjStyle::default());
            self.flags.push(ObjFlags::default());
            self.painter.push(None);
            self.last_extent.push(None);
            self.generation.push(0);
            idx
        };
        self.dirty.mark(idx, dirty::GEOMETRY);
        ObjectId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys an object. Its last drawn extent is invalidated by the next
    /// [`take_invalidations`](Self::take_invalidations).
    ///
    /// # Panics
    ///
    /// Panics if the object has children or the handle is stale.
    pub fn destroy_object(&mut self, id: ObjectId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.children[idx as usize].is_empty(),
            "cannot destroy object with children"
        );
        if let Some(extent) = self.last_extent[idx as usize].take() {
            self.removed_extents.push(extent);
        }
        if self.parent[idx as usize] != INVALID {
            let p = self.parent[idx as usize];
            self.unlink_from_parent(idx);
            self.dirty.mark(p, dirty::TOPOLOGY);
        }
        self.dirty.remove_key(idx);
        self.generation[idx as usize] += 1;
        self.painter[idx as usize] = None;
        self.free_list.push(idx);
    }

    /// Returns whether the handle refers to a live object.
    #[must_use]
    pub fn is_alive(&self, id: ObjectId) -> bool {
        id.idx < self.len && self.generation[id.idx as usize] == id.generation && !self.free_list.contains(&id.idx)
    }

    // -- Topology --

    /// Appends `child` as the topmost child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or `child` already has a parent.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) {
        self.validate(parent);
        self.validate(child);
        let (p, c) = (parent.idx, child.idx);
        assert!(self.parent[c as usize] == INVALID, "child already has a parent");
        self.parent[c as usize] = p;
        self.children[p as usize].push(c);
        let _ = self.dirty.add_dependency(c, p, dirty::VISIBILITY);
        self.dirty.mark_with(c, dirty::VISIBILITY, &EagerPolicy);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Detaches `child` from its parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the object has no parent.
    pub fn remove_from_parent(&mut self, child: ObjectId) {
        self.validate(child);
        let c = child.idx;
        let p = self.parent[c as usize];
        assert!(p != INVALID, "object has no parent");
        self.unlink_from_parent(c);
        self.dirty.remove_dependency(c, p, dirty::VISIBILITY);
        self.dirty.mark_with(c, dirty::VISIBILITY, &EagerPolicy);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Moves `child` to the top of its siblings (drawn last).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the object has no parent.
    pub fn move_to_front(&mut self, child: ObjectId) {
        self.validate(child);
        let c = child.idx;
        let p = self.parent[c as usize];
        assert!(p != INVALID, "object has no parent");
        let siblings = &mut self.children[p as usize];
        siblings.retain(|s| *s != c);
        siblings.push(c);
        self.dirty.mark(c, dirty::GEOMETRY);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Returns the parent, if any.
    #[must_use]
    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.validate(id);
        self.handle(self.parent[id.idx as usize])
    }

    /// Iterates the children bottom to top.
    #[must_use]
    pub fn children(&self, id: ObjectId) -> Children<'_> {
        self.validate(id);
        Children {
            tree: self,
            slots: self.children[id.idx as usize].iter(),
        }
    }

    // -- Properties --

    /// Absolute coordinates.
    #[must_use]
    pub fn coords(&self, id: ObjectId) -> Area {
        self.validate(id);
        self.coords[id.idx as usize]
    }

    /// Paint properties.
    #[must_use]
    pub fn style(&self, id: ObjectId) -> ObjStyle {
        self.validate(id);
        self.style[id.idx as usize]
    }

    /// Flags.
    #[must_use]
    pub fn flags(&self, id: ObjectId) -> ObjFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Moves or resizes an object.
    pub fn set_coords(&mut self, id: ObjectId, coords: Area) {
        self.validate(id);
        self.coords[id.idx as usize] = coords;
        self.dirty.mark(id.idx, dirty::GEOMETRY);
    }

    /// Sets how far drawing may spill past the coordinates.
    pub fn set_ext_draw_size(&mut self, id: ObjectId, ext: i32) {
        self.validate(id);
        self.ext_draw[id.idx as usize] = ext.max(0);
        self.dirty.mark(id.idx, dirty::GEOMETRY);
    }

    /// Replaces the paint properties.
    ///
    /// A transform change moves the whole subtree and propagates.
    pub fn set_style(&mut self, id: ObjectId, style: ObjStyle) {
        self.validate(id);
        let old = core::mem::replace(&mut self.style[id.idx as usize], style);
        if old.transform == style.transform {
            self.dirty.mark(id.idx, dirty::STYLE);
        } else {
            self.dirty.mark_with(id.idx, dirty::VISIBILITY, &EagerPolicy);
        }
    }

    /// Replaces the flags. Hiding propagates to the subtree.
    pub fn set_flags(&mut self, id: ObjectId, flags: ObjFlags) {
        self.validate(id);
        self.flags[id.idx as usize] = flags;
        self.dirty.mark_with(id.idx, dirty::VISIBILITY, &EagerPolicy);
    }

    /// Attaches custom drawing.
    pub fn set_painter(&mut self, id: ObjectId, painter: Option<Box<dyn Painter>>) {
        self.validate(id);
        self.painter[id.idx as usize] = painter;
        self.dirty.mark(id.idx, dirty::STYLE);
    }

    // -- Invalidation --

    /// Drains every dirty channel and returns the areas to redraw: the
    /// previous and the current visual extent of each affected object, and
    /// the last extent of each destroyed object.
    ///
    /// The visual extent covers the extra draw size and every transform on
    /// the path to the root; a hidden object has none.
    pub fn take_invalidations(&mut self) -> Vec<Area> {
        let mut touched: Vec<u32> = self
            .dirty
            .drain(dirty::VISIBILITY)
            .affected()
            .deterministic()
            .run()
            .collect();
        touched.extend(self.dirty.drain(dirty::GEOMETRY).deterministic().run());
        touched.extend(self.dirty.drain(dirty::STYLE).deterministic().run());
        touched.extend(self.dirty.drain(dirty::TOPOLOGY).deterministic().run());
        touched.sort_unstable();
        touched.dedup();

        let mut areas = core::mem::take(&mut self.removed_extents);
        for idx in touched {
            if idx >= self.len || self.free_list.contains(&idx) {
                continue;
            }
            let new = self.visual_extent(idx);
            let old = core::mem::replace(&mut self.last_extent[idx as usize], new);
            areas.extend(old);
            if new != old {
                areas.extend(new);
            }
        }
        areas
    }

    fn visual_extent(&self, idx: u32) -> Option<Area> {
        let ext = self.ext_draw[idx as usize];
        let mut area = self.coords[idx as usize].increase(ext, ext);
        let mut n = idx;
        while n != INVALID {
            let i = n as usize;
            if self.flags[i].hidden {
                return None;
            }
            let origin = Point::new(self.coords[i].x1, self.coords[i].y1);
            area = self.style[i].transform.transform_area(&area, origin, false)?;
            n = self.parent[i];
        }
        Some(area)
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    fn validate(&self, id: ObjectId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale ObjectId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn handle(&self, idx: u32) -> Option<ObjectId> {
        (idx != INVALID).then(|| ObjectId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        self.children[p as usize].retain(|c| *c != idx);
        self.parent[idx as usize] = INVALID;
    }
}

/// An iterator over the direct children of an object, bottom to top.
///
/// Created by [`ObjectTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a ObjectTree,
    slots: core::slice::Iter<'a, u32>,
}

impl Iterator for Children<'_> {
    type Item = ObjectId;

    fn next(&mut self) -> Option<ObjectId> {
        let idx = *self.slots.next()?;
        Some(ObjectId {
            idx,
            generation: self.tree.generation[idx as usize],
        })
    }
}

impl Scene for ObjectTree {
    fn coords(&self, obj: ObjectId) -> Area {
        Self::coords(self, obj)
    }

    fn ext_draw_size(&self, obj: ObjectId) -> i32 {
        self.validate(obj);
        self.ext_draw[obj.idx as usize]
    }

    fn parent(&self, obj: ObjectId) -> Option<ObjectId> {
        Self::parent(self, obj)
    }

    fn child_count(&self, obj: ObjectId) -> usize {
        self.validate(obj);
        self.children[obj.idx as usize].len()
    }

    fn child(&self, obj: ObjectId, index: usize) -> Option<ObjectId> {
        self.validate(obj);
        let idx = *self.children[obj.idx as usize].get(index)?;
        self.handle(idx)
    }

    fn is_hidden(&self, obj: ObjectId) -> bool {
        self.flags(obj).hidden
    }

    fn layer_type(&self, obj: ObjectId) -> LayerType {
        let style = self.style(obj);
        if !style.transform.is_identity() {
            LayerType::Transform
        } else if style.opa < opa::COVER || style.blend_mode != BlendMode::Normal {
            LayerType::Simple
        } else {
            LayerType::None
        }
    }

    fn opa(&self, obj: ObjectId) -> u8 {
        self.style(obj).opa
    }

    fn transform(&self, obj: ObjectId) -> ObjTransform {
        self.style(obj).transform
    }

    fn blend_mode(&self, obj: ObjectId) -> BlendMode {
        self.style(obj).blend_mode
    }

    fn radius(&self, obj: ObjectId) -> i32 {
        self.style(obj).radius
    }

    fn clip_corner(&self, obj: ObjectId) -> bool {
        self.style(obj).clip_corner
    }

    fn sends_task_events(&self, obj: ObjectId) -> bool {
        self.flags(obj).send_task_events
    }

    fn cover_check(&self, obj: ObjectId, area: &Area) -> CoverResult {
        let style = self.style(obj);
        if let Some(res) = self.painter[obj.idx as usize]
            .as_ref()
            .and_then(|p| p.cover_check(obj, area))
        {
            return res;
        }
        if style.clip_corner && style.radius > 0 {
            return CoverResult::Masked;
        }
        if !area.is_in(&self.coords[obj.idx as usize], style.radius)
            || style.bg_opa < opa::MAX
            || style.opa < opa::MAX
            || style.blend_mode != BlendMode::Normal
            || !style.transform.is_identity()
        {
            return CoverResult::NotCover;
        }
        CoverResult::Cover
    }

    fn draw_event(&self, obj: ObjectId, event: DrawEvent, ctx: &mut DrawCtx<'_>) {
        let style = self.style(obj);
        if event == DrawEvent::Main && style.bg_opa >= opa::MIN {
            ctx.fill(
                &self.coords[obj.idx as usize],
                FillDsc {
                    color: style.bg_color,
                    opa: style.bg_opa,
                    radius: style.radius,
                },
            );
        }
        if let Some(painter) = &self.painter[obj.idx as usize] {
            painter.draw(obj, event, ctx);
        }
    }

    fn task_added(&self, obj: ObjectId, task: TaskId, ctx: &mut DrawCtx<'_>) {
        self.validate(obj);
        if let Some(painter) = &self.painter[obj.idx as usize] {
            painter.task_added(obj, task, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn tree_with_screen() -> (ObjectTree, ObjectId) {
        let mut tree = ObjectTree::new();
        let screen = tree.create_object(Area::new(0, 0, 99, 99));
        (tree, screen)
    }

    #[test]
    fn children_are_in_draw_order() {
        let (mut tree, screen) = tree_with_screen();
        let a = tree.create_object(Area::new(0, 0, 9, 9));
        let b = tree.create_object(Area::new(0, 0, 9, 9));
        tree.add_child(screen, a);
        tree.add_child(screen, b);
        assert_eq!(tree.children(screen).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(Scene::child(&tree, screen, 1), Some(b));

        tree.move_to_front(a);
        assert_eq!(tree.children(screen).collect::<Vec<_>>(), vec![b, a]);
        assert_eq!(tree.parent(a), Some(screen));
    }

    #[test]
    fn slot_reuse_bumps_generation() {
        let mut tree = ObjectTree::new();
        let a = tree.create_object(Area::new(0, 0, 9, 9));
        tree.destroy_object(a);
        let b = tree.create_object(Area::new(0, 0, 9, 9));
        assert_eq!(a.index(), b.index());
        assert!(!tree.is_alive(a));
        assert!(tree.is_alive(b));
    }

    #[test]
    #[should_panic(expected = "stale ObjectId")]
    fn stale_handle_panics() {
        let mut tree = ObjectTree::new();
        let a = tree.create_object(Area::new(0, 0, 9, 9));
        tree.destroy_object(a);
        let _ = tree.coords(a);
    }

    #[test]
    #[should_panic(expected = "cannot destroy object with children")]
    fn destroy_with_children_panics() {
        let (mut tree, screen) = tree_with_screen();
        let a = tree.create_object(Area::new(0, 0, 9, 9));
        tree.add_child(screen, a);
        tree.destroy_object(screen);
    }

    #[test]
    fn layer_type_follows_style() {
        let (mut tree, screen) = tree_with_screen();
        assert_eq!(tree.layer_type(screen), LayerType::None);

        let mut style = tree.style(screen);
        style.opa = opa::P50;
        tree.set_style(screen, style);
        assert_eq!(tree.layer_type(screen), LayerType::Simple);

        style.opa = opa::COVER;
        style.blend_mode = BlendMode::Additive;
        tree.set_style(screen, style);
        assert_eq!(tree.layer_type(screen), LayerType::Simple);

        style.transform = ObjTransform::new(450, 256, Point::new(50, 50));
        tree.set_style(screen, style);
        assert_eq!(tree.layer_type(screen), LayerType::Transform);
    }

    #[test]
    fn default_cover_check() {
        let (mut tree, screen) = tree_with_screen();
        let inside = Area::new(10, 10, 20, 20);
        assert_eq!(tree.cover_check(screen, &inside), CoverResult::Cover);
        assert_eq!(
            tree.cover_check(screen, &Area::new(90, 90, 120, 120)),
            CoverResult::NotCover
        );

        let mut style = tree.style(screen);
        style.bg_opa = opa::P50;
        tree.set_style(screen, style);
        assert_eq!(tree.cover_check(screen, &inside), CoverResult::NotCover);

        style.bg_opa = opa::COVER;
        style.radius = 20;
        tree.set_style(screen, style);
        // Corner pixel is outside the rounding.
        assert_eq!(
            tree.cover_check(screen, &Area::new(0, 0, 5, 5)),
            CoverResult::NotCover
        );
        assert_eq!(tree.cover_check(screen, &inside), CoverResult::Cover);

        style.clip_corner = true;
        tree.set_style(screen, style);
        assert_eq!(tree.cover_check(screen, &inside), CoverResult::Masked);
    }

    #[test]
    fn invalidations_report_old_and_new_extent() {
        let (mut tree, screen) = tree_with_screen();
        let a = tree.create_object(Area::new(0, 0, 9, 9));
        tree.add_child(screen, a);
        let first = tree.take_invalidations();
        assert!(first.contains(&Area::new(0, 0, 99, 99)));
        assert!(first.contains(&Area::new(0, 0, 9, 9)));
        assert!(tree.take_invalidations().is_empty(), "channels drained");

        tree.set_coords(a, Area::new(20, 0, 29, 9));
        assert_eq!(
            tree.take_invalidations(),
            vec![Area::new(0, 0, 9, 9), Area::new(20, 0, 29, 9)]
        );
    }

    #[test]
    fn hiding_parent_invalidates_subtree_once() {
        let (mut tree, screen) = tree_with_screen();
        let a = tree.create_object(Area::new(0, 0, 9, 9));
        tree.add_child(screen, a);
        let _ = tree.take_invalidations();

        tree.set_flags(screen, ObjFlags { hidden: true, ..ObjFlags::default() });
        let areas = tree.take_invalidations();
        assert_eq!(areas, vec![Area::new(0, 0, 99, 99), Area::new(0, 0, 9, 9)]);

        tree.set_flags(screen, ObjFlags::default());
        let areas = tree.take_invalidations();
        assert_eq!(areas, vec![Area::new(0, 0, 99, 99), Area::new(0, 0, 9, 9)]);
    }

    #[test]
    fn parent_zoom_grows_child_extent() {
        let (mut tree, screen) = tree_with_screen();
        let a = tree.create_object(Area::new(40, 40, 49, 49));
        tree.add_child(screen, a);
        let _ = tree.take_invalidations();

        let mut style = tree.style(screen);
        style.transform = ObjTransform::new(0, 512, Point::new(0, 0));
        tree.set_style(screen, style);
        let areas = tree.take_invalidations();
        assert!(areas.contains(&Area::new(80, 80, 99, 99)), "{areas:?}");
    }

    #[test]
    fn destroyed_object_extent_is_invalidated() {
        let (mut tree, screen) = tree_with_screen();
        let a = tree.create_object(Area::new(5, 5, 9, 9));
        tree.add_child(screen, a);
        let _ = tree.take_invalidations();
        tree.destroy_object(a);
        assert_eq!(tree.take_invalidations(), vec![Area::new(5, 5, 9, 9)]);
        assert_eq!(tree.child_count(screen), 0);
    }
}
