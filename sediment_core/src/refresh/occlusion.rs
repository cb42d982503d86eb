// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Occlusion scan: the topmost object that hides an area completely.

use crate::area::Area;
use crate::scene::{CoverResult, LayerType, ObjectId, Scene};

/// Returns the topmost object in the subtree of `obj` that fully covers
/// `area`, or `None`.
///
/// Drawing can start at the returned object: everything painted before it in
/// draw order is hidden. Objects that are hidden, drawn through a layer or
/// do not contain `area` never cover it. A [`CoverResult::Masked`] object
/// ends the search in its subtree.
pub fn find_top_covering_object<S: Scene + ?Sized>(scene: &S, area: &Area, obj: ObjectId) -> Option<ObjectId> {
    if !area.is_in(&scene.coords(obj), 0)
        || scene.is_hidden(obj)
        || scene.layer_type(obj) != LayerType::None
    {
        return None;
    }

    let res = scene.cover_check(obj, area);
    if res == CoverResult::Masked {
        return None;
    }

    // Later children are drawn on top.
    for i in (0..scene.child_count(obj)).rev() {
        if let Some(found) = scene
            .child(obj, i)
            .and_then(|child| find_top_covering_object(scene, area, child))
        {
            return Some(found);
        }
    }

    (res == CoverResult::Cover).then_some(obj)
}
