// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Splitting dirty areas into bands that fit the draw buffer.

use crate::area::Area;
use crate::config::RenderMode;
use crate::error::RefreshError;
use crate::trace::PhaseKind;

use super::RefreshCx;
use super::occlusion::find_top_covering_object;

impl RefreshCx<'_, '_> {
    /// Renders and flushes one unjoined dirty area.
    pub(super) fn refresh_area(&mut self, area: &Area) -> Result<(), RefreshError> {
        let mode = self.disp.config.render_mode;
        if mode != RenderMode::Partial {
            let screen = self.disp.screen_area();
            if mode == RenderMode::Full {
                self.disp.last_part = true;
                self.refresh_area_part(screen, screen);
            } else {
                self.disp.last_part = self.disp.last_area;
                self.refresh_area_part(screen, *area);
            }
            return Ok(());
        }

        let y2 = area.y2.min(self.disp.ver_res() - 1);
        let max_row = self.max_row(area.width(), area.height());
        if max_row <= 0 {
            log::error!("display {:?}: no band height fits the draw buffer after rounding", self.id);
            return Err(RefreshError::RowRounding(self.id));
        }

        let mut row = area.y1;
        let mut row_last = None;
        while row + max_row - 1 <= y2 {
            let band = Area::new(area.x1, row, area.x2, row + max_row - 1);
            let end = band.y2;
            if end == y2 {
                self.disp.last_part = true;
            }
            self.refresh_area_part(band, band);
            row_last = Some(end);
            row += max_row;
        }

        if row_last != Some(y2) && row <= y2 {
            let band = Area::new(area.x1, row, area.x2, y2);
            self.disp.last_part = true;
            self.refresh_area_part(band, band);
        }
        Ok(())
    }

    /// Number of rows of width `w` that fit the draw buffer, at most `h`,
    /// shrunk until the driver's rounding keeps the band within that many
    /// rows. Zero when no height survives rounding.
    pub(super) fn max_row(&mut self, w: i32, h: i32) -> i32 {
        let format = self.disp.config.color_format;
        let disp_px = format.size();
        let render_px = if format.has_alpha() { 4 } else { disp_px };
        let w = usize::try_from(w.max(1)).unwrap_or(1);
        let rows = self.disp.buf_size / render_px.max(disp_px).max(1) / w;
        let max_row = i32::try_from(rows).unwrap_or(i32::MAX).min(h);

        let mut h_tmp = max_row;
        while h_tmp > 0 {
            let mut tmp = Area::new(0, 0, 0, h_tmp - 1);
            self.disp.backend.round_area(&mut tmp);
            if tmp.height() <= max_row {
                return tmp.y2 + 1;
            }
            h_tmp -= 1;
        }
        0
    }

    /// Renders everything visible in `clip` into the draw buffer, which
    /// covers `buf_area`, then flushes it.
    pub(super) fn refresh_area_part(&mut self, buf_area: Area, clip: Area) {
        self.disp.refreshed_area = clip;
        if !self.disp.double_buffered {
            self.disp.flush.wait_idle();
        }

        let head = self.disp.layer_head;
        let format = self.disp.config.color_format;
        let Some(buf) = self.disp.bufs[self.disp.active].take() else {
            log::error!("display {:?}: draw buffer is still loaned out", self.id);
            return;
        };
        self.draw.queue.loan_buffer(head, buf, buf_area, format);
        self.draw.queue.set_clip_area(head, clip);

        if format.has_alpha() {
            let disp = &mut *self.disp;
            if let Some(px) = self.draw.queue.layer_mut(head).pixels_mut() {
                disp.backend.buffer_clear(px, &clip);
            }
        }

        self.phase_begin(PhaseKind::Render);
        let scene = self.scene;
        let screens = self.disp.screens;
        let top_act = screens.act.and_then(|s| find_top_covering_object(scene, &clip, s));
        let top_prev = screens.prev.and_then(|s| find_top_covering_object(scene, &clip, s));

        if top_act.is_none() && top_prev.is_none() {
            if let Some(bottom) = screens.bottom {
                self.refresh_obj_and_children(head, bottom);
            }
        }

        let act = top_act.or(screens.act);
        let prev = top_prev.or(screens.prev);
        let order = if screens.draw_prev_over_act {
            [act, prev]
        } else {
            [prev, act]
        };
        for obj in order.into_iter().chain([screens.top, screens.sys]).flatten() {
            self.refresh_obj_and_children(head, obj);
        }

        self.draw.drain_layer(head);
        self.phase_end(PhaseKind::Render);

        self.flush_chunk();
    }
}
