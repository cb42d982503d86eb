// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handing rendered chunks to the display driver.

use alloc::sync::Arc;

use crate::backend::{DisplayEvent, FlushReady};
use crate::config::{RenderMode, Rotation};
use crate::draw::{Pixels, PixelsMut, stride};
use crate::trace::{FlushEvent, PhaseKind};
#[cfg(feature = "trace-rich")]
use crate::trace::{LayerEvent, LayerEventKind};

use super::RefreshCx;

impl RefreshCx<'_, '_> {
    /// Takes the draw buffer back from the head layer and flushes the area
    /// refreshed last.
    ///
    /// Waits for the previous flush first when double-buffered (the single
    /// buffer case waited before rendering). Swaps buffers afterwards, except
    /// in `Direct` mode where only the last chunk of a cycle swaps.
    pub(super) fn flush_chunk(&mut self) {
        self.phase_begin(PhaseKind::Flush);
        self.release_retired();

        let head = self.disp.layer_head;
        let buf_area = self.draw.queue.layer(head).buf_area();
        let Some(mut buf) = self.draw.queue.reclaim_buffer(head) else {
            log::error!("display {:?}: head layer holds no buffer", self.id);
            self.phase_end(PhaseKind::Flush);
            return;
        };

        let disp = &mut *self.disp;
        if disp.double_buffered {
            disp.flush.wait_idle();
        }
        let last = disp.last_area && disp.last_part;
        disp.flush.begin(last);

        let config = disp.config;
        if config.rotation != Rotation::R0 && config.sw_rotate {
            log::warn!("software rotation is not supported; flushing unrotated");
        }

        let format = config.color_format;
        let rows = usize::try_from(buf_area.height()).unwrap_or(0);
        let len = (stride(&buf_area, format) * rows).min(buf.len());
        let px_area = buf_area.translate(config.offset_x, config.offset_y);
        let area = disp.refreshed_area.translate(config.offset_x, config.offset_y);

        disp.backend.buffer_convert(PixelsMut::new(&mut buf[..len], px_area, format));
        disp.backend.event(DisplayEvent::FlushStart(area));
        disp.backend.flush(
            &area,
            Pixels::new(&buf[..len], px_area, format),
            FlushReady(Arc::clone(&disp.flush)),
        );
        disp.backend.event(DisplayEvent::FlushFinish(area));

        disp.bufs[disp.active] = Some(buf);
        if disp.double_buffered && (config.render_mode != RenderMode::Direct || last) {
            disp.active ^= 1;
        }

        self.summary.chunk_flushed(&area);
        self.phase_end(PhaseKind::Flush);
        self.tracer.flush(&FlushEvent {
            cycle: self.cycle,
            display: self.id,
            area,
            last,
            timestamp: (self.clock)(),
        });
    }

    /// Reports layers freed since the last flush to the driver.
    fn release_retired(&mut self) {
        for info in self.draw.queue.take_retired(self.id) {
            self.disp.backend.layer_deinit(&info);
            #[cfg(feature = "trace-rich")]
            self.tracer.layer(&LayerEvent {
                cycle: self.cycle,
                display: self.id,
                layer: info.id,
                kind: LayerEventKind::Released,
                area: info.buf_area,
                format: info.color_format,
            });
        }
    }
}
