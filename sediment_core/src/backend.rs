// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for display drivers.
//!
//! A driver implements [`DisplayBackend`] and is registered together with
//! one or two draw buffers through
//! [`Runtime::register_display`](crate::refresh::Runtime::register_display).
//! Only [`flush`](DisplayBackend::flush) is required; every other hook has a
//! default that suits a plain memory-mapped panel.
//!
//! # Flush handshake
//!
//! `flush` receives the rendered pixels and a [`FlushReady`] handle. The
//! driver copies or transmits the pixels, immediately or asynchronously, and
//! calls [`FlushReady::ready`] when the buffer may be drawn into again. The
//! refresh loop waits on that before reusing a single buffer, or before
//! swapping back to a buffer still being sent.
//!
//! ```rust,ignore
//! impl DisplayBackend for Spi {
//!     fn flush(&mut self, area: &Area, px: Pixels<'_>, ready: FlushReady) {
//!         self.dma.start(area, px.data);
//!         self.pending = Some(ready); // call pending.ready() from the DMA IRQ
//!     }
//! }
//! ```

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::area::Area;
use crate::draw::{LayerInfo, Pixels, PixelsMut, Signal};

/// Notifications sent to the driver around a refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisplayEvent {
    /// An area was invalidated and a refresh is wanted.
    RefreshRequest,
    /// A refresh cycle is starting.
    RefreshStart,
    /// Every area has been rendered and flushed.
    RenderReady,
    /// A chunk is about to be flushed (area with the display offset applied).
    FlushStart(Area),
    /// The driver's flush call returned.
    FlushFinish(Area),
    /// The refresh cycle is over.
    RefreshFinish,
}

/// Flush state shared between the refresh loop and [`FlushReady`] handles.
pub(crate) struct FlushState {
    flushing: AtomicBool,
    flushing_last: AtomicBool,
    signal: Arc<dyn Signal>,
}

impl fmt::Debug for FlushState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlushState")
            .field("flushing", &self.flushing.load(Ordering::Relaxed))
            .field("flushing_last", &self.flushing_last.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl FlushState {
    pub(crate) fn new(signal: Arc<dyn Signal>) -> Self {
        Self {
            flushing: AtomicBool::new(false),
            flushing_last: AtomicBool::new(false),
            signal,
        }
    }

    pub(crate) fn begin(&self, last: bool) {
        self.flushing_last.store(last, Ordering::Release);
        self.flushing.store(true, Ordering::Release);
    }

    pub(crate) fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }

    pub(crate) fn is_last(&self) -> bool {
        self.flushing_last.load(Ordering::Acquire)
    }

    /// Blocks until the driver has released the buffer of the last flush.
    pub(crate) fn wait_idle(&self) {
        while self.is_flushing() {
            self.signal.wait();
        }
    }
}

/// Handle a driver uses to report that a flush has finished.
///
/// Cloneable and `Send`, so it can be moved into an interrupt handler or a
/// transfer thread.
#[derive(Clone)]
pub struct FlushReady(pub(crate) Arc<FlushState>);

impl fmt::Debug for FlushReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FlushReady").field(&self.0).finish()
    }
}

impl FlushReady {
    /// Marks the flushed buffer as free again and wakes the refresh loop.
    pub fn ready(&self) {
        self.0.flushing.store(false, Ordering::Release);
        self.0.signal.notify();
    }

    /// Whether the flush in progress is the last chunk of the refresh.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.0.is_last()
    }
}

/// A display driver.
pub trait DisplayBackend {
    /// Sends `px` (covering `area`, display offset applied) to the panel.
    ///
    /// The pixels are only borrowed for the call; `ready` must be signalled
    /// once the panel no longer reads the buffer.
    fn flush(&mut self, area: &Area, px: Pixels<'_>, ready: FlushReady);

    /// Converts rendered pixels in place into the panel's wire format, e.g.
    /// byte-swapping RGB565.
    fn buffer_convert(&mut self, px: PixelsMut<'_>) {
        _ = px;
    }

    /// Clears `area` of a band before rendering into an alpha format.
    fn buffer_clear(&mut self, mut px: PixelsMut<'_>, area: &Area) {
        px.clear(area);
    }

    /// Copies `area` from the on-screen buffer into the off-screen one.
    fn buffer_copy(&mut self, mut dst: PixelsMut<'_>, src: Pixels<'_>, area: &Area) {
        dst.copy_from(&src, area);
    }

    /// Adjusts a band to the panel's addressing granularity. The refresh
    /// loop shrinks bands until the rounded band fits the draw buffer.
    fn round_area(&mut self, area: &mut Area) {
        _ = area;
    }

    /// Inspects (and may round) a newly invalidated area. Returning `false`
    /// drops it.
    fn invalidate_area(&mut self, area: &mut Area) -> bool {
        self.round_area(area);
        true
    }

    /// Observes refresh progress.
    fn event(&mut self, event: DisplayEvent) {
        _ = event;
    }

    /// Called when a child layer is created for this display.
    fn layer_init(&mut self, layer: &LayerInfo) {
        _ = layer;
    }

    /// Called once a child layer has been composited and freed.
    fn layer_deinit(&mut self, layer: &LayerInfo) {
        _ = layer;
    }
}
