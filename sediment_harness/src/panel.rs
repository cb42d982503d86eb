// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A display backend that renders into memory.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::thread::{self, JoinHandle};

use sediment_core::area::Area;
use sediment_core::backend::{DisplayBackend, DisplayEvent, FlushReady};
use sediment_core::color::{Color, ColorFormat};
use sediment_core::config::DisplayConfig;
use sediment_core::draw::{LayerInfo, Pixels};
use sediment_render::raster::{Rgba, read};

/// How the panel reports finished flushes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReadyMode {
    /// Signals readiness before `flush` returns.
    #[default]
    Immediate,
    /// Signals readiness from a short-lived thread, like a DMA completion
    /// interrupt would.
    Thread,
}

/// One flushed chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlushRecord {
    /// The area, display offset applied.
    pub area: Area,
    /// Whether the chunk was the last of its refresh.
    pub last: bool,
}

#[derive(Debug, Default)]
struct PanelState {
    flushes: Vec<FlushRecord>,
    events: Vec<DisplayEvent>,
    layers_created: Vec<LayerInfo>,
    layers_released: Vec<LayerInfo>,
    framebuffer: Vec<u8>,
}

/// In-memory panel covering the display's physical resolution.
pub struct HeadlessPanel {
    state: Rc<RefCell<PanelState>>,
    width: i32,
    height: i32,
    format: ColorFormat,
    ready: ReadyMode,
    completions: Vec<JoinHandle<()>>,
}

impl fmt::Debug for HeadlessPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessPanel")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("ready", &self.ready)
            .finish_non_exhaustive()
    }
}

impl HeadlessPanel {
    /// Creates a panel for `config` and the probe that observes it.
    #[must_use]
    pub fn new(config: &DisplayConfig, ready: ReadyMode) -> (Self, PanelProbe) {
        let (width, height) = (config.physical_hor_res, config.physical_ver_res);
        let format = config.color_format;
        let len = usize::try_from(width).unwrap_or(0) * usize::try_from(height).unwrap_or(0) * format.size();
        let state = Rc::new(RefCell::new(PanelState {
            framebuffer: vec![0; len],
            ..PanelState::default()
        }));
        let panel = Self {
            state: Rc::clone(&state),
            width,
            height,
            format,
            ready,
            completions: Vec::new(),
        };
        let probe = PanelProbe { state, width, format };
        (panel, probe)
    }

    fn blit(&self, area: &Area, px: &Pixels<'_>) {
        let mut state = self.state.borrow_mut();
        let size = self.format.size();
        let stride = usize::try_from(self.width).unwrap_or(0) * size;
        for y in area.y1.max(0)..=area.y2.min(self.height - 1) {
            let (x1, x2) = (area.x1.max(0), area.x2.min(self.width - 1));
            let Some(row) = px.row(y, x1, x2) else {
                log::warn!("flushed pixels miss row {y} of {area:?}");
                continue;
            };
            let start = usize::try_from(y).unwrap_or(0) * stride + usize::try_from(x1).unwrap_or(0) * size;
            if let Some(dst) = state.framebuffer.get_mut(start..start + row.len()) {
                dst.copy_from_slice(row);
            }
        }
    }
}

impl DisplayBackend for HeadlessPanel {
    fn flush(&mut self, area: &Area, px: Pixels<'_>, ready: FlushReady) {
        self.blit(area, &px);
        self.state.borrow_mut().flushes.push(FlushRecord {
            area: *area,
            last: ready.is_last(),
        });
        match self.ready {
            ReadyMode::Immediate => ready.ready(),
            ReadyMode::Thread => self.completions.push(thread::spawn(move || ready.ready())),
        }
    }

    fn event(&mut self, event: DisplayEvent) {
        self.state.borrow_mut().events.push(event);
    }

    fn layer_init(&mut self, layer: &LayerInfo) {
        self.state.borrow_mut().layers_created.push(*layer);
    }

    fn layer_deinit(&mut self, layer: &LayerInfo) {
        self.state.borrow_mut().layers_released.push(*layer);
    }
}

impl Drop for HeadlessPanel {
    fn drop(&mut self) {
        for handle in self.completions.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Test-side view of a [`HeadlessPanel`].
pub struct PanelProbe {
    state: Rc<RefCell<PanelState>>,
    width: i32,
    format: ColorFormat,
}

impl fmt::Debug for PanelProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("PanelProbe")
            .field("flushes", &state.flushes.len())
            .field("events", &state.events.len())
            .finish_non_exhaustive()
    }
}

impl PanelProbe {
    /// Flushed chunks, oldest first.
    #[must_use]
    pub fn flushes(&self) -> Vec<FlushRecord> {
        self.state.borrow().flushes.clone()
    }

    /// Events received, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.state.borrow().events.clone()
    }

    /// Child layers announced through `layer_init`.
    #[must_use]
    pub fn layers_created(&self) -> Vec<LayerInfo> {
        self.state.borrow().layers_created.clone()
    }

    /// Child layers announced through `layer_deinit`.
    #[must_use]
    pub fn layers_released(&self) -> Vec<LayerInfo> {
        self.state.borrow().layers_released.clone()
    }

    /// The framebuffer bytes, row-major at the physical resolution.
    #[must_use]
    pub fn framebuffer(&self) -> Ref<'_, [u8]> {
        Ref::map(self.state.borrow(), |s| s.framebuffer.as_slice())
    }

    /// The pixel at `(x, y)` of the physical panel.
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgba> {
        if x < 0 || y < 0 || x >= self.width {
            return None;
        }
        let size = self.format.size();
        let i = (usize::try_from(y).ok()? * usize::try_from(self.width).ok()? + usize::try_from(x).ok()?) * size;
        let fb = self.framebuffer();
        fb.get(i..i + size).map(|px| read(px, self.format))
    }

    /// The color at `(x, y)`, ignoring alpha.
    #[must_use]
    pub fn color(&self, x: i32, y: i32) -> Option<Color> {
        self.pixel(x, y).map(Rgba::rgb)
    }

    /// Forgets flushes, events and layers; keeps the framebuffer.
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();
        state.flushes.clear();
        state.events.clear();
        state.layers_created.clear();
        state.layers_released.clear();
    }
}
