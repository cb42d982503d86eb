// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display refresh and compositing core.
//!
//! `sediment_core` decides which parts of a display need redrawing, walks a
//! scene of objects to produce draw tasks for those parts, drains the tasks
//! through pluggable draw units and hands finished pixel buffers to a display
//! driver. It is `no_std` compatible (with `alloc`) and stores layers, tasks
//! and objects in arenas addressed by generation-checked handles.
//!
//! # Architecture
//!
//! One refresh cycle of one display, driven by [`Runtime::refresh_display`]
//! (or periodically by [`Runtime::tick`]):
//!
//! ```text
//!   Display::invalidate ──► InvalidAreas (bounded, deduplicated)
//!                                │
//!                                ▼
//!                         InvalidAreas::join
//!                                │  unjoined areas
//!                                ▼
//!                     chunked refresh (row bands)
//!                                │  per band
//!                                ▼
//!   occlusion scan ──► tree walk ──► DrawQueue (layers + tasks)
//!                                         │
//!                                         ▼
//!                          Dispatcher::dispatch ──► DrawUnit
//!                                         │
//!                                         ▼
//!                        flush ──► DisplayBackend::flush ──► FlushReady
//! ```
//!
//! **[`area`]** — Inclusive integer rectangles and the overlap, containment
//! and rounded-corner tests the pipeline is built on.
//!
//! **[`display`]** — Per-display state, the bounded dirty-area list with the
//! region joiner, and the [`DisplayManager`](display::DisplayManager)
//! registry.
//!
//! **[`backend`]** — The [`DisplayBackend`](backend::DisplayBackend) trait
//! display drivers implement.
//!
//! **[`draw`]** — Layers, draw tasks, the dispatch queue and the
//! [`DrawUnit`](draw::DrawUnit) trait.
//!
//! **[`scene`]** — The [`Scene`](scene::Scene) trait the walker reads objects
//! through, and [`ObjectTree`](scene::ObjectTree), a struct-of-arrays
//! implementation with dirty tracking.
//!
//! **[`refresh`]** — The refresh cycle: occlusion scanner, chunked area
//! refresher, object walker/compositor and flush coordinator.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! refresh-cycle instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies and
//!   the condition-variable [`CondvarSignal`](draw::CondvarSignal).
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-cycle
//!   damage-rect and layer lifecycle events.
//!
//! [`Runtime::refresh_display`]: refresh::Runtime::refresh_display
//! [`Runtime::tick`]: refresh::Runtime::tick

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod arena;

pub mod area;
pub mod backend;
pub mod color;
pub mod config;
pub mod display;
pub mod draw;
pub mod error;
pub mod output;
pub mod refresh;
pub mod scene;
pub mod trace;
pub mod transform;
