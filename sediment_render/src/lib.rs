// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw units for `sediment_core`.
//!
//! A draw unit executes the tasks the refresh walker queues on layers.
//! This crate provides:
//!
//! - [`ImmediateUnit`] — a software rasterizer that executes tasks on the
//!   refresh thread: rectangle fills with rounded corners and opacity,
//!   rounded-rectangle alpha masks, and layer composites with opacity,
//!   blend modes and nearest-neighbour rotation/zoom. Labels are accepted
//!   and skipped; glyph rendering is left to richer units.
//! - [`deferred::DeferredUnit`] (requires `std`) — claims a bounded number of
//!   tasks and ships them to an executor on another thread, collecting
//!   completions through a channel.
//!
//! The per-pixel routines are public in [`raster`] so custom units can reuse
//! them.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` in dependencies and the
//!   [`deferred`] module.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
pub mod deferred;
mod immediate;
pub mod raster;

pub use immediate::{ImmediateUnit, UnitStats};
