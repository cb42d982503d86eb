// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for sediment refresh
//! diagnostics.
//!
//! This crate provides [`TraceSink`](sediment_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`] — compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`] — writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//!
//! Timestamps are whatever the runtime's clock returns; every consumer takes
//! the number of clock ticks per microsecond to convert them.

pub mod chrome;
pub mod pretty;
pub mod recorder;
