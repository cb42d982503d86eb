// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layers, draw tasks and their dispatch to draw units.
//!
//! Drawing is deferred: objects add [`DrawTask`]s to a [`Layer`] through a
//! [`DrawCtx`], and the [`Dispatcher`] offers layers to the registered
//! [`DrawUnit`]s, which execute tasks (possibly on other threads) and mark
//! them ready.
//!
//! # Ordering
//!
//! Within a layer, a task is only offered once every older task it overlaps
//! is ready (see [`DrawQueue::next_available_task`]). Across layers, a child
//! layer's composite task in the parent stays `Waiting` until the child has
//! drained; then it is queued like any other task and, once ready, frees the
//! child layer and its buffer.

mod ctx;
mod dispatch;
mod layer;
mod pixels;
mod queue;
mod signal;
mod task;

pub use ctx::DrawCtx;
pub use dispatch::{Dispatcher, DrawUnit};
pub use layer::{Layer, LayerId, LayerInfo, size_kb};
pub use pixels::{Pixels, PixelsMut, stride};
pub use queue::{DispatchStats, DrawQueue};
#[cfg(feature = "std")]
pub use signal::CondvarSignal;
pub use signal::{Signal, SpinSignal, default_signal};
pub use task::{BlendMode, DrawTask, FillDsc, LabelDsc, LayerDsc, MaskRectDsc, TaskId, TaskKind, TaskState};
