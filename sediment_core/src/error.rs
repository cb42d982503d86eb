// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration errors reported by the refresh entry points.
//!
//! Only misconfiguration is an error. Empty clip intersections, transparent
//! objects and layers deferred by the memory budget are ordinary outcomes and
//! never surface here.

use crate::output::DisplayId;

/// A refresh could not run because the runtime or a display is misconfigured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// No display is registered (or no default display is set).
    #[error("no display registered")]
    NoDisplay,
    /// The display handle does not refer to a registered display.
    #[error("unknown display {0:?}")]
    UnknownDisplay(DisplayId),
    /// The display has no draw buffer, or a zero-sized one.
    #[error("display {0:?} has no draw buffer")]
    NoDrawBuffer(DisplayId),
    /// The driver's rounding hook rejects every band height that fits the
    /// draw buffer.
    #[error("display {0:?}: no band height survives the rounding hook (draw buffer too small?)")]
    RowRounding(DisplayId),
    /// No draw unit is registered, so tasks could never complete.
    #[error("no draw unit registered")]
    NoDrawUnit,
}
