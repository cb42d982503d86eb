// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display identification.
//!
//! [`DisplayId`] is a lightweight handle issued by the
//! [`DisplayManager`](crate::display::DisplayManager). Ids are never reused
//! while the manager lives, so a handle to a removed display simply stops
//! resolving.

use core::fmt;

/// Identifies a registered display.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DisplayId(pub u32);

impl fmt::Debug for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayId({})", self.0)
    }
}
