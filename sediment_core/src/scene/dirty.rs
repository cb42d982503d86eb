// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channels of [`ObjectTree`](super::ObjectTree).
//!
//! - **Local-only**: [`GEOMETRY`] and [`STYLE`] are marked with the default
//!   policy; only the mutated object's extent is invalidated.
//! - **Propagating**: [`VISIBILITY`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) along child-to-parent
//!   dependency edges. Hiding an object or changing its transform moves every
//!   descendant on screen too.
//! - **Structural**: [`TOPOLOGY`] is marked on the parent when children are
//!   added or removed.
//!
//! [`ObjectTree::take_invalidations`](super::ObjectTree::take_invalidations)
//! drains every channel.

use understory_dirty::Channel;

/// Coordinates or extra draw size changed.
pub const GEOMETRY: Channel = Channel::new(0);

/// Paint properties changed.
pub const STYLE: Channel = Channel::new(1);

/// Hidden flag or transform changed, for the object and its subtree.
pub const VISIBILITY: Channel = Channel::new(2);

/// Children were added or removed.
pub const TOPOLOGY: Channel = Channel::new(3);
