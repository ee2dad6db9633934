//! A headless list-recycling engine for virtualized dropdown and select
//! widgets.
//!
//! This crate focuses on the core algorithms needed to render large option
//! lists at interactive frame rates: prefix sums over item heights, fast
//! offset → index lookup, overscanned mount windows, adaptive height
//! estimation, and anchor-based scroll stability.
//!
//! It is UI-agnostic. A host layer is expected to provide:
//! - viewport geometry (height, sticky-header inset) and scroll offsets
//! - measured item heights (optionally, when dynamic heights are enabled)
//!
//! For the mount/unmount reconciler and the event-driven engine lifecycle,
//! see the `recycler-adapter` crate.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod anchor;
mod fenwick;
mod heights;
mod options;
mod recycler;
mod types;

#[cfg(test)]
mod tests;

pub use anchor::{ScrollAnchor, anchor_correction, capture_anchor};
pub use options::{OnChangeCallback, RecyclerOptions};
pub use recycler::Recycler;
pub use types::{Align, Viewport, Window};
