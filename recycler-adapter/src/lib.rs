//! Host-boundary adapter for the `recycler` crate.
//!
//! The `recycler` crate is UI-agnostic and owns the layout math and state.
//! This crate provides the boundary a real host wires up:
//!
//! - [`ListAdapter`] / [`ViewHost`]: the collaborator contracts (item data
//!   and views on one side, the scroll container and scaffold on the other)
//! - [`Engine`]: the event-driven lifecycle with coalesced recompute, the
//!   mount/unmount reconciler, the measurement feedback loop, and anchor
//!   scroll-stability correction
//!
//! It is intentionally framework-agnostic: no DOM or toolkit bindings, only
//! traits a binding layer implements.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod engine;
mod error;
mod traits;


pub use engine::Engine;
pub use error::BindError;
pub use traits::{ListAdapter, ViewHost};
