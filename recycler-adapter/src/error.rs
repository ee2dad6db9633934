use thiserror::Error;

/// Failures surfaced by [`crate::Engine::bind_host`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    /// The host has no scroll container; viewport math is impossible without
    /// one.
    #[error("no scroll container available")]
    MissingScrollContainer,

    /// The engine is already bound; call `dispose` first.
    #[error("engine is already bound to a host")]
    AlreadyBound,
}
