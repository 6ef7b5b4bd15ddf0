//! Error types for hello-web.
//!
//! Only startup can fail with a typed error: [`RegistrationError`] is raised
//! while probes are being registered and stops the process before it binds its
//! port. Everything else at startup is plain `anyhow` with context.
//!
//! Request handlers have no error path. Probe failures are folded into the
//! readiness verdict (see [`crate::readiness`]) and surface only as a `503`
//! from `/ready`.

/// Startup-time failure while building the probe registry.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// A probe with this name is already registered.
    #[error("duplicate probe `{0}`")]
    DuplicateProbe(String),
}
