//! HTTP surface: thin handlers over [`crate::readiness`] plus fixed responses.

pub mod health;
pub mod home;
pub mod ready;
pub mod request_id;
