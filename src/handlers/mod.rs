//! Axum request handlers for the public and internal API surfaces.

pub mod deployments;
pub mod health;
pub mod internal;
pub mod stream;
