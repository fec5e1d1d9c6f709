//! Web framework integrations.
//!
//! Adapters register handlers with the framework and operations with a
//! [`Router`](crate::Router) in one call, so the served routes and the
//! documented ones cannot drift apart.

#[cfg(feature = "axum")]
pub mod axum;
