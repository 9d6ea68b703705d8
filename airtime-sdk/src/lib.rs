//! Shared types for the AirtimePlus backend API.
//!
//! The `objects` module mirrors the JSON the backend speaks. The typed HTTP
//! client lives behind the `client` feature.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
