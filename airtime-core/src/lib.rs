#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod chain;
pub mod config;
pub mod events;
pub mod form;
pub mod nft;
pub mod price;
pub mod sequencer;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;
