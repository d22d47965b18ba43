//! Core types and trait definitions for roll tracking.
//!
//! A physical roll is identified by the QR string scanned at intake. Labels
//! are replaced as the roll moves through the shop floor, so every later
//! scan has to be resolved back to that root through the QR link graph
//! before anything can be said about the roll.
//!
//! Nothing here speaks HTTP or SQL; storage and geocoding come in through
//! the traits in [`store`] and [`geocode`].

// Store impls are written as native `async fn`; the trait signatures carry
// the `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod geocode;
pub mod link;
pub mod phase;
pub mod resolve;
pub mod roll;
pub mod store;
pub mod timeline;
pub mod workflow;

pub use error::{Error, Result};
pub use workflow::Tracker;
