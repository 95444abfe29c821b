//! Hot-swappable export endpoints for the collector.
//!
//! Each signal class is served by a [`endpoint::SwitchableEndpoint`] whose
//! backend can be replaced while the server keeps accepting requests. Calls
//! that are running against the old backend finish undisturbed, calls that
//! arrive during the swap are told to retry.

pub mod config;
pub mod dispatcher;
pub mod drainable;
pub mod endpoint;
pub mod errors;
pub mod exporter;
pub mod gate;
pub mod handler;
pub mod metrics_defs;
mod receiver;
pub mod service;
pub mod shared_component;
pub mod standin;

#[cfg(test)]
mod testutils;

pub use receiver::{Receiver, ReceiverAddrs};
