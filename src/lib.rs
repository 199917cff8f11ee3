//! music-channel - trims submitted music into short voice clips and delivers
//! them to a broadcast channel or back to the requester.
//!
//! This library crate exposes the core functionality for integration testing.

pub mod bot;
pub mod config;
pub mod dispatch;
pub mod intake;
pub mod processor;
pub mod state;
pub mod tracker;
pub mod transform;
pub mod transport;
