//! Streamgate - on-demand RTSP to HLS gateway
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod server;
pub mod streaming;
