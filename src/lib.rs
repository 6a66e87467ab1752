//! Reelgate - ranged HTTP streaming of files stored in a chat-based store
//!
//! This library crate exposes the core functionality for integration testing.

pub mod catalog;
pub mod config;
pub mod pool;
pub mod restart;
pub mod server;
pub mod store;
pub mod streaming;
