// src/core/reload/mod.rs

//! The fast-reload pipeline: background rebuild, hot-swap publication, and the
//! scratch construct it publishes from (§4.4, §4.5).

pub mod construct;
pub mod publish;
pub mod thread;

pub use thread::{FastReloadHandle, FastReloadOptions, pump};
