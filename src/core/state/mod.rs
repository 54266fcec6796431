// src/core/state/mod.rs

//! Defines the central `ServerState` and the resolver data-plane stand-ins it
//! fronts.

pub mod resolver;
mod server_state;

pub use server_state::{ServerInit, ServerState};
