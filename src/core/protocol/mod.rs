// src/core/protocol/mod.rs

pub mod codec;

pub use codec::{ControlCodec, ControlFrame, is_bulk_terminator};
