// src/core/protocol/codec.rs

//! The control channel's line protocol codec (§4.1, §6): a fixed 6-byte magic
//! (`UBCT<ver> `) followed by zero or more LF-terminated text lines, no length
//! prefix. Bulk-input commands are modeled by simply decoding further `Line`
//! frames — the codec itself has no notion of which commands are bulk; that
//! policy lives in the dispatcher (§4.2).

use crate::core::errors::ControlError;
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Lines longer than this are rejected per §4.1.
pub const MAX_LINE_LEN: usize = 1024;

const MAGIC_LEN: usize = 6;
const MAGIC_PREFIX: &[u8; 4] = b"UBCT";

/// A single decoded unit of the control protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    /// The 6-byte greeting, decoded exactly once per connection.
    Magic { version: u8 },
    /// One LF-terminated text line, with the terminator stripped.
    Line(String),
}

/// Codec state: whether the magic greeting has already been consumed.
#[derive(Default)]
pub struct ControlCodec {
    magic_read: bool,
}

impl ControlCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for ControlCodec {
    type Item = ControlFrame;
    type Error = ControlError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !self.magic_read {
            if src.len() < MAGIC_LEN {
                return Ok(None);
            }
            if &src[0..4] != MAGIC_PREFIX || !src[4].is_ascii_digit() || src[5] != b' ' {
                return Err(ControlError::BadMagic);
            }
            let version = src[4] - b'0';
            src.advance(MAGIC_LEN);
            self.magic_read = true;
            return Ok(Some(ControlFrame::Magic { version }));
        }

        match src.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                if pos > MAX_LINE_LEN {
                    src.advance(pos + 1);
                    return Err(ControlError::LineTooLong);
                }
                let mut line = src.split_to(pos + 1);
                line.truncate(pos); // drop the '\n'
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                let text = String::from_utf8_lossy(&line).into_owned();
                Ok(Some(ControlFrame::Line(text)))
            }
            None => {
                if src.len() > MAX_LINE_LEN {
                    Err(ControlError::LineTooLong)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

/// Replies are plain text the caller has already terminated with `\n` where
/// required (`ok\n`, `error ...\n`, or a fast-reload timing line).
impl Encoder<String> for ControlCodec {
    type Error = ControlError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}

/// The single empty-line-or-0x04 terminator bulk-input readers watch for (§4.2,
/// `local_zones`/`local_datas`/… variants).
pub fn is_bulk_terminator(line: &str) -> bool {
    line.is_empty() || line.as_bytes() == [0x04]
}
