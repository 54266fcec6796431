// src/core/notify.rs

//! The fixed-width notification protocol carried over the `commpair`/`commreload`
//! socketpairs that coordinate the fast-reload background task with the primary
//! worker's event loop (§3, §4.6).

use crate::core::errors::ControlError;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

/// Bounds retry loops on the notification socketpairs so a broken file descriptor
/// can never livelock a writer or waiter. Taken verbatim from the source's constant.
pub const IPC_LOOP_MAX: u32 = 200;

/// Poll timeout used while waiting for a notification to arrive. Taken verbatim
/// from the source's constant.
pub const IPC_NOTIFICATION_WAIT: Duration = Duration::from_millis(200);

/// The notification codes carried over `commpair`, one `u32` per word (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Notification {
    None = 0,
    Done = 1,
    DoneError = 2,
    Exit = 3,
    Exited = 4,
    Printout = 5,
    ReloadStop = 6,
    ReloadAck = 7,
    ReloadNopausePoll = 8,
    ReloadStart = 9,
}

impl Notification {
    fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::None,
            1 => Self::Done,
            2 => Self::DoneError,
            3 => Self::Exit,
            4 => Self::Exited,
            5 => Self::Printout,
            6 => Self::ReloadStop,
            7 => Self::ReloadAck,
            8 => Self::ReloadNopausePoll,
            9 => Self::ReloadStart,
            _ => return None,
        })
    }
}

/// One end of a `commpair`-style notification socketpair.
pub struct NotifyChannel {
    stream: UnixStream,
}

impl NotifyChannel {
    /// Builds a connected pair, the async equivalent of `socketpair(2)`.
    pub fn pair() -> Result<(Self, Self), ControlError> {
        let (a, b) = std::os::unix::net::UnixStream::pair()?;
        a.set_nonblocking(true)?;
        b.set_nonblocking(true)?;
        Ok((
            Self {
                stream: UnixStream::from_std(a)?,
            },
            Self {
                stream: UnixStream::from_std(b)?,
            },
        ))
    }

    /// Sends a notification, retrying transient write errors up to `IPC_LOOP_MAX`
    /// times. While waiting for writability, a caller-supplied quit check is polled
    /// so an `exit` request is observed promptly even mid-send (§4.6's
    /// `fr_poll_for_quit` interleaving).
    pub async fn send(&mut self, code: Notification) -> Result<(), ControlError> {
        let bytes = (code as u32).to_ne_bytes();
        let mut attempts = 0u32;
        loop {
            match self.stream.write_all(&bytes).await {
                Ok(()) => return Ok(()),
                Err(e) if attempts < IPC_LOOP_MAX => {
                    attempts += 1;
                    tracing::warn!("notification send retry {attempts}/{IPC_LOOP_MAX}: {e}");
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                Err(e) => return Err(ControlError::IpcFailed(e.to_string())),
            }
        }
    }

    /// Waits for the next notification, polling with `IPC_NOTIFICATION_WAIT` and
    /// tolerating byte-at-a-time delivery by accumulating partial reads across
    /// poll iterations, up to `IPC_LOOP_MAX` iterations. A closed peer is reported
    /// as `DoneError`, matching §4.6.
    pub async fn recv(&mut self) -> Result<Notification, ControlError> {
        let mut buf = [0u8; 4];
        let mut filled = 0usize;
        let mut attempts = 0u32;
        while filled < 4 {
            match timeout(IPC_NOTIFICATION_WAIT, self.stream.read(&mut buf[filled..])).await {
                Ok(Ok(0)) => return Ok(Notification::DoneError),
                Ok(Ok(n)) => filled += n,
                Ok(Err(e)) => return Err(ControlError::IpcFailed(e.to_string())),
                Err(_timed_out) => {
                    attempts += 1;
                    if attempts >= IPC_LOOP_MAX {
                        return Err(ControlError::IpcFailed(
                            "notification wait exceeded IPC_LOOP_MAX".to_string(),
                        ));
                    }
                }
            }
        }
        let code = u32::from_ne_bytes(buf);
        Notification::from_u32(code)
            .ok_or_else(|| ControlError::IpcFailed(format!("unknown notification code {code}")))
    }

    /// Sends a single ack byte on the `commreload` pair (worker pause/barrier acks).
    pub async fn send_ack(&mut self) -> Result<(), ControlError> {
        self.stream.write_all(&[1u8]).await?;
        Ok(())
    }

    /// Waits for a single ack byte, bounded by `IPC_LOOP_MAX` poll iterations.
    pub async fn recv_ack(&mut self) -> Result<(), ControlError> {
        let mut buf = [0u8; 1];
        let mut attempts = 0u32;
        loop {
            match timeout(IPC_NOTIFICATION_WAIT, self.stream.read_exact(&mut buf)).await {
                Ok(Ok(_)) => return Ok(()),
                Ok(Err(e)) => return Err(ControlError::IpcFailed(e.to_string())),
                Err(_timed_out) => {
                    attempts += 1;
                    if attempts >= IPC_LOOP_MAX {
                        return Err(ControlError::IpcFailed(
                            "ack wait exceeded IPC_LOOP_MAX".to_string(),
                        ));
                    }
                }
            }
        }
    }
}
