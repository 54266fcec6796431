// src/connection/handler.rs

//! Defines the `ConnectionHandler`, which manages the full lifecycle of one
//! control connection: magic check, command loop, bulk-input bodies, and the
//! fast-reload hand-off into a `PrintQ` (§4.1).

use super::guard::ConnectionGuard;
use super::session::Session;
use crate::core::dispatch::{self, DispatchOutcome};
use crate::core::errors::ControlError;
use crate::core::protocol::{ControlCodec, ControlFrame, is_bulk_terminator};
use crate::core::state::ServerState;
use crate::server::AnyStream;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::codec::Framed;
use tracing::{debug, info};

/// Read timeout for a connection once accepted, covering both the magic greeting
/// and every subsequent command line (§5 "Cancellation and timeouts").
const REMOTE_CONTROL_TCP_TIMEOUT: Duration = Duration::from_secs(120);

/// Manages the full lifecycle of a control connection.
pub struct ConnectionHandler {
    framed: Option<Framed<AnyStream, ControlCodec>>,
    addr: SocketAddr,
    state: Arc<ServerState>,
    session_id: u64,
    global_shutdown_rx: tokio::sync::broadcast::Receiver<()>,
}

impl ConnectionHandler {
    pub fn new(
        socket: AnyStream,
        addr: SocketAddr,
        state: Arc<ServerState>,
        session_id: u64,
        global_shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    ) -> Self {
        Self {
            framed: Some(Framed::new(socket, ControlCodec::new())),
            addr,
            state,
            session_id,
            global_shutdown_rx,
        }
    }

    /// The connection's main loop: magic, then a serialized command loop (§4.1,
    /// §5 "within one control session, commands are serialized").
    ///
    /// `guard` must already be linked onto the busy list by the caller (§4.1: a
    /// session counts against `max_active` from the moment it's accepted, not
    /// from the moment its TLS handshake finishes).
    pub async fn run(&mut self, guard: &mut ConnectionGuard) -> Result<(), ControlError> {
        if !self.read_magic().await? {
            return Ok(());
        }

        loop {
            tokio::select! {
                biased;
                _ = self.global_shutdown_rx.recv() => {
                    debug!("control connection {} observed daemon shutdown", self.addr);
                    break;
                }
                line = self.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if self.handle_line(&line, guard, self.session_id).await? {
                                // Handed off to a PrintQ; the framed stream is gone.
                                return Ok(());
                            }
                        }
                        Ok(None) => break,
                        Err(e) if e.is_silent() => break,
                        Err(e) => {
                            self.send_line(&e.to_wire_line()).await?;
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Reads the six-byte `UBCT<ver> ` greeting. Returns `Ok(false)` (and the
    /// caller should silently close) on mismatch, timeout, or EOF — port-scanner
    /// resistance per §4.1.
    async fn read_magic(&mut self) -> Result<bool, ControlError> {
        let framed = self.framed.as_mut().expect("framed present before handoff");
        match tokio::time::timeout(REMOTE_CONTROL_TCP_TIMEOUT, framed.next()).await {
            Ok(Some(Ok(ControlFrame::Magic { version: _ }))) => Ok(true),
            _ => Ok(false),
        }
    }

    /// Reads the next command line, applying the connection timeout. `Ok(None)`
    /// means EOF or timeout (treated as a normal teardown, not an error).
    async fn next_line(&mut self) -> Result<Option<String>, ControlError> {
        let framed = self.framed.as_mut().expect("framed present before handoff");
        match tokio::time::timeout(REMOTE_CONTROL_TCP_TIMEOUT, framed.next()).await {
            Ok(Some(Ok(ControlFrame::Line(line)))) => Ok(Some(line)),
            Ok(Some(Ok(ControlFrame::Magic { .. }))) => Ok(None),
            Ok(Some(Err(e))) => Err(e),
            Ok(None) | Err(_) => Ok(None),
        }
    }

    /// Dispatches one command line. Returns `Ok(true)` if the session was handed
    /// off to a `PrintQ` and the caller should stop driving `self.framed`.
    async fn handle_line(
        &mut self,
        line: &str,
        guard: &mut ConnectionGuard,
        session_id: u64,
    ) -> Result<bool, ControlError> {
        match dispatch::dispatch(&self.state, line).await {
            Ok(DispatchOutcome::Reply(text)) => {
                if let Some(variant) = bulk_variant(line) {
                    self.read_bulk_body(&variant).await?;
                    self.send_line("ok\n").await?;
                } else {
                    self.send_line(&text).await?;
                }
                Ok(false)
            }
            Ok(DispatchOutcome::Stop) => {
                self.send_line("ok\n").await?;
                info!("control connection {} issued stop", self.addr);
                if let Some(handle) = self.state.fast_reload.lock().clone() {
                    handle.request_exit();
                }
                let _ = self.state.shutdown_tx.send(());
                Ok(false)
            }
            Ok(DispatchOutcome::FastReload { opt_token }) => {
                let framed = self.framed.take().expect("framed present before handoff");
                let stream: std::pin::Pin<Box<dyn tokio::io::AsyncWrite + Send>> =
                    Box::pin(framed.into_inner());
                let session = Session::new(session_id, self.addr);
                let printq = session.into_printq(stream);
                guard.set_handed_off();
                let handle = crate::core::dispatch::handlers::lifecycle::fast_reload(
                    &self.state,
                    opt_token.as_deref(),
                    printq,
                )?;
                tokio::spawn(crate::core::reload::pump(self.state.clone(), handle));
                Ok(true)
            }
            Err(e) => {
                if e.is_silent() {
                    return Err(e);
                }
                self.send_line(&e.to_wire_line()).await?;
                Ok(false)
            }
        }
    }

    /// Reads a bulk-input command's body until an empty line or a single `0x04`
    /// byte (§4.2, §6).
    async fn read_bulk_body(&mut self, variant: &str) -> Result<(), ControlError> {
        loop {
            let Some(line) = self.next_line().await? else {
                break;
            };
            if is_bulk_terminator(&line) {
                break;
            }
            let result = if variant == "load_cache" {
                dispatch::dispatch_load_cache_line(&self.state, &line)
            } else {
                dispatch::dispatch_bulk_line(&self.state, variant, &line).await
            };
            if let Err(e) = result {
                self.send_line(&e.to_wire_line()).await?;
            }
        }
        Ok(())
    }

    async fn send_line(&mut self, text: &str) -> Result<(), ControlError> {
        if text.is_empty() {
            return Ok(());
        }
        if let Some(framed) = self.framed.as_mut() {
            framed.send(text.to_string()).await?;
        }
        Ok(())
    }
}

/// The bulk-input variant name for `line`'s command token, if it is one of the
/// bulk-input commands (§4.2).
fn bulk_variant(line: &str) -> Option<String> {
    let cmd_token = line.trim().split_whitespace().next()?;
    let spec = crate::core::dispatch::table::lookup(cmd_token).ok()?;
    spec.flags
        .contains(crate::core::dispatch::table::DispatchFlags::BULK_INPUT)
        .then(|| spec.name.to_string())
}

/// Helper to check for non-critical disconnection errors, kept for parity with
/// the connection-loop's warning-vs-debug log split.
pub fn is_normal_disconnect(e: &ControlError) -> bool {
    matches!(e, ControlError::Io(arc_err) if matches!(
        arc_err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    ))
}

