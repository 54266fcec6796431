// src/server/connection_loop.rs

//! Contains the main server loop for accepting connections and handling graceful shutdown.

use super::context::ServerContext;
use super::stream::AnyStream;
use crate::connection::{ConnectionGuard, ConnectionHandler, is_normal_disconnect};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpStream, UnixStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

// Platform-specific signal handling imports
#[cfg(windows)]
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Waits for a shutdown signal based on the operating system.
async fn await_shutdown_signal() {
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to create SIGINT stream");
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to create SIGTERM stream");

    #[cfg(windows)]
    let mut ctrl_c = signal::ctrl_c().expect("failed to create Ctrl+C stream");

    tokio::select! {
        _ = async { #[cfg(unix)] { sigint.recv().await; info!("SIGINT received, initiating graceful shutdown."); } } => {},
        _ = async { #[cfg(unix)] { sigterm.recv().await; info!("SIGTERM received, initiating graceful shutdown."); } } => {},
        _ = async { #[cfg(windows)] { ctrl_c.await; info!("Ctrl-C received, initiating graceful shutdown."); } } => {},
    }
}

/// One raw accepted connection, before TLS/handler setup.
enum RawAccept {
    Tcp(TcpStream, SocketAddr),
    Unix(UnixStream),
}

/// The main server loop: accepts connections across every configured endpoint
/// and handles graceful shutdown (§4.1, §5).
pub async fn run(mut ctx: ServerContext) {
    let mut session_id_counter: u64 = 0;
    let mut client_tasks = JoinSet::new();
    let mut accept_tasks = JoinSet::new();
    let (accept_tx, mut accept_rx) = mpsc::channel::<RawAccept>(64);

    for listener in ctx.listeners.drain(..) {
        let tx = accept_tx.clone();
        accept_tasks.spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, addr)) => {
                        if tx.send(RawAccept::Tcp(socket, addr)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("tcp accept error: {e}");
                        break;
                    }
                }
            }
        });
    }
    for listener in ctx.unix_listeners.drain(..) {
        let tx = accept_tx.clone();
        accept_tasks.spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _addr)) => {
                        if tx.send(RawAccept::Unix(socket)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("unix accept error: {e}");
                        break;
                    }
                }
            }
        });
    }
    drop(accept_tx);

    let mut global_shutdown_rx = ctx.state.shutdown_tx.subscribe();

    loop {
        tokio::select! {
            biased; // Prioritize shutdown signals over other events.

            _ = await_shutdown_signal() => {
                let _ = ctx.state.shutdown_tx.send(());
                break;
            },

            _ = global_shutdown_rx.recv() => {
                info!("control server observed shutdown signal.");
                break;
            },

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => info!("a background task has completed."),
                    Ok(Err(e)) => {
                        error!("CRITICAL: background task failed: {e}. Shutting down.");
                        let _ = ctx.state.shutdown_tx.send(());
                        break;
                    }
                    Err(e) => {
                        error!("CRITICAL: background task panicked: {e:?}. Shutting down.");
                        let _ = ctx.state.shutdown_tx.send(());
                        break;
                    }
                }
            },

            Some(raw) = accept_rx.recv() => {
                if ctx.state.at_capacity() {
                    warn!("too many connections, rejecting new connection");
                    continue;
                }

                session_id_counter = session_id_counter.wrapping_add(1);
                let session_id = session_id_counter;
                let state_clone = ctx.state.clone();
                let conn_shutdown_rx = ctx.state.shutdown_tx.subscribe();

                // The session is linked onto the busy list here, at accept time,
                // not after the TLS handshake below — §4.1 requires `active` to
                // count every accepted-but-unauthenticated socket so a handshake
                // burst can't exceed `max_active` unnoticed.
                let addr_for_guard = match &raw {
                    RawAccept::Tcp(_, addr) => *addr,
                    RawAccept::Unix(_) => ([0, 0, 0, 0], 0).into(),
                };
                let mut guard = ConnectionGuard::new(state_clone.clone(), session_id, addr_for_guard);

                match raw {
                    RawAccept::Tcp(socket, addr) => {
                        info!("accepted control connection from {addr}");
                        if let Some(acceptor) = ctx.acceptor.clone() {
                            client_tasks.spawn(async move {
                                match acceptor.accept(socket).await {
                                    Ok(tls_stream) => {
                                        let any_stream = AnyStream::Tls(Box::new(tls_stream));
                                        let mut handler = ConnectionHandler::new(
                                            any_stream, addr, state_clone, session_id, conn_shutdown_rx,
                                        );
                                        if let Err(e) = handler.run(&mut guard).await
                                            && !is_normal_disconnect(&e)
                                        {
                                            warn!("connection from {addr} terminated: {e}");
                                        }
                                    }
                                    Err(e) => warn!("TLS handshake error for {addr}: {e}"),
                                }
                            });
                        } else {
                            client_tasks.spawn(async move {
                                let any_stream = AnyStream::Tcp(socket);
                                let mut handler = ConnectionHandler::new(
                                    any_stream, addr, state_clone, session_id, conn_shutdown_rx,
                                );
                                if let Err(e) = handler.run(&mut guard).await
                                    && !is_normal_disconnect(&e)
                                {
                                    warn!("connection from {addr} terminated: {e}");
                                }
                            });
                        }
                    }
                    RawAccept::Unix(socket) => {
                        // Local-socket peers are unauthenticated (filesystem permissions are
                        // the authority, §4.1) and carry no meaningful network address.
                        let addr: SocketAddr = ([0, 0, 0, 0], 0).into();
                        client_tasks.spawn(async move {
                            let any_stream = AnyStream::Unix(socket);
                            let mut handler = ConnectionHandler::new(
                                any_stream, addr, state_clone, session_id, conn_shutdown_rx,
                            );
                            if let Err(e) = handler.run(&mut guard).await
                                && !is_normal_disconnect(&e)
                            {
                                warn!("unix control connection terminated: {e}");
                            }
                        });
                    }
                }
            },

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("a connection handler panicked: {e:?}");
                }
            },
        }
    }

    // --- Graceful Shutdown Sequence ---
    info!("shutting down. stopping acceptors and draining connections.");
    let _ = ctx.state.shutdown_tx.send(());
    accept_tasks.shutdown().await;
    client_tasks.shutdown().await;
    info!("all control connections closed.");

    ctx.state.orphan_printqs.service().await;
    if !ctx.state.orphan_printqs.is_empty() {
        warn!(
            "{} orphaned printer(s) still had pending output at shutdown",
            ctx.state.orphan_printqs.len()
        );
    }

    info!("waiting for background tasks to finish...");
    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("timed out waiting for background tasks to finish cleanly.");
    }
    info!("control server shutdown complete.");
}
