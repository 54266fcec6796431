// src/core/reload/thread.rs

//! The fast-reload background task's 8-phase lifecycle (§4.4): start, read,
//! construct, print memory, reload IPC, finalize, timings, terminate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::construct::FastReloadConstruct;
use super::publish;
use crate::config::Config;
use crate::core::errors::ControlError;
use crate::core::notify::{Notification, NotifyChannel};
use crate::core::printq::PrintQ;
use crate::core::state::ServerState;

/// How often the pump (below) flushes queued output to the client.
const PUMP_INTERVAL: Duration = Duration::from_millis(20);

/// Parsed `fast_reload [+vpd]*` options: `v` increments verbosity, `p` requests
/// no-pause mode, `d` requests dropping the in-flight mesh on resume.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastReloadOptions {
    pub verbose: u8,
    pub no_pause: bool,
    pub drop_mesh: bool,
}

impl FastReloadOptions {
    pub fn parse(token: Option<&str>) -> Result<Self, ControlError> {
        let mut opts = Self::default();
        if let Some(tok) = token {
            for ch in tok.trim_start_matches('+').chars() {
                match ch {
                    'v' => opts.verbose += 1,
                    'p' => opts.no_pause = true,
                    'd' => opts.drop_mesh = true,
                    other => return Err(ControlError::UnknownOption(other.to_string())),
                }
            }
        }
        Ok(opts)
    }
}

/// A handle the primary worker keeps to the single active fast-reload background
/// task: lets `stop` request cooperative teardown, and lets the caller await
/// completion to tear down the printer once the queue has drained.
pub struct FastReloadHandle {
    quit: Arc<AtomicBool>,
    pub printq: Arc<PrintQ>,
    done: Arc<Notify>,
    outcome: Arc<Mutex<Option<Result<(), ControlError>>>>,
}

impl FastReloadHandle {
    /// Requests the background task exit at its next quit-check point (§4.6).
    pub fn request_exit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    pub async fn join(&self) -> Result<(), ControlError> {
        self.done.notified().await;
        self.outcome.lock().clone().unwrap_or(Ok(()))
    }

    /// True once the background task has produced an outcome, without blocking.
    pub fn is_done(&self) -> bool {
        self.outcome.lock().is_some()
    }
}

fn to_secs_usecs(d: Duration) -> (i64, i64) {
    (d.as_secs() as i64, d.subsec_micros() as i64)
}

fn fmt_timing(label: &str, d: Duration) -> String {
    let (secs, usecs) = to_secs_usecs(d);
    format!("{label:<10} {secs:3}.{usecs:06}s\n")
}

/// Spawns the fast-reload background task against `state`, streaming progress
/// lines to `printq`. Opens the `commpair` socketpair the background task uses
/// to coordinate the actual pause/swap/resume with the primary worker's event
/// loop (§4.6) and spawns the main-side coordinator that answers it.
pub fn spawn(
    state: Arc<ServerState>,
    config_path: String,
    opts: FastReloadOptions,
    printq: Arc<PrintQ>,
) -> Result<FastReloadHandle, ControlError> {
    let quit = Arc::new(AtomicBool::new(false));
    let done = Arc::new(Notify::new());
    let outcome = Arc::new(Mutex::new(None));

    let handle = FastReloadHandle {
        quit: quit.clone(),
        printq: printq.clone(),
        done: done.clone(),
        outcome: outcome.clone(),
    };

    let (mut bg_chan, main_chan) = NotifyChannel::pair()?;

    tokio::spawn(run_main_side(state.clone(), main_chan, opts.drop_mesh));

    tokio::spawn(async move {
        let result = run(&state, &config_path, opts, &printq, &quit, &mut bg_chan).await;
        match &result {
            Ok(()) => {
                printq.push_line("ok\n".to_string());
                let _ = bg_chan.send(Notification::Done).await;
            }
            Err(e) => {
                printq.push_line(e.to_wire_line());
                let _ = bg_chan.send(Notification::DoneError).await;
            }
        }
        *outcome.lock() = Some(result);
        done.notify_waiters();
    });

    Ok(handle)
}

/// The main-side half of the `commpair` protocol (§4.6): reacts to the
/// background task's `reload_stop`/`reload_nopause_poll` by running the actual
/// worker pause/resume/barrier round trip against the existing per-worker
/// command tube, acking each over the pair so the background task can proceed.
/// Exits once the background task reports it is done, one way or another.
async fn run_main_side(state: Arc<ServerState>, mut chan: NotifyChannel, drop_mesh: bool) {
    loop {
        let notification = match chan.recv().await {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!("fast-reload commpair closed: {e}");
                return;
            }
        };
        match notification {
            Notification::ReloadStop => {
                state.workers.pause_all().await;
                if chan.send(Notification::ReloadAck).await.is_err() {
                    return;
                }
                match chan.recv().await {
                    Ok(Notification::ReloadStart) => {
                        state.workers.resume_all(drop_mesh).await;
                    }
                    Ok(_) | Err(_) => return,
                }
            }
            Notification::ReloadNopausePoll => {
                state.workers.barrier_all().await;
                if chan.send(Notification::ReloadAck).await.is_err() {
                    return;
                }
            }
            Notification::Done | Notification::DoneError | Notification::Exited => return,
            Notification::None | Notification::Printout | Notification::Exit | Notification::ReloadAck
            | Notification::ReloadStart => {}
        }
    }
}

async fn run(
    state: &Arc<ServerState>,
    config_path: &str,
    opts: FastReloadOptions,
    printq: &Arc<PrintQ>,
    quit: &Arc<AtomicBool>,
    chan: &mut NotifyChannel,
) -> Result<(), ControlError> {
    let total_start = Instant::now();

    // Phase 1: Start
    if opts.verbose >= 1 {
        printq.push_line("thread started\n".to_string());
    }
    if quit.load(Ordering::SeqCst) {
        return Ok(());
    }

    // Phase 2: Read
    let read_start = Instant::now();
    let path = config_path.to_string();
    let new_config = tokio::task::spawn_blocking(move || Config::from_file(&path))
        .await
        .map_err(|e| ControlError::Internal(e.to_string()))??;
    let read_elapsed = read_start.elapsed();
    if opts.verbose >= 1 {
        printq.push_line(format!("done read config file {config_path}\n"));
    }
    if quit.load(Ordering::SeqCst) {
        return Ok(());
    }

    // Phase 3: Construct
    let construct_start = Instant::now();
    let construct = FastReloadConstruct::build(&new_config)?;
    let construct_elapsed = construct_start.elapsed();

    // Phase 4: Print memory
    if opts.verbose >= 2 {
        printq.push_line(format!(
            "estimated memory: {} bytes\n",
            construct.estimate_bytes()
        ));
    }

    // Open Question (b): a per-reload check, not a compile-time one. `+p` is
    // honored only when none of the no-pause-excluded fields actually changed.
    let current_config = state.config.load();
    let effective_no_pause = opts.no_pause && !current_config.excluded_fields_differ(&new_config);
    if opts.no_pause && !effective_no_pause {
        printq.push_line(
            "notice: falling back to paused mode, excluded fields changed\n".to_string(),
        );
    }

    // Phase 5 + 6: Reload IPC and finalize (publication happens under the tree
    // write locks; see core::reload::publish).
    let reload_start = Instant::now();
    let old_trees = if effective_no_pause {
        publish::publish_no_pause(state, construct.resolver, &new_config, chan).await?
    } else {
        publish::publish_paused(state, construct.resolver, &new_config, chan).await?
    };
    let reload_elapsed = reload_start.elapsed();

    let delete_start = Instant::now();
    drop(old_trees);
    let delete_elapsed = delete_start.elapsed();

    // Phase 7: Timings
    if opts.verbose >= 1 {
        printq.push_line(fmt_timing("read disk", read_elapsed));
        printq.push_line(fmt_timing("construct", construct_elapsed));
        printq.push_line(fmt_timing("reload", reload_elapsed));
        printq.push_line(fmt_timing("deletes", delete_elapsed));
        printq.push_line(fmt_timing("total time", total_start.elapsed()));
    }

    Ok(())
}

/// Actively streams `handle.printq`'s queued output to the client until the
/// background task finishes and the queue empties, or a write fails. A write
/// failure is treated as the control session having closed mid-write (§9's
/// Open Question (a)): the printer is handed to the daemon's orphan list so the
/// periodic sweep (`OrphanPrintQs::service`) takes over — and immediately
/// removes it, since the same write will fail there too (§4.7).
pub async fn pump(state: Arc<ServerState>, handle: Arc<FastReloadHandle>) {
    let mut ticker = tokio::time::interval(PUMP_INTERVAL);
    loop {
        ticker.tick().await;
        if let Err(e) = handle.printq.drain().await {
            tracing::debug!("fast-reload printer write failed, orphaning: {e}");
            state.orphan_printqs.adopt(handle.printq.clone());
            return;
        }
        if handle.is_done() && handle.printq.is_empty() {
            return;
        }
    }
}
