// src/core/printq.rs

//! The streaming printer: decouples the fast-reload background's output production
//! from consumption by whatever task currently owns the client socket, and can
//! outlive the control session that started the reload (§3, §4.7).

use crate::core::errors::ControlError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWrite;
use tokio::sync::Mutex as AsyncMutex;

/// A streaming text spooler. Owns the client stream after a `Session` is absorbed
/// into it (§9's "tagged transfer": `Session.into_printq() → PrintQ`).
pub struct PrintQ {
    stream: AsyncMutex<Pin<Box<dyn AsyncWrite + Send>>>,
    to_print: Mutex<VecDeque<String>>,
    /// Set when this printer has been moved to the daemon's orphan list because its
    /// originating `FastReloadThread` was torn down while lines remained queued.
    in_list: AtomicBool,
}

impl PrintQ {
    pub fn new(stream: Pin<Box<dyn AsyncWrite + Send>>) -> Arc<Self> {
        Arc::new(Self {
            stream: AsyncMutex::new(stream),
            to_print: Mutex::new(VecDeque::new()),
            in_list: AtomicBool::new(false),
        })
    }

    /// Production side: the background pushes a formatted line (`fr_output_printf`
    /// splicing into `to_print`, §4.7).
    pub fn push_line(&self, line: String) {
        self.to_print.lock().push_back(line);
    }

    /// True once the pending queue has fully drained — part of this printer's
    /// destruction condition (empty queue and closed/erroring stream, §3).
    pub fn is_empty(&self) -> bool {
        self.to_print.lock().is_empty()
    }

    /// Consumption side: writes every currently queued line to the client stream.
    /// Returns on the first I/O error, mirroring "on fatal error, remove the printq".
    pub async fn drain(&self) -> Result<(), ControlError> {
        use tokio::io::AsyncWriteExt;
        loop {
            let line = { self.to_print.lock().pop_front() };
            let Some(line) = line else { break };
            let mut stream = self.stream.lock().await;
            stream.write_all(line.as_bytes()).await?;
            stream.flush().await?;
        }
        Ok(())
    }

    /// Marks this printer as moved to the daemon's orphan list (§4.7 "Orphaning").
    pub fn mark_orphaned(&self) {
        self.in_list.store(true, Ordering::SeqCst);
    }

    pub fn is_orphaned(&self) -> bool {
        self.in_list.load(Ordering::SeqCst)
    }
}

/// The daemon-wide list of printers whose originating `FastReloadThread` has been
/// torn down while output remained queued. Walked at shutdown to destroy the rest.
#[derive(Default)]
pub struct OrphanPrintQs {
    inner: Mutex<Vec<Arc<PrintQ>>>,
}

impl OrphanPrintQs {
    pub fn adopt(&self, printq: Arc<PrintQ>) {
        printq.mark_orphaned();
        self.inner.lock().push(printq);
    }

    /// Drains every orphaned printer that still has pending output, removing those
    /// that finish (empty queue and successful write) from the list.
    pub async fn service(&self) {
        let snapshot: Vec<Arc<PrintQ>> = self.inner.lock().clone();
        let mut finished = Vec::new();
        for (idx, printq) in snapshot.iter().enumerate() {
            if printq.drain().await.is_err() || printq.is_empty() {
                finished.push(idx);
            }
        }
        if !finished.is_empty() {
            let mut guard = self.inner.lock();
            for idx in finished.into_iter().rev() {
                if idx < guard.len() {
                    guard.remove(idx);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
