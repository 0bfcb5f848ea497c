//! # Printer Channel
//!
//! Owns the receipt printer's serial session. Print jobs are written one at
//! a time, whole, in submission order.
//!
//! ## Job Flow
//! ```text
//! submit(doc) ──► mpsc::Sender<PrintJob> ──► worker task ──► write_all + flush
//!     ▲                                          │
//!     └──────────── oneshot reply ◄──────────────┘
//! ```
//!
//! The worker is the only writer on the line, so bytes from two jobs never
//! interleave. A write error faults the session, fails the job that hit it
//! and every job still queued behind it, and ends the worker. Nothing is
//! retried; the next `connect` starts a fresh worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tally_core::receipt::OutputDocument;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::endpoint::{DeviceEndpoint, SessionState};
use crate::error::{DeviceError, DeviceResult};
use crate::port::{PortOpener, SerialPort};

/// Jobs that may wait behind the one being written.
const JOB_QUEUE: usize = 16;

struct PrintJob {
    bytes: Vec<u8>,
    reply: oneshot::Sender<DeviceResult<()>>,
}

struct Session {
    endpoint: DeviceEndpoint,
    jobs: mpsc::Sender<PrintJob>,
    worker: JoinHandle<()>,
}

pub struct PrinterChannel {
    opener: Arc<dyn PortOpener>,
    state: Arc<RwLock<SessionState>>,
    generation: Arc<AtomicU64>,
    session: Mutex<Option<Session>>,
}

impl PrinterChannel {
    pub fn new(opener: Arc<dyn PortOpener>) -> Self {
        PrinterChannel {
            opener,
            state: Arc::new(RwLock::new(SessionState::Closed)),
            generation: Arc::new(AtomicU64::new(0)),
            session: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn endpoint(&self) -> Option<DeviceEndpoint> {
        self.session.lock().await.as_ref().map(|s| s.endpoint.clone())
    }

    /// Closes any current session, then opens `endpoint`.
    ///
    /// Jobs queued on the old session fail with `WriteFailed`.
    pub async fn connect(&self, endpoint: &DeviceEndpoint, baud: u32) -> DeviceResult<()> {
        let mut session = self.session.lock().await;
        teardown(&mut session).await;

        let generation = {
            let mut state = self.state.write().await;
            *state = SessionState::Opening;
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        info!(endpoint = %endpoint, baud, "Connecting printer");

        let port = match self.opener.open(endpoint, baud).await {
            Ok(port) => port,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Printer open failed");
                *self.state.write().await = SessionState::Faulted(e.to_string());
                return Err(e);
            }
        };

        *self.state.write().await = SessionState::Open;

        let (jobs, rx) = mpsc::channel(JOB_QUEUE);
        let worker = tokio::spawn(write_loop(
            port,
            rx,
            self.state.clone(),
            self.generation.clone(),
            generation,
        ));
        *session = Some(Session {
            endpoint: endpoint.clone(),
            jobs,
            worker,
        });

        info!(endpoint = %endpoint, "Printer open");
        Ok(())
    }

    /// Closes the session. Idempotent.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        let had_session = session.is_some();
        teardown(&mut session).await;

        let mut state = self.state.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = SessionState::Closed;

        if had_session {
            info!("Printer disconnected");
        }
    }

    /// Writes one document and waits until it is flushed to the line.
    ///
    /// Returns `NotConnected` without touching the line when the session is
    /// not `Open`.
    pub async fn submit(&self, document: &OutputDocument) -> DeviceResult<()> {
        let jobs = {
            let session = self.session.lock().await;
            if !self.state.read().await.is_open() {
                return Err(DeviceError::NotConnected);
            }
            match session.as_ref() {
                Some(s) => s.jobs.clone(),
                None => return Err(DeviceError::NotConnected),
            }
        };

        let (reply, done) = oneshot::channel();
        let job = PrintJob {
            bytes: document.to_bytes(),
            reply,
        };
        debug!(bytes = job.bytes.len(), "Queueing print job");

        jobs.send(job)
            .await
            .map_err(|_| DeviceError::WriteFailed("printer session closed".to_string()))?;

        done.await
            .unwrap_or_else(|_| Err(DeviceError::WriteFailed("printer session closed".to_string())))
    }
}

impl Drop for PrinterChannel {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.worker.abort();
        }
    }
}

/// Aborting the worker drops the port and the receiver, so pending replies
/// resolve as closed. Waits for the worker so the old port is closed before
/// the caller opens another.
async fn teardown(session: &mut Option<Session>) {
    if let Some(old) = session.take() {
        debug!(endpoint = %old.endpoint, "Closing previous printer session");
        old.worker.abort();
        let _ = old.worker.await;
    }
}

async fn write_loop(
    mut port: Box<dyn SerialPort>,
    mut jobs: mpsc::Receiver<PrintJob>,
    state: Arc<RwLock<SessionState>>,
    current: Arc<AtomicU64>,
    generation: u64,
) {
    while let Some(job) = jobs.recv().await {
        let written = match port.write_all(&job.bytes).await {
            Ok(()) => port.flush().await,
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => {
                debug!(bytes = job.bytes.len(), "Print job written");
                let _ = job.reply.send(Ok(()));
            }
            Err(e) => {
                let err = DeviceError::WriteFailed(e.to_string());
                {
                    let mut state = state.write().await;
                    if current.load(Ordering::SeqCst) == generation {
                        error!(error = %err, "Printer session faulted");
                        *state = SessionState::Faulted(err.to_string());
                    }
                }
                let _ = job.reply.send(Err(err.clone()));

                jobs.close();
                while let Some(queued) = jobs.recv().await {
                    let _ = queued.reply.send(Err(err.clone()));
                }
                return;
            }
        }
    }
}
