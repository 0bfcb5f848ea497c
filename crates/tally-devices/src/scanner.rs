//! # Scanner Channel
//!
//! Owns the barcode scanner's serial session and turns its byte stream into
//! barcode events.
//!
//! ## Data Flow
//! ```text
//! ┌──────────────┐  bytes   ┌───────────────┐  String  ┌──────────────────┐
//! │ serial line  │ ───────► │ reader task   │ ───────► │ mpsc::Receiver   │
//! │ (SerialPort) │          │ BarcodeFramer │   FIFO   │ (terminal: scan) │
//! └──────────────┘          └───────────────┘          └──────────────────┘
//! ```
//!
//! ## Session Ownership
//! `connect` and `disconnect` serialize on one lock. `connect` always tears
//! down the previous reader, and waits until its port is dropped, before
//! opening the new line, so two sessions never coexist. Every session gets a generation number; a reader task
//! only reports a fault while its generation is still current, so a stale
//! task cannot overwrite the state of its replacement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::endpoint::{DeviceEndpoint, SessionState};
use crate::error::{DeviceError, DeviceResult};
use crate::framer::BarcodeFramer;
use crate::port::{PortOpener, SerialPort};

/// Barcode events buffered before the reader waits on the consumer.
const EVENT_BUFFER: usize = 64;

const READ_CHUNK: usize = 256;

struct Session {
    endpoint: DeviceEndpoint,
    reader: JoinHandle<()>,
}

pub struct ScannerChannel {
    opener: Arc<dyn PortOpener>,
    state: Arc<RwLock<SessionState>>,
    generation: Arc<AtomicU64>,
    session: Mutex<Option<Session>>,
    events: mpsc::Sender<String>,
}

impl ScannerChannel {
    /// Creates a closed channel and the receiver its barcodes arrive on.
    pub fn new(opener: Arc<dyn PortOpener>) -> (Self, mpsc::Receiver<String>) {
        let (events, rx) = mpsc::channel(EVENT_BUFFER);
        let channel = ScannerChannel {
            opener,
            state: Arc::new(RwLock::new(SessionState::Closed)),
            generation: Arc::new(AtomicU64::new(0)),
            session: Mutex::new(None),
            events,
        };
        (channel, rx)
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Endpoint of the current session, if any.
    pub async fn endpoint(&self) -> Option<DeviceEndpoint> {
        self.session.lock().await.as_ref().map(|s| s.endpoint.clone())
    }

    /// Closes any current session, then opens `endpoint`.
    ///
    /// On failure the channel is left `Faulted` with the reason and the
    /// error is returned. There is no retry.
    pub async fn connect(&self, endpoint: &DeviceEndpoint, baud: u32) -> DeviceResult<()> {
        let mut session = self.session.lock().await;
        teardown(&mut session).await;

        let generation = {
            let mut state = self.state.write().await;
            *state = SessionState::Opening;
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        info!(endpoint = %endpoint, baud, "Connecting scanner");

        let port = match self.opener.open(endpoint, baud).await {
            Ok(port) => port,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Scanner open failed");
                *self.state.write().await = SessionState::Faulted(e.to_string());
                return Err(e);
            }
        };

        *self.state.write().await = SessionState::Open;

        let reader = tokio::spawn(read_loop(
            port,
            self.events.clone(),
            self.state.clone(),
            self.generation.clone(),
            generation,
        ));
        *session = Some(Session {
            endpoint: endpoint.clone(),
            reader,
        });

        info!(endpoint = %endpoint, "Scanner open");
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
            info!("Scanner disconnected");
        }
    }
}

impl Drop for ScannerChannel {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.reader.abort();
        }
    }
}

/// Aborts the reader and waits for it to finish, so the old port is
/// dropped (and the line closed) before anything else is opened.
async fn teardown(session: &mut Option<Session>) {
    if let Some(old) = session.take() {
        debug!(endpoint = %old.endpoint, "Closing previous scanner session");
        old.reader.abort();
        let _ = old.reader.await;
    }
}

async fn read_loop(
    mut port: Box<dyn SerialPort>,
    events: mpsc::Sender<String>,
    state: Arc<RwLock<SessionState>>,
    current: Arc<AtomicU64>,
    generation: u64,
) {
    let mut framer = BarcodeFramer::new();
    let mut buf = [0u8; READ_CHUNK];

    let reason = loop {
        let n = match port.read(&mut buf).await {
            Ok(0) => break DeviceError::ReadFailed("device closed the line".to_string()),
            Ok(n) => n,
            Err(e) => break DeviceError::ReadFailed(e.to_string()),
        };

        for code in framer.push(&buf[..n]) {
            debug!(barcode = %code, "Scanned");
            if events.send(code).await.is_err() {
                // Nobody listens any more; the channel owner is gone.
                return;
            }
        }
    };

    let mut state = state.write().await;
    if current.load(Ordering::SeqCst) == generation {
        error!(error = %reason, "Scanner session faulted");
        *state = SessionState::Faulted(reason.to_string());
    }
}
