//! In-process port opener for channel tests. Enabled by the `test-util`
//! feature outside this crate.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::Notify;

use crate::endpoint::DeviceEndpoint;
use crate::error::DeviceResult;
use crate::port::{PortOpener, SerialPort};

const PIPE_CAPACITY: usize = 4096;

/// Hands out pre-arranged results in order. Each `push_port` returns the far
/// end of the duplex pipe the channel will get.
///
/// Ports handed out are counted while alive, and an `open` made while an
/// earlier port is still alive is remembered (see [`overlapped`]).
///
/// [`overlapped`]: ScriptedOpener::overlapped
#[derive(Default)]
pub struct ScriptedOpener {
    script: Mutex<VecDeque<DeviceResult<DuplexStream>>>,
    opens: AtomicUsize,
    live: Arc<AtomicUsize>,
    overlapped: AtomicBool,
    gate: Option<Arc<Notify>>,
}

impl ScriptedOpener {
    pub fn new() -> Self {
        ScriptedOpener::default()
    }

    /// Every `open` waits for one `notify_one` on the returned handle.
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let opener = ScriptedOpener {
            gate: Some(gate.clone()),
            ..ScriptedOpener::default()
        };
        (opener, gate)
    }

    pub fn push_port(&self) -> DuplexStream {
        let (near, far) = tokio::io::duplex(PIPE_CAPACITY);
        self.script.lock().unwrap_or_else(|e| e.into_inner()).push_back(Ok(near));
        far
    }

    pub fn push_error(&self, err: crate::error::DeviceError) {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).push_back(Err(err));
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Ports opened and not yet dropped.
    pub fn live_ports(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Whether any port was opened while another was still alive.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

/// A duplex half that decrements the live count when dropped.
struct TrackedPort {
    inner: DuplexStream,
    live: Arc<AtomicUsize>,
}

impl Drop for TrackedPort {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AsyncRead for TrackedPort {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TrackedPort {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[async_trait]
impl PortOpener for ScriptedOpener {
    async fn open(&self, endpoint: &DeviceEndpoint, _baud: u32) -> DeviceResult<Box<dyn SerialPort>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.script.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match next {
            Some(Ok(port)) => {
                if self.live.fetch_add(1, Ordering::SeqCst) > 0 {
                    self.overlapped.store(true, Ordering::SeqCst);
                }
                Ok(Box::new(TrackedPort {
                    inner: port,
                    live: self.live.clone(),
                }))
            }
            Some(Err(e)) => Err(e),
            None => Err(crate::error::DeviceError::open_failed(endpoint.path.as_str(), "no such device")),
        }
    }
}
