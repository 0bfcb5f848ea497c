//! # Serial Ports
//!
//! The seam between the channels and the operating system.
//!
//! ```text
//! ScannerChannel / PrinterChannel
//!        │  opener.open(&endpoint, baud)
//!        ▼
//! PortOpener ──► TtyOpener      open(2) O_NONBLOCK + termios raw + baud
//!            └─► (tests)        tokio::io::duplex halves
//!        │
//!        ▼
//! Box<dyn SerialPort>           AsyncRead + AsyncWrite
//! ```
//!
//! ## TTY Configuration
//! The line is put in raw mode so barcode bytes and printer commands pass
//! through untouched:
//! - No input processing (no CR/LF translation, no XON/XOFF)
//! - No output processing (OPOST off)
//! - 8 data bits, no parity, receiver enabled, modem lines ignored
//! - Non-canonical, no echo, reads return as soon as one byte is there
//!
//! The descriptor is non-blocking and driven by the tokio reactor through
//! [`AsyncFd`](tokio::io::unix::AsyncFd). Dropping a [`TtyPort`] closes the
//! descriptor at once, even while a read is pending.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
#[cfg(unix)]
use {
    std::io::{self, Read, Write},
    std::pin::Pin,
    std::task::{ready, Context, Poll},
    tokio::io::unix::AsyncFd,
    tokio::io::ReadBuf,
};
use tracing::{debug, info};

use crate::endpoint::DeviceEndpoint;
use crate::error::{DeviceError, DeviceResult};

/// A bidirectional byte stream to one device.
pub trait SerialPort: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialPort for T {}

/// Opens serial lines.
#[async_trait]
pub trait PortOpener: Send + Sync {
    async fn open(&self, endpoint: &DeviceEndpoint, baud: u32) -> DeviceResult<Box<dyn SerialPort>>;
}

/// Opens real tty device nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TtyOpener;

#[async_trait]
impl PortOpener for TtyOpener {
    async fn open(&self, endpoint: &DeviceEndpoint, baud: u32) -> DeviceResult<Box<dyn SerialPort>> {
        let path = endpoint.path.clone();
        debug!(path = %path, baud, "Opening serial line");

        let file = tokio::task::spawn_blocking(move || open_raw(&path, baud))
            .await
            .map_err(|e| DeviceError::open_failed(endpoint.path.as_str(), e))??;

        let port = into_port(file).map_err(|e| DeviceError::open_failed(endpoint.path.as_str(), e))?;

        info!(path = %endpoint.path, baud, "Serial line open");
        Ok(Box::new(port))
    }
}

// =============================================================================
// TTY Port
// =============================================================================

/// A raw, non-blocking tty registered with the reactor.
#[cfg(unix)]
pub struct TtyPort {
    fd: AsyncFd<std::fs::File>,
}

#[cfg(unix)]
impl TtyPort {
    fn new(file: std::fs::File) -> io::Result<Self> {
        Ok(TtyPort {
            fd: AsyncFd::new(file)?,
        })
    }
}

#[cfg(unix)]
impl AsyncRead for TtyPort {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.fd.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| inner.get_ref().read(unfilled)) {
                Ok(Ok(len)) => {
                    buf.advance(len);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(e)) => return Poll::Ready(Err(e)),
                Err(_would_block) => continue,
            }
        }
    }
}

#[cfg(unix)]
impl AsyncWrite for TtyPort {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = ready!(self.fd.poll_write_ready(cx))?;
            match guard.try_io(|inner| inner.get_ref().write(buf)) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    /// Written bytes are already with the kernel's tty driver.
    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(unix)]
fn open_raw(path: &str, baud: u32) -> DeviceResult<std::fs::File> {
    use std::fs::OpenOptions;
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::io::AsRawFd;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(path)
        .map_err(|e| DeviceError::open_failed(path, e))?;

    configure_tty_raw(file.as_raw_fd(), baud).map_err(|reason| DeviceError::open_failed(path, reason))?;
    Ok(file)
}

#[cfg(unix)]
fn into_port(file: std::fs::File) -> std::io::Result<Box<dyn SerialPort>> {
    Ok(Box::new(TtyPort::new(file)?))
}

#[cfg(not(unix))]
fn into_port(file: std::fs::File) -> std::io::Result<Box<dyn SerialPort>> {
    Ok(Box::new(tokio::fs::File::from_std(file)))
}

#[cfg(not(unix))]
fn open_raw(path: &str, _baud: u32) -> DeviceResult<std::fs::File> {
    Err(DeviceError::open_failed(path, "serial lines are only supported on unix"))
}

#[cfg(unix)]
fn speed_for(baud: u32) -> Option<libc::speed_t> {
    Some(match baud {
        1_200 => libc::B1200,
        2_400 => libc::B2400,
        4_800 => libc::B4800,
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        _ => return None,
    })
}

#[cfg(unix)]
fn configure_tty_raw(fd: i32, baud: u32) -> Result<(), String> {
    use std::io;
    use std::mem::MaybeUninit;

    let speed = speed_for(baud).ok_or_else(|| format!("unsupported baud rate {}", baud))?;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(format!("tcgetattr failed: {}", io::Error::last_os_error()));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB);
    termios.c_cflag |= libc::CS8 | libc::CREAD | libc::CLOCAL;

    termios.c_cc[libc::VMIN] = 1;
    termios.c_cc[libc::VTIME] = 0;

    let result = unsafe {
        libc::cfsetispeed(&mut termios, speed) | libc::cfsetospeed(&mut termios, speed)
    };
    if result != 0 {
        return Err(format!("cfsetspeed failed: {}", io::Error::last_os_error()));
    }

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(format!("tcsetattr failed: {}", io::Error::last_os_error()));
    }

    Ok(())
}
