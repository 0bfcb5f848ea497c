//! Splits the scanner byte stream into barcodes.
//!
//! Frames end at CR LF. Each frame is trimmed; empty frames are dropped, as
//! are frames over [`MAX_FRAME_LEN`] bytes (line noise or a scanner left in
//! the wrong mode). Bytes after the last delimiter stay buffered.

/// Longest barcode frame kept, delimiter excluded.
pub const MAX_FRAME_LEN: usize = 256;

const DELIMITER: &[u8] = b"\r\n";

#[derive(Debug, Default)]
pub struct BarcodeFramer {
    buf: Vec<u8>,
    /// Set while skipping the rest of an overlong frame.
    discarding: bool,
}

impl BarcodeFramer {
    pub fn new() -> Self {
        BarcodeFramer::default()
    }

    /// Feeds bytes and returns every barcode completed by them, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut frames = Vec::new();

        while let Some(pos) = find(&self.buf, DELIMITER) {
            let frame: Vec<u8> = self.buf.drain(..pos + DELIMITER.len()).take(pos).collect();

            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if frame.len() > MAX_FRAME_LEN {
                tracing::warn!(len = frame.len(), "Dropping overlong scanner frame");
                continue;
            }

            let text = String::from_utf8_lossy(&frame);
            let code = text.trim();
            if !code.is_empty() {
                frames.push(code.to_string());
            }
        }

        // No delimiter in sight and already too long: drop what we have but
        // keep a trailing CR, it may be half of the next delimiter.
        if self.buf.len() > MAX_FRAME_LEN + 1 {
            tracing::warn!(len = self.buf.len(), "Scanner frame overflow, discarding");
            let keep_cr = self.buf.last() == Some(&b'\r');
            self.buf.clear();
            if keep_cr {
                self.buf.push(b'\r');
            }
            self.discarding = true;
        }

        frames
    }

    /// Bytes waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
