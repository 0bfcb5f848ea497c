//! # ESC/POS Serializer
//!
//! Turns styled receipt lines into the raw command stream understood by
//! 58mm line-protocol thermal printers.
//!
//! ## Commands Used
//!
//! | Command     | Bytes         | Meaning                         |
//! |-------------|---------------|---------------------------------|
//! | `ESC @`     | `1B 40`       | Initialize / reset              |
//! | `ESC a n`   | `1B 61 n`     | Alignment: 0 left, 1 center, 2 right |
//! | `ESC E n`   | `1B 45 n`     | Emphasis off (0) / on (1)       |
//! | `LF`        | `0A`          | Print buffer and feed one line  |
//! | `GS V 66 n` | `1D 56 42 n`  | Feed n dots and partial cut     |
//!
//! Style commands are only emitted when the style changes between lines.
//! Text outside printable ASCII is replaced by `?`: the printer's code page
//! is not known here.

use super::layout::{Align, ReceiptLine};

/// Escape, the command prefix.
pub const ESC: u8 = 0x1B;

/// Group separator, the extended command prefix.
pub const GS: u8 = 0x1D;

/// Line feed.
pub const LF: u8 = 0x0A;

/// `ESC @`
#[inline]
pub fn init() -> [u8; 2] {
    [ESC, b'@']
}

/// `ESC a n`
#[inline]
pub fn align(align: Align) -> [u8; 3] {
    let n = match align {
        Align::Left => 0,
        Align::Center => 1,
        Align::Right => 2,
    };
    [ESC, b'a', n]
}

/// `ESC E n`
#[inline]
pub fn bold(on: bool) -> [u8; 3] {
    [ESC, b'E', u8::from(on)]
}

/// `GS V 66 0`: feed to the cutter and cut.
#[inline]
pub fn cut() -> [u8; 4] {
    [GS, b'V', 66, 0]
}

/// Serializes lines into a complete job: init, lines, optional cut.
pub fn render(lines: &[ReceiptLine], with_cut: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(lines.len() * 36 + 8);
    out.extend_from_slice(&init());

    // Printer state right after ESC @
    let mut current_align = Align::Left;
    let mut current_bold = false;

    for line in lines {
        if line.align != current_align {
            out.extend_from_slice(&align(line.align));
            current_align = line.align;
        }
        if line.bold != current_bold {
            out.extend_from_slice(&bold(line.bold));
            current_bold = line.bold;
        }
        push_text(&mut out, &line.text);
        out.push(LF);
    }

    if with_cut {
        out.extend_from_slice(&cut());
    }
    out
}

/// Appends text as printable ASCII.
pub fn push_text(out: &mut Vec<u8>, text: &str) {
    out.extend(text.chars().map(printable));
}

/// Like [`push_text`] but keeps `\n` as LF.
pub fn push_text_lines(out: &mut Vec<u8>, text: &str) {
    out.extend(text.chars().map(|c| if c == '\n' { LF } else { printable(c) }));
}

fn printable(c: char) -> u8 {
    if c == ' ' || c.is_ascii_graphic() {
        c as u8
    } else {
        b'?'
    }
}
