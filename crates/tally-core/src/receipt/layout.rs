//! Styled receipt lines and the structured layout document.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// One printed line. Text is already fitted to the receipt width except for
/// item names, which are never wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub text: String,
    pub align: Align,
    pub bold: bool,
}

impl ReceiptLine {
    pub fn left(text: impl Into<String>) -> Self {
        ReceiptLine {
            text: text.into(),
            align: Align::Left,
            bold: false,
        }
    }

    pub fn center(text: impl Into<String>) -> Self {
        ReceiptLine {
            align: Align::Center,
            ..ReceiptLine::left(text)
        }
    }

    pub fn blank() -> Self {
        ReceiptLine::left("")
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// Print-ready document for page-oriented or driver-based printers.
///
/// The page renderer owns fonts and margins; this carries only the content,
/// alignment and emphasis of each line, plus the column budget it was laid
/// out for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub width: usize,
    pub lines: Vec<ReceiptLine>,
    /// Whether the printer should cut after the last line.
    pub cut: bool,
}

impl LayoutDocument {
    /// Renders the document as fixed-width text, one `\n`-terminated row per
    /// line. Centered and right-aligned lines are padded with spaces; bold is
    /// dropped.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            let len = line.text.chars().count();
            let pad = self.width.saturating_sub(len);
            let lead = match line.align {
                Align::Left => 0,
                Align::Center => pad / 2,
                Align::Right => pad,
            };
            out.extend(std::iter::repeat(' ').take(lead));
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_alignment() {
        let doc = LayoutDocument {
            width: 10,
            lines: vec![
                ReceiptLine::center("abcd").bold(),
                ReceiptLine::left("left"),
                ReceiptLine {
                    text: "r".to_string(),
                    align: Align::Right,
                    bold: false,
                },
                ReceiptLine::blank(),
            ],
            cut: true,
        };

        assert_eq!(doc.to_plain_text(), "   abcd\nleft\n         r\n\n");
    }

    #[test]
    fn test_overlong_line_is_not_truncated() {
        let doc = LayoutDocument {
            width: 4,
            lines: vec![ReceiptLine::center("longer than four")],
            cut: false,
        };
        assert_eq!(doc.to_plain_text(), "longer than four\n");
    }
}
