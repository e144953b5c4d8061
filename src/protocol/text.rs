//! # Text Frame Encoding
//!
//! A text frame is one printed line: the characters followed by a single
//! `LF`, which tells the printer to print the line buffer using whatever
//! alignment, emphasis and size the preceding commands selected.

use serde::Deserialize;

use super::commands::LF;
use super::cp437;

/// Byte encoding used for text frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// UTF-8, sent as-is. Printers configured for a UTF-8 code page render it
    /// directly; on others only the ASCII subset is reliable.
    #[default]
    Utf8,
    /// Single-byte Code Page 437, the power-on default of most printers.
    Cp437,
}

impl TextEncoding {
    /// Encode `text` without a line terminator.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Cp437 => cp437::encode(text),
        }
    }
}

/// Encode `text` plus the trailing line feed.
///
/// ```
/// use posprint::protocol::text::{line, TextEncoding};
///
/// assert_eq!(line("Table: 4", TextEncoding::Utf8), b"Table: 4\n");
/// ```
pub fn line(text: &str, encoding: TextEncoding) -> Vec<u8> {
    let mut bytes = encoding.encode(text);
    bytes.push(LF);
    bytes
}
