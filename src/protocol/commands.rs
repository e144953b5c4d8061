//! # ESC/POS Commands
//!
//! This module implements the subset of the ESC/POS command protocol used to
//! lay out a restaurant receipt on a thermal printer.
//!
//! ## Protocol Overview
//!
//! ESC/POS is a byte-stream protocol: printable text is interleaved with
//! escape sequences that mutate the printer's formatting state (alignment,
//! emphasis, character size). That state persists on the device across
//! subsequent text until changed again or reset by `ESC @`, so command and
//! text bytes must reach the printer in exactly the order they were produced.
//!
//! ## Vocabulary
//!
//! | Command | Bytes (hex) | Parameter |
//! |---------|-------------|-----------|
//! | Init | 1B 40 | - |
//! | Align | 1B 61 n | 0 left, 1 center, 2 right |
//! | Bold | 1B 45 n | 1 on, 0 off |
//! | DoubleHeight | 1D 21 10 | - |
//! | DoubleWidth | 1D 21 20 | - |
//! | NormalSize | 1D 21 00 | - |
//! | FullCut | 1D 56 00 | - |
//! | PartialCut | 1D 56 01 | - |
//! | FeedLines(n) | 1B 64 n | line count |
//! | LineSpacing(n) | 1B 33 n | dot units |

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix
///
/// Used for character size and cutter control.
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print the line buffer and advance one line
pub const LF: u8 = 0x0A;

/// Text alignment for subsequent lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # ESC/POS Command
///
/// One instruction of the fixed vocabulary. A command has no identity beyond
/// the bytes it encodes to; two equal commands always produce the same bytes.
///
/// ## Example
///
/// ```
/// use posprint::protocol::commands::{Alignment, Command};
///
/// assert_eq!(Command::Init.bytes(), vec![0x1B, 0x40]);
/// assert_eq!(Command::Align(Alignment::Center).bytes(), vec![0x1B, 0x61, 0x01]);
/// assert_eq!(Command::FeedLines(4).bytes(), vec![0x1B, 0x64, 0x04]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `ESC @` - reset the printer to its power-on formatting state.
    ///
    /// Clears the line buffer and resets emphasis, character size, alignment
    /// and line spacing. Does not touch stored logos or memory switches.
    Init,

    /// `ESC a n` - alignment for subsequent lines.
    Align(Alignment),

    /// `ESC E n` - emphasized (bold) printing.
    Bold(bool),

    /// `GS ! 0x10`
    DoubleHeight,

    /// `GS ! 0x20`
    DoubleWidth,

    /// `GS ! 0x00` - cancels double height and width.
    NormalSize,

    /// `GS V 0`
    FullCut,

    /// `GS V 1` - leaves a small hinge so the receipt stays on the roll.
    PartialCut,

    /// `ESC d n` - print the buffer and feed `n` lines.
    FeedLines(u8),

    /// `ESC 3 n` - line spacing in dot units.
    LineSpacing(u8),
}

impl Command {
    /// Encode this command as its ESC/POS byte sequence.
    pub fn bytes(&self) -> Vec<u8> {
        match *self {
            Command::Init => vec![ESC, b'@'],
            Command::Align(alignment) => vec![ESC, b'a', alignment as u8],
            Command::Bold(on) => vec![ESC, b'E', u8::from(on)],
            Command::DoubleHeight => vec![GS, b'!', 0x10],
            Command::DoubleWidth => vec![GS, b'!', 0x20],
            Command::NormalSize => vec![GS, b'!', 0x00],
            Command::FullCut => vec![GS, b'V', 0x00],
            Command::PartialCut => vec![GS, b'V', 0x01],
            Command::FeedLines(n) => vec![ESC, b'd', n],
            Command::LineSpacing(n) => vec![ESC, b'3', n],
        }
    }

    /// Short mnemonic used in logs and hex dumps.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Init => "INIT",
            Command::Align(Alignment::Left) => "ALIGN_LEFT",
            Command::Align(Alignment::Center) => "ALIGN_CENTER",
            Command::Align(Alignment::Right) => "ALIGN_RIGHT",
            Command::Bold(true) => "BOLD_ON",
            Command::Bold(false) => "BOLD_OFF",
            Command::DoubleHeight => "DOUBLE_HEIGHT",
            Command::DoubleWidth => "DOUBLE_WIDTH",
            Command::NormalSize => "NORMAL_SIZE",
            Command::FullCut => "FULL_CUT",
            Command::PartialCut => "PARTIAL_CUT",
            Command::FeedLines(_) => "FEED_LINES",
            Command::LineSpacing(_) => "LINE_SPACING",
        }
    }
}

// Named constants matching the printer manual's command names.

pub const INIT: Command = Command::Init;
pub const ALIGN_LEFT: Command = Command::Align(Alignment::Left);
pub const ALIGN_CENTER: Command = Command::Align(Alignment::Center);
pub const ALIGN_RIGHT: Command = Command::Align(Alignment::Right);
pub const BOLD_ON: Command = Command::Bold(true);
pub const BOLD_OFF: Command = Command::Bold(false);
pub const DOUBLE_HEIGHT: Command = Command::DoubleHeight;
pub const DOUBLE_WIDTH: Command = Command::DoubleWidth;
pub const NORMAL_SIZE: Command = Command::NormalSize;
pub const FULL_CUT: Command = Command::FullCut;
pub const PARTIAL_CUT: Command = Command::PartialCut;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert_eq!(INIT.bytes(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_alignment() {
        assert_eq!(ALIGN_LEFT.bytes(), vec![0x1B, 0x61, 0x00]);
        assert_eq!(ALIGN_CENTER.bytes(), vec![0x1B, 0x61, 0x01]);
        assert_eq!(ALIGN_RIGHT.bytes(), vec![0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_bold() {
        assert_eq!(BOLD_ON.bytes(), vec![0x1B, 0x45, 0x01]);
        assert_eq!(BOLD_OFF.bytes(), vec![0x1B, 0x45, 0x00]);
    }

    #[test]
    fn test_character_size() {
        assert_eq!(DOUBLE_HEIGHT.bytes(), vec![0x1D, 0x21, 0x10]);
        assert_eq!(DOUBLE_WIDTH.bytes(), vec![0x1D, 0x21, 0x20]);
        assert_eq!(NORMAL_SIZE.bytes(), vec![0x1D, 0x21, 0x00]);
    }

    #[test]
    fn test_cuts() {
        assert_eq!(FULL_CUT.bytes(), vec![0x1D, 0x56, 0x00]);
        assert_eq!(PARTIAL_CUT.bytes(), vec![0x1D, 0x56, 0x01]);
    }

    #[test]
    fn test_feed_lines() {
        assert_eq!(Command::FeedLines(0).bytes(), vec![0x1B, 0x64, 0x00]);
        assert_eq!(Command::FeedLines(4).bytes(), vec![0x1B, 0x64, 0x04]);
        assert_eq!(Command::FeedLines(255).bytes(), vec![0x1B, 0x64, 0xFF]);
    }

    #[test]
    fn test_line_spacing() {
        assert_eq!(Command::LineSpacing(60).bytes(), vec![0x1B, 0x33, 0x3C]);
    }

    #[test]
    fn test_names() {
        assert_eq!(ALIGN_RIGHT.name(), "ALIGN_RIGHT");
        assert_eq!(Command::FeedLines(2).name(), "FEED_LINES");
    }
}
