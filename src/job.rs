//! # Print Jobs
//!
//! A [`PrintJob`] is the linear frame sequence produced by the receipt
//! encoder. The transport sends each frame as one bulk transfer, in order,
//! so the job's order is the order the printer sees.

use std::fmt::{self, Write as _};

use crate::protocol::commands::Command;
use crate::protocol::text::{self, TextEncoding};

/// One unit of the outbound byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A single ESC/POS instruction.
    Command(Command),
    /// One printed line. The line feed is appended at encode time.
    Text(String),
}

impl Frame {
    /// Bytes written to the endpoint for this frame.
    pub fn encode(&self, encoding: TextEncoding) -> Vec<u8> {
        match self {
            Frame::Command(cmd) => cmd.bytes(),
            Frame::Text(line) => text::line(line, encoding),
        }
    }

    /// The text of a text frame, `None` for commands.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Frame::Text(line) => Some(line),
            Frame::Command(_) => None,
        }
    }
}

impl From<Command> for Frame {
    fn from(cmd: Command) -> Self {
        Frame::Command(cmd)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Command(cmd) => {
                write!(f, "{:<14}", cmd.name())?;
                for byte in cmd.bytes() {
                    write!(f, " {:02X}", byte)?;
                }
                Ok(())
            }
            Frame::Text(line) => write!(f, "TEXT           {:?}", line),
        }
    }
}

/// Ordered frames for a single print call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    frames: Vec<Frame>,
    encoding: TextEncoding,
}

impl PrintJob {
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            frames: Vec::new(),
            encoding,
        }
    }

    /// Append a command frame.
    pub fn command(&mut self, cmd: Command) -> &mut Self {
        self.frames.push(Frame::Command(cmd));
        self
    }

    /// Append a text frame.
    pub fn text(&mut self, line: impl Into<String>) -> &mut Self {
        self.frames.push(Frame::Text(line.into()));
        self
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Encoded bytes of every frame, in order.
    pub fn encoded_frames(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.frames.iter().map(|f| f.encode(self.encoding))
    }

    /// The whole job as one contiguous byte stream.
    ///
    /// This is what the printer receives; used for dry runs and file output.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encoded_frames().flatten().collect()
    }

    /// Text frames only, in order.
    pub fn text_lines(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().filter_map(Frame::as_text)
    }

    /// Human-readable listing, one frame per line.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for (i, frame) in self.frames.iter().enumerate() {
            let _ = writeln!(out, "{:3}  {}", i, frame);
        }
        out
    }
}
