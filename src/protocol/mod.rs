//! # ESC/POS Protocol Implementation
//!
//! Low-level byte builders for ESC/POS thermal receipt printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: The command vocabulary (init, alignment, emphasis, size, feed, cut)
//! - [`text`]: Text line encoding
//! - [`cp437`]: Unicode to Code Page 437 mapping
//!
//! ## Usage Example
//!
//! ```
//! use posprint::protocol::{commands, text};
//!
//! let mut data = Vec::new();
//! data.extend(commands::INIT.bytes());
//! data.extend(commands::ALIGN_CENTER.bytes());
//! data.extend(commands::BOLD_ON.bytes());
//! data.extend(text::line("RECEIPT", text::TextEncoding::Utf8));
//! data.extend(commands::BOLD_OFF.bytes());
//! data.extend(commands::PARTIAL_CUT.bytes());
//!
//! assert_eq!(&data[..2], &[0x1B, 0x40]);
//! ```

pub mod commands;
pub mod cp437;
pub mod text;
