//! Protocol module: message type, line codec, framing and command builders.

pub mod codec;
pub mod commands;
pub mod framing;
pub mod message;

pub use codec::{parse, parse_bytes, serialize, trim_line_end, ParseError};
pub use framing::LineAssembler;
pub use message::StructuredMessage;
