//! Wire codec, framed reader, and reply-correlation waitlist for the hush
//! chat protocol (SPEC_FULL.md §3, §4.1-§4.3, §6).

pub mod action;
pub mod command;
pub mod error;
pub mod error_code;
pub mod hook;
pub mod packet;
pub mod reader;
pub mod waitlist;

pub use action::Action;
pub use command::Command;
pub use error::CodecError;
pub use error_code::ErrorCode;
pub use hook::HookId;
pub use packet::{Packet, MAX_ARGS, MAX_PAYLOAD, NULL_ID, PROTOCOL_VERSION};
pub use reader::{read_packet, ReadError};
pub use waitlist::Waitlist;
