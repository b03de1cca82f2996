//! Packet-building helpers shared by every handler (SPEC_FULL.md §4.6).

use chrono::{DateTime, TimeZone, Utc};
use hush_core::HushError;
use hush_protocol::{Action, CodecError, ErrorCode, Packet, NULL_ID};

pub fn ok(id: u16) -> Packet {
    Packet::new(Action::Ok, id, 0, vec![]).expect("OK carries no payload, never exceeds limits")
}

pub fn err(id: u16, code: ErrorCode) -> Packet {
    Packet::new(Action::Err, id, code.code(), vec![]).expect("ERR carries no payload, never exceeds limits")
}

pub fn err_null(code: ErrorCode) -> Packet {
    err(NULL_ID, code)
}

pub fn from_error(id: u16, error: &HushError) -> Packet {
    err(id, error.as_error_code())
}

fn bad_args() -> HushError {
    HushError::from(CodecError::Arguments)
}

/// Reads a UTF-8 argument, rejecting invalid encoding as `Arguments` (§6:
/// "UTF-8 is conventional for usernames", so a non-UTF-8 username is simply
/// a malformed argument).
pub fn utf8_arg(bytes: Vec<u8>) -> Result<String, HushError> {
    String::from_utf8(bytes).map_err(|_| bad_args())
}

/// Encodes a UNIX timestamp as an 8-byte signed big-endian argument (§6).
pub fn encode_timestamp(at: DateTime<Utc>) -> Vec<u8> {
    at.timestamp().to_be_bytes().to_vec()
}

/// Decodes an 8-byte signed big-endian UNIX timestamp argument (§6).
pub fn decode_timestamp(bytes: &[u8]) -> Result<DateTime<Utc>, HushError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| bad_args())?;
    let secs = i64::from_be_bytes(raw);
    Utc.timestamp_opt(secs, 0).single().ok_or_else(bad_args)
}

pub fn exactly<const N: usize>(mut args: Vec<Vec<u8>>) -> Result<[Vec<u8>; N], HushError> {
    if args.len() != N {
        return Err(bad_args());
    }
    let mut out: [Vec<u8>; N] = std::array::from_fn(|_| Vec::new());
    for slot in out.iter_mut().rev() {
        *slot = args.pop().expect("length checked above");
    }
    Ok(out)
}
