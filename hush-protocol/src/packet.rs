use bytes::{BufMut, Bytes, BytesMut};

use crate::action::Action;
use crate::error::CodecError;

/// Current (and only) protocol version.
pub const PROTOCOL_VERSION: u8 = 1;
/// Maximum number of payload arguments per packet.
pub const MAX_ARGS: usize = 3;
/// Maximum total payload bytes, excluding header/separator/per-argument CRLFs.
pub const MAX_PAYLOAD: usize = 1023;
/// Reserved id for server-originated or reply-less packets.
pub const NULL_ID: u16 = 0;

const HEADER_LEN: usize = 4;
const ID_LEN: usize = 2;
const SEPARATOR: &[u8] = b"\r\n";

/// A single framed packet: 4-byte packed header, 2-byte id, CRLF, then
/// `args.len()` CRLF-terminated arguments. See SPEC_FULL.md §3 for the
/// header-layout resolution (id bytes sit outside the 32 packed bits).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub action: Action,
    pub id: u16,
    pub info: u8,
    pub args: Vec<Vec<u8>>,
}

impl Packet {
    pub fn new(action: Action, id: u16, info: u8, args: Vec<Vec<u8>>) -> Result<Self, CodecError> {
        if args.len() > MAX_ARGS {
            return Err(CodecError::Arguments);
        }
        let packet = Self {
            action,
            id,
            info,
            args,
        };
        packet.payload_len()?;
        Ok(packet)
    }

    fn payload_len(&self) -> Result<u16, CodecError> {
        let mut total = 0usize;
        for arg in &self.args {
            total += arg.len() + SEPARATOR.len();
        }
        if total > MAX_PAYLOAD {
            return Err(CodecError::MaxSize);
        }
        Ok(total as u16)
    }

    /// Pack the 4-byte header word (Version:4 | Action:8 | Info:8 | Args:2 | Length:10).
    fn header_word(&self, length: u16) -> u32 {
        (u32::from(PROTOCOL_VERSION) << 28)
            | (u32::from(self.action.code()) << 20)
            | (u32::from(self.info) << 12)
            | ((self.args.len() as u32) << 10)
            | u32::from(length)
    }

    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let length = self.payload_len()?;
        let mut buf = BytesMut::with_capacity(HEADER_LEN + ID_LEN + SEPARATOR.len() + length as usize);
        buf.put_u32(self.header_word(length));
        buf.put_u16(self.id);
        buf.put_slice(SEPARATOR);
        for arg in &self.args {
            buf.put_slice(arg);
            buf.put_slice(SEPARATOR);
        }
        Ok(buf.freeze())
    }
}

/// The decoded contents of the 4 packed header bytes, before the argument
/// payload has been read off the wire.
pub(crate) struct RawHeader {
    pub action: Action,
    pub info: u8,
    pub arg_count: u8,
    pub length: u16,
}

pub(crate) fn decode_header(bytes: [u8; HEADER_LEN]) -> Result<RawHeader, CodecError> {
    let word = u32::from_be_bytes(bytes);
    let version = (word >> 28) as u8 & 0x0F;
    if version != PROTOCOL_VERSION {
        return Err(CodecError::Version);
    }
    let action_raw = (word >> 20) as u8;
    let action = Action::try_from(action_raw)?;
    let info = (word >> 12) as u8;
    let arg_count = ((word >> 10) as u8) & 0b11;
    let length = (word & 0x3FF) as u16;
    if arg_count as usize > MAX_ARGS {
        return Err(CodecError::Header);
    }
    Ok(RawHeader {
        action,
        info,
        arg_count,
        length,
    })
}

pub(crate) const HEADER_BYTES: usize = HEADER_LEN;
pub(crate) const ID_BYTES: usize = ID_LEN;
pub(crate) const SEPARATOR_BYTES: &[u8] = SEPARATOR;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_header_decode() {
        let packet = Packet::new(Action::Msg, 42, 0, vec![b"bob".to_vec(), b"1700000000".to_vec()])
            .unwrap();
        let encoded = packet.encode().unwrap();
        let header_bytes: [u8; HEADER_LEN] = encoded[0..HEADER_LEN].try_into().unwrap();
        let raw = decode_header(header_bytes).unwrap();
        assert_eq!(raw.action, Action::Msg);
        assert_eq!(raw.info, 0);
        assert_eq!(raw.arg_count, 2);
        let id = u16::from_be_bytes(encoded[HEADER_LEN..HEADER_LEN + ID_LEN].try_into().unwrap());
        assert_eq!(id, 42);
    }

    #[test]
    fn rejects_too_many_args() {
        let err = Packet::new(Action::Msg, 1, 0, vec![vec![]; 4]).unwrap_err();
        assert_eq!(err, CodecError::Arguments);
    }

    #[test]
    fn rejects_oversize_payload() {
        let big_arg = vec![0u8; MAX_PAYLOAD];
        let err = Packet::new(Action::Msg, 1, 0, vec![big_arg]).unwrap_err();
        assert_eq!(err, CodecError::MaxSize);
    }

    #[test]
    fn decode_header_rejects_unknown_action() {
        let word: u32 = (u32::from(PROTOCOL_VERSION) << 28) | (0xFFu32 << 20);
        let err = decode_header(word.to_be_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::Invalid(0xFF)));
    }

    #[test]
    fn decode_header_rejects_wrong_version() {
        let word: u32 = (0u32 << 28) | (u32::from(Action::Ok.code()) << 20);
        let err = decode_header(word.to_be_bytes()).unwrap_err();
        assert_eq!(err, CodecError::Version);
    }
}
