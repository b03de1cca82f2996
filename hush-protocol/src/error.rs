use crate::error_code::ErrorCode;

/// Failures raised while encoding or decoding a packet on the wire.
///
/// Every variant maps onto one of the §6 error Info byte values; `as_error_code`
/// is the single place that mapping lives.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown action code {0:#04x}")]
    Invalid(u8),
    #[error("unsupported protocol version")]
    Version,
    #[error("malformed header")]
    Header,
    #[error("wrong argument count or length accounting mismatch")]
    Arguments,
    #[error("payload exceeds the 1023-byte cap")]
    MaxSize,
    #[error("connection was idle past the read deadline")]
    Idle,
    #[error("peer closed the connection")]
    Disconnected,
    #[error("transport I/O error")]
    Connection,
}

impl CodecError {
    pub fn as_error_code(self) -> ErrorCode {
        match self {
            CodecError::Invalid(_) => ErrorCode::Invalid,
            CodecError::Version => ErrorCode::Version,
            CodecError::Header => ErrorCode::Header,
            CodecError::Arguments => ErrorCode::Arguments,
            CodecError::MaxSize => ErrorCode::MaxSize,
            CodecError::Idle => ErrorCode::Idle,
            CodecError::Disconnected => ErrorCode::Disconnected,
            CodecError::Connection => ErrorCode::Connection,
        }
    }

    /// §7 class 4: fatal/transport errors close the connection.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            CodecError::Idle | CodecError::Disconnected | CodecError::Connection
        )
    }
}
