use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::CodecError;
use crate::packet::{
    decode_header, Packet, HEADER_BYTES, ID_BYTES, MAX_PAYLOAD, SEPARATOR_BYTES,
};

/// A failed read, carrying the request id when framing got far enough to
/// read one (§7 class 1: "replies ERR with the request id when known").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadError {
    pub kind: CodecError,
    pub id: Option<u16>,
}

impl ReadError {
    fn without_id(kind: CodecError) -> Self {
        Self { kind, id: None }
    }

    fn with_id(kind: CodecError, id: u16) -> Self {
        Self { kind, id: Some(id) }
    }
}

impl From<CodecError> for ReadError {
    fn from(kind: CodecError) -> Self {
        Self::without_id(kind)
    }
}

/// Reads one packet off `stream`, honoring a read-idle deadline (§4.2, §5).
///
/// A timeout becomes `CodecError::Idle`; a clean EOF on the very first byte
/// becomes `CodecError::Disconnected`; any other I/O failure becomes
/// `CodecError::Connection`. Protocol-level failures (bad header, argument
/// accounting mismatch) are returned as their own codec error so the caller
/// can reply ERR and keep the connection open per §7 class 1.
pub async fn read_packet<S>(stream: &mut S, idle_timeout: Duration) -> Result<Packet, ReadError>
where
    S: AsyncRead + Unpin,
{
    let mut header_buf = [0u8; HEADER_BYTES];
    match tokio::time::timeout(idle_timeout, stream.read_exact(&mut header_buf)).await {
        Err(_) => return Err(ReadError::without_id(CodecError::Idle)),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ReadError::without_id(CodecError::Disconnected))
        }
        Ok(Err(_)) => return Err(ReadError::without_id(CodecError::Connection)),
        Ok(Ok(())) => {}
    }

    let raw = decode_header(header_buf)?;

    let mut id_buf = [0u8; ID_BYTES];
    read_exact_mapped(stream, &mut id_buf, idle_timeout).await?;
    let id = u16::from_be_bytes(id_buf);

    let mut sep = [0u8; 2];
    read_exact_mapped(stream, &mut sep, idle_timeout)
        .await
        .map_err(|e| ReadError::with_id(e.kind, id))?;
    if sep != SEPARATOR_BYTES {
        return Err(ReadError::with_id(CodecError::Header, id));
    }

    let mut args = Vec::with_capacity(raw.arg_count as usize);
    let mut total_read = 0usize;
    for _ in 0..raw.arg_count {
        let arg = read_arg(stream, idle_timeout)
            .await
            .map_err(|e| ReadError::with_id(e.kind, id))?;
        total_read += arg.len() + SEPARATOR_BYTES.len();
        if total_read > MAX_PAYLOAD {
            return Err(ReadError::with_id(CodecError::MaxSize, id));
        }
        args.push(arg);
    }

    if total_read != raw.length as usize {
        return Err(ReadError::with_id(CodecError::Arguments, id));
    }

    Packet::new(raw.action, id, raw.info, args)
        .map_err(|_| ReadError::with_id(CodecError::Arguments, id))
}

async fn read_exact_mapped<S>(
    stream: &mut S,
    buf: &mut [u8],
    idle_timeout: Duration,
) -> Result<(), ReadError>
where
    S: AsyncRead + Unpin,
{
    match tokio::time::timeout(idle_timeout, stream.read_exact(buf)).await {
        Err(_) => Err(ReadError::without_id(CodecError::Idle)),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ReadError::without_id(CodecError::Disconnected))
        }
        Ok(Err(_)) => Err(ReadError::without_id(CodecError::Connection)),
        Ok(Ok(())) => Ok(()),
    }
}

/// Reads bytes up to (and consuming) the next CRLF, enforcing the per-argument cap.
async fn read_arg<S>(stream: &mut S, idle_timeout: Duration) -> Result<Vec<u8>, ReadError>
where
    S: AsyncRead + Unpin,
{
    let mut arg = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        read_exact_mapped(stream, &mut byte, idle_timeout).await?;
        if byte[0] == b'\r' {
            let mut lf = [0u8; 1];
            read_exact_mapped(stream, &mut lf, idle_timeout).await?;
            if lf[0] != b'\n' {
                return Err(ReadError::without_id(CodecError::Header));
            }
            return Ok(arg);
        }
        arg.push(byte[0]);
        if arg.len() > MAX_PAYLOAD {
            return Err(ReadError::without_id(CodecError::MaxSize));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;

    #[tokio::test]
    async fn reads_back_an_encoded_packet() {
        let packet = Packet::new(Action::Msg, 7, 0, vec![b"bob".to_vec(), b"ct".to_vec()]).unwrap();
        let mut cursor = std::io::Cursor::new(packet.encode().unwrap());
        let read_back = read_packet(&mut cursor, Duration::from_secs(1)).await.unwrap();
        assert_eq!(read_back, packet);
    }

    #[tokio::test]
    async fn empty_stream_is_disconnected() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let err = read_packet(&mut cursor, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.kind, CodecError::Disconnected);
        assert_eq!(err.id, None);
    }

    #[tokio::test]
    async fn idle_stream_times_out() {
        let (mut _tx, mut rx) = tokio::io::duplex(64);
        let err = read_packet(&mut rx, Duration::from_millis(10)).await.unwrap_err();
        assert_eq!(err.kind, CodecError::Idle);
    }
}
