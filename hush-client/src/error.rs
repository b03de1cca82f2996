use hush_protocol::{Action, ErrorCode};

/// Errors surfaced by the command runtime, mirroring how `HushError` maps
/// onto the wire on the server side (SPEC_FULL.md §7 "Client runtime
/// converts ERR.info to a typed error").
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] hush_protocol::CodecError),
    #[error("crypto error: {0}")]
    Crypto(#[from] hush_crypto::CryptoError),
    #[error("local storage error: {0}")]
    Store(#[from] crate::store::StoreError),
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
    #[error("server replied with an error: {0:?}")]
    Server(ErrorCode),
    #[error("server replied with an unexpected action {0:?}")]
    UnexpectedReply(Action),
    #[error("no stored identity for {0:?}; run `keygen` first")]
    NoIdentity(String),
    #[error("wrong passphrase for the stored identity")]
    WrongPassphrase,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("login challenge verification failed")]
    Handshake,
    #[error("the server's certificate fingerprint changed since it was first trusted")]
    FingerprintMismatch,
    #[error("connection closed while awaiting a reply")]
    ConnectionClosed,
}
