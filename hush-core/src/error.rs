use hush_protocol::ErrorCode;

/// Crate-wide error type, mirroring how the wire-level `ErrorCode` and an
/// internal cause relate: every variant knows which Info byte it surfaces as.
#[derive(thiserror::Error, Debug)]
pub enum HushError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("codec error: {0}")]
    Codec(#[from] hush_protocol::CodecError),
    #[error("crypto error: {0}")]
    Crypto(#[from] hush_crypto::CryptoError),
    #[error("principal {0} not found")]
    PrincipalNotFound(String),
    #[error("principal {0} already exists")]
    PrincipalExists(String),
    #[error("no active session for this connection")]
    NoSession,
    #[error("a session for {0} is already active on another connection")]
    DuplicateSession(String),
    #[error("this connection already has an active session")]
    AlreadySession,
    #[error("login handshake failed")]
    Handshake,
    #[error("insufficient privileges for this operation")]
    Privileges,
    #[error("no matching results")]
    Empty,
    #[error("unknown hook id")]
    UnknownHook,
    #[error("unknown config path {0:?}")]
    UnknownConfigPath(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HushError {
    /// The single place that maps an internal failure onto the wire's
    /// `ErrorCode`, mirroring the teacher's `error!(%error, ...)` / typed-
    /// error propagation idiom (SPEC_FULL.md §7).
    pub fn as_error_code(&self) -> ErrorCode {
        match self {
            HushError::Database(_) => ErrorCode::Server,
            HushError::Codec(e) => e.as_error_code(),
            HushError::Crypto(_) => ErrorCode::Handshake,
            HushError::PrincipalNotFound(_) => ErrorCode::NotFound,
            HushError::PrincipalExists(_) => ErrorCode::Exists,
            HushError::NoSession => ErrorCode::NoSession,
            HushError::DuplicateSession(_) => ErrorCode::Login,
            HushError::AlreadySession => ErrorCode::Invalid,
            HushError::Handshake => ErrorCode::Handshake,
            HushError::Privileges => ErrorCode::Privileges,
            HushError::Empty => ErrorCode::Empty,
            HushError::UnknownHook => ErrorCode::Arguments,
            HushError::UnknownConfigPath(_) => ErrorCode::Arguments,
            HushError::Other(_) => ErrorCode::Undefined,
        }
    }
}
