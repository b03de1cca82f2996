/// Failures raised by key handling or encryption/decryption.
#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("malformed PEM: {0}")]
    Pem(String),
    #[error("key is not a 4096-bit RSA key")]
    WrongKeySize,
    #[error("RSA operation failed: {0}")]
    Rsa(#[from] rsa::Error),
    #[error("ciphertext is shorter than the nonce/salt framing requires")]
    Truncated,
    #[error("AEAD authentication failed, ciphertext or passphrase is wrong")]
    Aead,
    #[error("scrypt key derivation failed: {0}")]
    Kdf(String),
}
