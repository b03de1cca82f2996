//! RSA-OAEP login challenges, PEM key handling, and passphrase-based
//! encryption at rest (SPEC_FULL.md §4.4).

pub mod error;
pub mod keys;
pub mod symmetric;

pub use error::CryptoError;
pub use keys::{
    decrypt, encrypt, generate_keypair, private_key_from_pem, private_key_to_pem,
    public_key_from_pem, public_key_to_pem, KEY_BITS,
};
pub use symmetric::{decrypt_data, encrypt_data};
