use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng as AesOsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use scrypt::Params;

use crate::error::CryptoError;

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// log2(N)=15, r=8, p=1: scrypt's interactive-login parameter set.
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

fn derive_key(passphrase: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
        .map_err(|e| CryptoError::Kdf(e.to_string()))?;
    let mut key = [0u8; KEY_LEN];
    scrypt::scrypt(passphrase, salt, &params, &mut key)
        .map_err(|e| CryptoError::Kdf(e.to_string()))?;
    Ok(key)
}

/// Encrypts `plaintext` under a passphrase-derived key, for at-rest storage
/// of a client's own private key or cached message bodies.
///
/// Wire format: `nonce (12) || ciphertext+tag || salt (32)`, so the salt used
/// for key derivation travels with the blob and decryption needs nothing but
/// the passphrase.
pub fn encrypt_data(passphrase: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut salt);
    let key = derive_key(passphrase, &salt)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let nonce = Aes256Gcm::generate_nonce(&mut AesOsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::Aead)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len() + SALT_LEN);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&salt);
    Ok(out)
}

/// Reverses [`encrypt_data`].
pub fn decrypt_data(passphrase: &[u8], blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < NONCE_LEN + SALT_LEN {
        return Err(CryptoError::Truncated);
    }
    let (rest, salt) = blob.split_at(blob.len() - SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(passphrase, salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::Aead)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_under_the_right_passphrase() {
        let blob = encrypt_data(b"correct horse", b"super secret payload").unwrap();
        let recovered = decrypt_data(b"correct horse", &blob).unwrap();
        assert_eq!(recovered, b"super secret payload");
    }

    #[test]
    fn rejects_the_wrong_passphrase() {
        let blob = encrypt_data(b"correct horse", b"super secret payload").unwrap();
        assert!(decrypt_data(b"wrong horse", &blob).is_err());
    }

    #[test]
    fn rejects_a_truncated_blob() {
        assert!(matches!(
            decrypt_data(b"anything", b"too-short"),
            Err(CryptoError::Truncated)
        ));
    }
}
