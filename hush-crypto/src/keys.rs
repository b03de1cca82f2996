use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::CryptoError;

/// The only key size this protocol accepts (§4.4).
pub const KEY_BITS: usize = 4096;

/// Generates a fresh 4096-bit RSA keypair.
pub fn generate_keypair() -> Result<(RsaPrivateKey, RsaPublicKey), CryptoError> {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS)?;
    let public_key = RsaPublicKey::from(&private_key);
    Ok((private_key, public_key))
}

/// PKIX (SPKI) PEM encoding of a public key, as exchanged during REG/VERIF.
pub fn public_key_to_pem(key: &RsaPublicKey) -> Result<String, CryptoError> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::Pem(e.to_string()))
}

/// Parses a PKIX PEM public key and rejects anything that isn't 4096-bit RSA.
pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    let key = RsaPublicKey::from_public_key_pem(pem).map_err(|e| CryptoError::Pem(e.to_string()))?;
    if key.size() * 8 != KEY_BITS {
        return Err(CryptoError::WrongKeySize);
    }
    Ok(key)
}

/// PKCS#1 PEM encoding of a private key, for local-identity storage only.
pub fn private_key_to_pem(key: &RsaPrivateKey) -> Result<String, CryptoError> {
    key.to_pkcs1_pem(LineEnding::LF)
        .map(|pem| pem.to_string())
        .map_err(|e| CryptoError::Pem(e.to_string()))
}

pub fn private_key_from_pem(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    let key = RsaPrivateKey::from_pkcs1_pem(pem).map_err(|e| CryptoError::Pem(e.to_string()))?;
    if key.size() * 8 != KEY_BITS {
        return Err(CryptoError::WrongKeySize);
    }
    Ok(key)
}

/// Encrypts `plaintext` with RSA-OAEP-SHA256 under `public_key` (login
/// challenge issuance).
pub fn encrypt(public_key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut rng = rand::thread_rng();
    let padding = Oaep::new::<Sha256>();
    Ok(public_key.encrypt(&mut rng, padding, plaintext)?)
}

/// Decrypts an RSA-OAEP-SHA256 ciphertext under `private_key` (login
/// challenge response).
pub fn decrypt(private_key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let padding = Oaep::new::<Sha256>();
    Ok(private_key.decrypt(padding, ciphertext)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_generated_keypair_through_pem() {
        let (private_key, public_key) = generate_keypair().unwrap();
        let pub_pem = public_key_to_pem(&public_key).unwrap();
        let priv_pem = private_key_to_pem(&private_key).unwrap();
        let recovered_pub = public_key_from_pem(&pub_pem).unwrap();
        let recovered_priv = private_key_from_pem(&priv_pem).unwrap();
        assert_eq!(recovered_pub, public_key);
        assert_eq!(recovered_priv, private_key);
    }

    #[test]
    fn oaep_round_trips_a_challenge() {
        let (private_key, public_key) = generate_keypair().unwrap();
        let challenge = b"login-challenge-nonce";
        let ciphertext = encrypt(&public_key, challenge).unwrap();
        let recovered = decrypt(&private_key, &ciphertext).unwrap();
        assert_eq!(recovered, challenge);
    }
}
