//! Client-side TLS connector with trust-on-first-use certificate pinning.
//!
//! "TLS certificate provisioning" is explicitly out of scope as a feature
//! (SPEC_FULL.md Non-goals), and no CA/root-store crate is part of this
//! stack, so full PKI-style verification isn't available here. Instead this
//! mirrors the teacher's own precedent for a custom `ServerCertVerifier`
//! (`warpgate-common/src/tls/rustls_helpers.rs`'s `DummyTlsVerifier`/
//! `NoHostnameTlsVerifier`) and pins the leaf certificate's SHA-256
//! fingerprint to the stored [`crate::store::ServerRecord`] on first
//! connect, the same trust model `hush-server gen-cert` self-signed
//! certificates are meant for.

use std::sync::{Arc, Mutex};

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as TlsError, SignatureScheme};
use sha2::{Digest, Sha256};

/// Accepts any certificate chain, but records the leaf's fingerprint and, if
/// an `expected` fingerprint was configured, rejects a mismatch.
#[derive(Debug)]
struct PinningVerifier {
    provider: Arc<CryptoProvider>,
    expected: Option<Vec<u8>>,
    observed: Arc<Mutex<Option<Vec<u8>>>>,
}

impl ServerCertVerifier for PinningVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        let fingerprint = Sha256::digest(end_entity.as_ref()).to_vec();
        *self.observed.lock().unwrap() = Some(fingerprint.clone());
        match &self.expected {
            Some(expected) if expected != &fingerprint => Err(TlsError::General(
                "server certificate fingerprint does not match the pinned one".into(),
            )),
            _ => Ok(ServerCertVerified::assertion()),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

/// Builds a `rustls::ClientConfig` pinned to `expected_fingerprint` (`None`
/// on first connect to a server), returning the config alongside a cell that
/// will hold the leaf certificate's fingerprint once the handshake completes.
pub fn build_client_config(
    expected_fingerprint: Option<Vec<u8>>,
) -> Result<(Arc<ClientConfig>, Arc<Mutex<Option<Vec<u8>>>>), TlsError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let observed = Arc::new(Mutex::new(None));
    let verifier = Arc::new(PinningVerifier {
        provider: provider.clone(),
        expected: expected_fingerprint,
        observed: observed.clone(),
    });
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    Ok((Arc::new(config), observed))
}
