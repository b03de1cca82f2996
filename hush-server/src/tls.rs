//! TLS listener configuration and the RFC 5705 channel-binding export used to
//! scope reusable login tokens to one TLS connection (SPEC_FULL.md §3
//! "Reusable token", §6 "Transport").

use std::io::BufReader;

use anyhow::{Context, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

/// Bytes of exported keying material used as the channel-binding value.
const CHANNEL_BINDING_LEN: usize = 32;
const CHANNEL_BINDING_LABEL: &[u8] = b"EXPORTER-hush-reusable-token";

pub fn build_acceptor(certificate_pem_path: &str, key_pem_path: &str) -> Result<TlsAcceptor> {
    let certs = load_certs(certificate_pem_path)?;
    let key = load_key(key_pem_path)?;
    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("building TLS server config")?;
    Ok(TlsAcceptor::from(std::sync::Arc::new(config)))
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let file = std::fs::File::open(path).with_context(|| format!("opening certificate file {path}"))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parsing certificates from {path}"))
}

fn load_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let file = std::fs::File::open(path).with_context(|| format!("opening key file {path}"))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .with_context(|| format!("parsing private key from {path}"))?
        .ok_or_else(|| anyhow::anyhow!("no private key found in {path}"))
}

/// Exports RFC 5705 keying material unique to this TLS connection. A
/// reusable token is bound to this value (alongside username and source
/// address) so presenting it over a different TLS connection never matches.
pub fn export_channel_binding(stream: &TlsStream<TcpStream>) -> Result<Vec<u8>> {
    let (_, connection) = stream.get_ref();
    let mut output = [0u8; CHANNEL_BINDING_LEN];
    connection
        .export_keying_material(&mut output, CHANNEL_BINDING_LABEL, None)
        .context("exporting TLS channel-binding material")?;
    Ok(output.to_vec())
}
