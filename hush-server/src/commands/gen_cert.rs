//! `hush-server gen-cert`: a self-signed certificate for local development,
//! mirroring `warpgate/src/commands/setup.rs`'s use of `rcgen`.

use anyhow::{Context, Result};
use rcgen::generate_simple_self_signed;
use tracing::info;

pub fn command(hostname: &str, certificate_out: &str, key_out: &str) -> Result<()> {
    let cert = generate_simple_self_signed(vec![hostname.to_owned()])
        .context("generating self-signed certificate")?;

    std::fs::write(certificate_out, cert.cert.pem())
        .with_context(|| format!("writing certificate to {certificate_out}"))?;
    std::fs::write(key_out, cert.key_pair.serialize_pem())
        .with_context(|| format!("writing private key to {key_out}"))?;

    info!(certificate_out, key_out, "wrote self-signed development certificate");
    Ok(())
}
