//! `hush-server` binary entry point: a thin `clap` front-end over
//! `commands::run`/`commands::gen_cert`, mirroring `warpgate-cli`'s
//! `Cli`/`Commands` split (SPEC_FULL.md §2 "CLI surface").

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the YAML config file (overlaid with `HUSH_`-prefixed env vars).
    #[arg(long, default_value = "hush.yaml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server until shut down.
    Run,
    /// Generate a self-signed TLS certificate for local development.
    GenCert {
        #[arg(long, default_value = "localhost")]
        hostname: String,
        #[arg(long, default_value = "hush-cert.pem")]
        certificate_out: String,
        #[arg(long, default_value = "hush-key.pem")]
        key_out: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run => commands::run::command(&cli.config).await,
        Commands::GenCert {
            hostname,
            certificate_out,
            key_out,
        } => commands::gen_cert::command(&hostname, &certificate_out, &key_out),
    }
}
