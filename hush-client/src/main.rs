//! `hush-client` binary entry point: a thin `clap` front-end over the
//! `hush_client` library, one subcommand per command, mirroring
//! `warpgate-cli`/`warpgate`'s `Cli`/`Commands` split (SPEC_FULL.md §2
//! "Client command runtime"; the interactive TUI/shell this wraps is an
//! external, out-of-scope collaborator per spec §1).

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// `host:port` of the hush server.
    #[arg(long, default_value = "127.0.0.1:7700")]
    address: String,
    /// Connect over the TLS listener instead of the plain one.
    #[arg(long)]
    tls: bool,
    /// Local name for this server, used to key stored identities/tokens.
    #[arg(long, default_value = "default")]
    server_name: String,
    /// Path to the local `rusqlite` store (SPEC_FULL.md §6).
    #[arg(long, default_value = "hush-client.sqlite3")]
    store: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new RSA-4096 identity and store it locally.
    Keygen {
        username: String,
        #[arg(long)]
        passphrase: String,
    },
    /// Register a previously generated identity with the server.
    Register {
        username: String,
        #[arg(long)]
        passphrase: String,
    },
    /// Run the LOGIN/VERIF handshake and disconnect.
    Login {
        username: String,
        #[arg(long)]
        passphrase: String,
    },
    /// Send an end-to-end-encrypted message to another user.
    Send {
        username: String,
        #[arg(long)]
        passphrase: String,
        dest: String,
        message: String,
    },
    /// List known usernames.
    Users {
        username: String,
        #[arg(long)]
        passphrase: String,
        /// Only users with an active session.
        #[arg(long)]
        online: bool,
        /// Append each entry's permission tier.
        #[arg(long)]
        with_permission: bool,
    },
    /// Look up a user's public key.
    Whois {
        username: String,
        #[arg(long)]
        passphrase: String,
        target: String,
    },
    /// Log out of the current session.
    Logout {
        username: String,
        #[arg(long)]
        passphrase: String,
    },
    /// Deregister the account (tombstoned if cached messages reference it).
    Deregister {
        username: String,
        #[arg(long)]
        passphrase: String,
    },
    /// Stay connected and print unsolicited RECIV/HOOK/SHTDWN pushes.
    Listen {
        username: String,
        #[arg(long)]
        passphrase: String,
        /// How long to listen before disconnecting.
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
    /// Administrative sub-operations (SPEC_FULL.md §4.6 "Admin sub-operations").
    Admin {
        username: String,
        #[arg(long)]
        passphrase: String,
        #[command(subcommand)]
        action: commands::admin::AdminAction,
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
    match &cli.command {
        Commands::Keygen { username, passphrase } => commands::keygen::command(&cli, username, passphrase).await,
        Commands::Register { username, passphrase } => commands::register::command(&cli, username, passphrase).await,
        Commands::Login { username, passphrase } => commands::login::command(&cli, username, passphrase).await,
        Commands::Send {
            username,
            passphrase,
            dest,
            message,
        } => commands::send::command(&cli, username, passphrase, dest, message).await,
        Commands::Users {
            username,
            passphrase,
            online,
            with_permission,
        } => commands::users::command(&cli, username, passphrase, *online, *with_permission).await,
        Commands::Whois {
            username,
            passphrase,
            target,
        } => commands::whois::command(&cli, username, passphrase, target).await,
        Commands::Logout { username, passphrase } => commands::logout::command(&cli, username, passphrase).await,
        Commands::Deregister { username, passphrase } => {
            commands::deregister::command(&cli, username, passphrase).await
        }
        Commands::Listen {
            username,
            passphrase,
            seconds,
        } => commands::listen::command(&cli, username, passphrase, *seconds).await,
        Commands::Admin {
            username,
            passphrase,
            action,
        } => commands::admin::command(&cli, username, passphrase, action).await,
    }
}
