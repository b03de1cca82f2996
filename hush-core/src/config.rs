use serde::{Deserialize, Serialize};

fn _default_listen() -> String {
    "0.0.0.0:6683".to_owned()
}

fn _default_database_url() -> String {
    "sqlite://data/hush.db?mode=rwc".to_owned()
}

fn _default_motd() -> String {
    "Welcome.".to_owned()
}

fn _default_max_connections() -> usize {
    1024
}

fn _default_login_timeout_secs() -> u64 {
    120
}

fn _default_idle_timeout_secs() -> u64 {
    600
}

fn _default_false() -> bool {
    false
}

/// Optional TLS listener config; `None` disables the TLS port (§6 "Transport").
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TlsConfig {
    pub listen: String,
    pub certificate_pem_path: String,
    pub key_pem_path: String,
    #[serde(default = "_default_false")]
    pub reusable_tokens: bool,
}

/// Deserializable server configuration, loaded with the `config` crate
/// (file + environment overlay), mirroring `warpgate/src/config.rs`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HushConfig {
    #[serde(default = "_default_listen")]
    pub listen: String,
    pub tls: Option<TlsConfig>,
    #[serde(default = "_default_database_url")]
    pub database_url: String,
    #[serde(default = "_default_motd")]
    pub motd: String,
    #[serde(default = "_default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "_default_login_timeout_secs")]
    pub login_timeout_secs: u64,
    #[serde(default = "_default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for HushConfig {
    fn default() -> Self {
        Self {
            listen: _default_listen(),
            tls: None,
            database_url: _default_database_url(),
            motd: _default_motd(),
            max_connections: _default_max_connections(),
            login_timeout_secs: _default_login_timeout_secs(),
            idle_timeout_secs: _default_idle_timeout_secs(),
        }
    }
}

/// Loads `path` (YAML) with a `HUSH_`-prefixed environment overlay, mirroring
/// `warpgate/src/config.rs::load_config`.
pub fn load_config(path: &str) -> anyhow::Result<HushConfig> {
    let config: HushConfig = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(config::Environment::with_prefix("HUSH"))
        .build()?
        .try_deserialize()?;
    Ok(config)
}
