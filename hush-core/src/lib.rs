//! Session bookkeeping, persistence boundary, hook fan-out, and service
//! wiring shared by `hush-server` and (in part) `hush-client`
//! (SPEC_FULL.md §4.5, §5, and the ambient-stack additions in §2).

pub mod challenge;
pub mod config;
pub mod config_schema;
pub mod directory;
pub mod error;
pub mod hook_event;
pub mod hooks;
pub mod message_store;
pub mod services;
pub mod shutdown;
pub mod state;

pub use challenge::{random_charset_bytes, CHALLENGE_LEN, REUSABLE_TOKEN_LEN};
pub use config::HushConfig;
pub use config_schema::ConfigSchema;
pub use directory::{Directory, PrincipalRecord, SeaOrmDirectory};
pub use error::HushError;
pub use hook_event::HookEvent;
pub use hooks::{HookHub, HookSender, HookSubscription};
pub use message_store::{CachedMessageRecord, MessageStore, SeaOrmMessageStore};
pub use services::Services;
pub use shutdown::ShutdownCoordinator;
pub use state::{PendingVerification, PublicKey, ReusableToken, SessionState, State};

pub use hush_db_entities::Permission;
