//! Client-side command runtime for the hush chat protocol (SPEC_FULL.md §4.7):
//! a transport layer ([`connection`]) under one async function per wire
//! action ([`runtime`]), a narrow local-persistence boundary ([`store`],
//! with a `rusqlite` default impl in [`sqlite_store`]), and trust-on-first-use
//! TLS pinning ([`tls`]).

pub mod connection;
pub mod error;
pub mod runtime;
pub mod sqlite_store;
pub mod store;
pub mod tls;

pub use connection::Connection;
pub use error::ClientError;
pub use runtime::{generate_identity, Client, ClientEvent};
pub use sqlite_store::SqliteClientStore;
pub use store::{ClientStore, LocalIdentity, ServerRecord, StoreError, StoredMessage};
