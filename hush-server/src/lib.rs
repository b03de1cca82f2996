//! Server-side wire protocol engine (SPEC_FULL.md §4.5, §4.6): the
//! accept loops ([`listener`]), per-connection reader+runner pair
//! ([`connection`]), one handler module per action family ([`handlers`]),
//! reply-building helpers ([`reply`]), and TLS listener setup ([`tls`]).
//!
//! Exposed as a library (in addition to the `hush-server` binary) so
//! integration tests can drive a real in-process server over loopback TCP
//! instead of spawning the compiled binary (SPEC_FULL.md §2 "Test tooling").

pub mod connection;
pub mod handlers;
pub mod listener;
pub mod reply;
pub mod tls;

pub use listener::{run_all, run_plain, run_tls, serve_plain};
