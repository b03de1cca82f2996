#![allow(non_snake_case)]

pub mod CachedMessage;
pub mod Principal;
pub mod permission;

pub use permission::{Permission, UnknownPermission};
