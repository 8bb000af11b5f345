//! FormDeToit Core - Shared types library.
//!
//! This crate provides common types used across all FormDeToit components:
//! - `admin` - Back-office and public site server
//! - `cli` - Command-line tools for migrations and account bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, roles and permissions, emails, slugs and site paths

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
