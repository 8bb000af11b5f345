//! FormDeToit site and back-office library.
//!
//! This crate provides the public site, the back-office pages and the admin
//! JSON API as a library, so the integration tests can drive the full router
//! over in-memory backends.
//!
//! # Security
//!
//! This crate holds the auth platform service-role key (account creation and
//! deletion) and write access to every site resource. Back-office routes are
//! gated by session authentication and role permissions.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod actions;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
