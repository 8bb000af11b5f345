//! Core types for FormDeToit.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod path;
pub mod role;
pub mod slug;

pub use email::{Email, EmailError};
pub use id::*;
pub use path::{PathError, RedirectStatus, SitePath, parse_destination};
pub use role::{Permission, RoleLabel, sanitize_roles};
pub use slug::{Slug, SlugError};
