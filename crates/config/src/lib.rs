//! Configuration loading and validation for mothball.
//!
//! The raw on-disk document ([`raw::RawSettings`], camelCase keys, JSON or
//! TOML) is deserialized via figment and then eagerly converted into the
//! typed [`Settings`] the daemon actually runs on. Parse once, validate
//! everything, fail fast: a config error aborts startup before a single
//! file is touched.

pub mod error;
pub mod raw;
mod settings;

pub use crate::settings::{Settings, write_default};
