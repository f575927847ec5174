//! Flat local-directory storage for the archival daemon.
//!
//! Provides [`Store`], a single-directory file store addressed by validated
//! flat names, used for both the source directory being drained and the
//! archive directory being managed. Gzip materialization lives here too,
//! since compression only ever happens on the way into a store.

pub mod error;
mod gzip;
mod name;
mod store;

pub use crate::name::validate_name;
pub use crate::store::{SourceEntry, Store};
