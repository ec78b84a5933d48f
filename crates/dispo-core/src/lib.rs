//! dispo-core - Core library for Dispo
//!
//! This crate contains the disposition models, the offline store, the remote
//! endpoint client, and the submit/reconcile logic shared by every Dispo
//! interface (CLI, API, and embedded clients).

pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod models;
pub mod reachability;
pub mod remote;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{DispositionDraft, DispositionId, DispositionRecord};
