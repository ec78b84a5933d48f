//! Database layer for Dispo

mod connection;
mod migrations;
mod store;

pub use connection::Database;
pub use store::{sort_newest_first, DispositionStore, LibSqlDispositionStore, Slot};
