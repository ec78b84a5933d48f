//! Shared services for Dispo clients.

mod dispositions;

pub use dispositions::DispositionService;
