//! Data models for Dispo

mod disposition;
mod form;

pub use disposition::{
    DispositionDraft, DispositionFields, DispositionId, DispositionRecord, FieldEntry,
    OFFLINE_ENTRY,
};
pub use form::FormTemplate;
