//! Disposition form template

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::DispositionDraft;

/// Required-field rules for a disposition form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormTemplate {
    /// Field names that must carry a non-blank value
    pub required: Vec<String>,
}

impl FormTemplate {
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    /// Reject drafts with missing required fields, naming all of them.
    pub fn validate(&self, draft: &DispositionDraft) -> Result<()> {
        let missing = draft.fields.missing(&self.required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation { missing })
        }
    }
}
