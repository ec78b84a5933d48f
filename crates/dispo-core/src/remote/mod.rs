//! Remote disposition endpoint.
//!
//! [`DispositionRemote`] is the seam the submission service and reconciler
//! deliver through. Two backends exist: [`HttpDispositionClient`] for a real
//! endpoint and [`SimulatedRemote`] for demo/offline builds.

mod http;
mod simulated;
mod wire;

use std::future::Future;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::models::{DispositionRecord, FieldEntry};

pub use http::{ClientOptions, Credentials, HttpDispositionClient};
pub use simulated::SimulatedRemote;
pub use wire::{parse_fetch_response, DispositionQuery, QueryScope};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Disposition request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Disposition request timed out")]
    Timeout,
    #[error("Disposition endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid disposition payload: {0}")]
    InvalidPayload(String),
    #[error("Simulated delivery failure")]
    Simulated,
}

impl RemoteError {
    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(error) => !error.is_builder() && !error.is_decode(),
            Self::Timeout | Self::Simulated => true,
            Self::Status { status, .. } => {
                let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                status.is_server_error()
                    || status == StatusCode::TOO_MANY_REQUESTS
                    || status == StatusCode::REQUEST_TIMEOUT
            }
            Self::InvalidConfiguration(_) | Self::InvalidPayload(_) => false,
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Body of `POST /v1/dispositions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDispositionRequest {
    pub fill_disposition: Vec<FieldEntry>,
    pub customer_id: Option<String>,
    pub agent_id: String,
    pub line_of_business_id: Option<String>,
    pub timestamp: i64,
}

impl From<&DispositionRecord> for SubmitDispositionRequest {
    fn from(record: &DispositionRecord) -> Self {
        Self {
            fill_disposition: record.fields.to_entries(),
            customer_id: record.customer_id.clone(),
            agent_id: record.agent_id.clone(),
            line_of_business_id: record.line_of_business_id.clone(),
            timestamp: record.created_at,
        }
    }
}

/// Delivery of a single disposition to the remote system.
pub trait DispositionRemote: Send + Sync {
    fn submit(&self, record: &DispositionRecord)
        -> impl Future<Output = RemoteResult<()>> + Send;
}

/// Either backend, picked from configuration.
#[derive(Debug, Clone)]
pub enum RemoteBackend {
    Http(HttpDispositionClient),
    Simulated(SimulatedRemote),
}

impl RemoteBackend {
    /// Fetch remote history. The simulated backend has none.
    pub async fn fetch(&self, query: &DispositionQuery) -> RemoteResult<Vec<DispositionRecord>> {
        match self {
            Self::Http(client) => client.fetch(query).await,
            Self::Simulated(_) => Ok(Vec::new()),
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Simulated(_) => "simulated",
        }
    }
}

impl DispositionRemote for RemoteBackend {
    async fn submit(&self, record: &DispositionRecord) -> RemoteResult<()> {
        match self {
            Self::Http(client) => client.submit(record).await,
            Self::Simulated(remote) => remote.submit(record).await,
        }
    }
}
