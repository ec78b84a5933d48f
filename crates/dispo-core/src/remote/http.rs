//! HTTP client for the disposition endpoint.

use std::fmt;
use std::time::Duration;

use reqwest::header::ACCEPT;

use super::wire::{parse_fetch_response, DispositionQuery};
use super::{DispositionRemote, RemoteError, RemoteResult, SubmitDispositionRequest};
use crate::models::DispositionRecord;
use crate::util::{compact_text, is_http_url, normalize_text_option};

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Credentials attached to every request made by one client.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    access_token: Option<String>,
}

impl Credentials {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: normalize_text_option(Some(access_token.into())),
        }
    }

    pub const fn anonymous() -> Self {
        Self { access_token: None }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Timeout and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// First backoff delay; doubles on every retry
    pub backoff_base: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl ClientOptions {
    fn backoff(&self, retry: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2_u32.saturating_pow(retry))
            .min(Duration::from_secs(30))
    }
}

#[derive(Clone)]
pub struct HttpDispositionClient {
    base_url: String,
    credentials: Credentials,
    options: ClientOptions,
    client: reqwest::Client,
}

impl fmt::Debug for HttpDispositionClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HttpDispositionClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl HttpDispositionClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        options: ClientOptions,
    ) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder().timeout(options.timeout).build()?;
        Ok(Self {
            base_url,
            credentials,
            options,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/dispositions", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn try_submit(
        &self,
        request: &SubmitDispositionRequest,
        idempotency_key: &str,
    ) -> RemoteResult<()> {
        let response = self
            .authorize(self.client.post(self.endpoint()))
            .header(ACCEPT, "application/json")
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key)
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status,
            body: compact_text(&body),
        })
    }

    /// Fetch one page of remote dispositions.
    pub async fn fetch(&self, query: &DispositionQuery) -> RemoteResult<Vec<DispositionRecord>> {
        let response = self
            .authorize(self.client.get(self.endpoint()))
            .header(ACCEPT, "application/json")
            .query(&query.to_pairs())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.text().await.map_err(classify)?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: compact_text(&body),
            });
        }

        parse_fetch_response(&body)
    }
}

impl DispositionRemote for HttpDispositionClient {
    /// Submit with bounded exponential backoff on transient failures.
    ///
    /// Every attempt carries the record id as its idempotency key, so a
    /// retried delivery is applied at most once by the endpoint.
    async fn submit(&self, record: &DispositionRecord) -> RemoteResult<()> {
        let request = SubmitDispositionRequest::from(record);
        let mut retry = 0;

        loop {
            match self.try_submit(&request, record.id.as_str()).await {
                Ok(()) => {
                    tracing::debug!("Delivered disposition {}", record.id);
                    return Ok(());
                }
                Err(error) if error.is_retryable() && retry < self.options.max_retries => {
                    let delay = self.options.backoff(retry);
                    tracing::warn!(
                        disposition = %record.id,
                        attempt = retry + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Disposition delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn classify(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Http(error)
    }
}

fn normalize_base_url(raw: String) -> RemoteResult<String> {
    let url = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::InvalidConfiguration("base URL must not be empty".to_string())
    })?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}
