//! Network reachability probes.
//!
//! A probe answers "are we online right now?" and publishes changes on a
//! `watch` channel so background workers can react when connectivity returns.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::util::is_http_url;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum ReachabilityError {
    #[error("Invalid health URL '{0}': must include http:// or https://")]
    InvalidUrl(String),
    #[error("Failed to build reachability HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Point-in-time and event-driven connectivity signal.
pub trait ReachabilityProbe: Send + Sync {
    /// Check connectivity now
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// Receive connectivity changes
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Probe whose state is set by the caller.
#[derive(Debug, Clone)]
pub struct ManualReachability {
    state: watch::Sender<bool>,
}

impl ManualReachability {
    pub fn new(connected: bool) -> Self {
        let (state, _) = watch::channel(connected);
        Self { state }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Publish a new connectivity state. Subscribers are only woken on change.
    pub fn set_connected(&self, connected: bool) {
        self.state.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
    }
}

impl ReachabilityProbe for ManualReachability {
    async fn is_connected(&self) -> bool {
        *self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

/// Probe that treats a 2xx from a health endpoint as "connected".
#[derive(Debug, Clone)]
pub struct HttpReachability {
    url: String,
    client: reqwest::Client,
    state: watch::Sender<bool>,
}

impl HttpReachability {
    pub fn new(url: impl Into<String>) -> Result<Self, ReachabilityError> {
        Self::with_timeout(url, DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_timeout(
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ReachabilityError> {
        let url = url.into().trim().to_string();
        if !is_http_url(&url) {
            return Err(ReachabilityError::InvalidUrl(url));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let (state, _) = watch::channel(false);
        Ok(Self { url, client, state })
    }

    async fn probe(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::debug!(
                    "Reachability probe {} returned HTTP {}",
                    self.url,
                    response.status().as_u16()
                );
                false
            }
            Err(error) => {
                tracing::debug!("Reachability probe {} failed: {}", self.url, error);
                false
            }
        }
    }
}

impl ReachabilityProbe for HttpReachability {
    async fn is_connected(&self) -> bool {
        let connected = self.probe().await;
        self.state.send_if_modified(|current| {
            let changed = *current != connected;
            if changed {
                tracing::info!(
                    "Connectivity changed: {}",
                    if connected { "online" } else { "offline" }
                );
            }
            *current = connected;
            changed
        });
        connected
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

/// Either probe, picked at runtime.
#[derive(Debug, Clone)]
pub enum Reachability {
    Manual(ManualReachability),
    Http(HttpReachability),
}

impl ReachabilityProbe for Reachability {
    async fn is_connected(&self) -> bool {
        match self {
            Self::Manual(probe) => probe.is_connected().await,
            Self::Http(probe) => probe.is_connected().await,
        }
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        match self {
            Self::Manual(probe) => probe.subscribe(),
            Self::Http(probe) => probe.subscribe(),
        }
    }
}
