//! Stand-in endpoint with a fixed delay and a random failure rate.

use std::time::Duration;

use rand::Rng;

use super::{DispositionRemote, RemoteError, RemoteResult};
use crate::models::DispositionRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedRemote {
    delay: Duration,
    success_rate: f64,
}

impl Default for SimulatedRemote {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 0.9)
    }
}

impl SimulatedRemote {
    /// `success_rate` is clamped to `[0.0, 1.0]`.
    pub fn new(delay: Duration, success_rate: f64) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        Self {
            delay,
            success_rate,
        }
    }

    pub const fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl DispositionRemote for SimulatedRemote {
    async fn submit(&self, record: &DispositionRecord) -> RemoteResult<()> {
        tokio::time::sleep(self.delay).await;
        let delivered = rand::thread_rng().gen_bool(self.success_rate);
        if delivered {
            tracing::debug!("Simulated delivery of {}", record.id);
            Ok(())
        } else {
            Err(RemoteError::Simulated)
        }
    }
}
