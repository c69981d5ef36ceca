//! Request gate
//!
//! A process-wide token bucket that bounds how quickly expensive fan-outs may
//! start. The gate is explicitly constructed and shared by reference; it is
//! not consulted for every HTTP call, only at the points where a caller asks
//! for admission.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, ServiceError};

/// Token bucket with cancellable waits
pub struct RequestGate {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    refill_per_sec: u32,
    burst: u32,
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate")
            .field("refill_per_sec", &self.refill_per_sec)
            .field("burst", &self.burst)
            .finish()
    }
}

impl RequestGate {
    /// Create a gate refilling `refill_per_sec` tokens per second with room
    /// for `burst` immediate admissions
    pub fn new(refill_per_sec: u32, burst: u32) -> Result<Self> {
        let rate = NonZeroU32::new(refill_per_sec)
            .ok_or_else(|| ServiceError::configuration("gate refill rate must be greater than zero"))?;
        let burst_size = NonZeroU32::new(burst)
            .ok_or_else(|| ServiceError::configuration("gate burst must be greater than zero"))?;

        let quota = Quota::per_second(rate).allow_burst(burst_size);

        Ok(Self {
            limiter: RateLimiter::direct(quota),
            refill_per_sec,
            burst,
        })
    }

    pub fn refill_per_sec(&self) -> u32 {
        self.refill_per_sec
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Take a token without waiting. Returns false when the bucket is empty.
    pub fn try_admit(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Wait for a token. The wait is abandoned with `ServiceError::Cancelled`
    /// as soon as `cancel` fires; an already cancelled token never admits.
    pub async fn admit(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("request gate wait cancelled");
                Err(ServiceError::cancelled("request gate wait cancelled"))
            }
            _ = self.limiter.until_ready() => Ok(()),
        }
    }
}
