//! Per-provider request pacing.
//!
//! A provider with `rate_limit_per_second` gets a minimum interval between
//! requests. Callers reserve the next free slot under a short lock and then
//! sleep until it, so concurrent callers are spaced out instead of waking
//! together. A caller dropped while waiting hands its slot back if nobody
//! has booked after it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::{sleep_until, Instant};

use crate::observability::metrics;
use crate::providers::Provider;

type SlotCell = Arc<Mutex<Option<Instant>>>;

/// Slot reservation per provider: the time of the last admitted request.
#[derive(Debug, Default)]
pub struct RateLimiter {
    slots: DashMap<String, SlotCell>,
}

/// A booked slot not yet reached. Dropping it before `keep` rolls the
/// provider's last slot back, provided this booking is still the latest.
struct Reservation {
    cell: SlotCell,
    slot: Instant,
    previous: Option<Instant>,
    kept: bool,
}

impl Reservation {
    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        let mut last = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        if *last == Some(self.slot) {
            *last = self.previous;
        }
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `provider` may send its next request. No-op without a rate.
    pub async fn await_turn(&self, provider: &Provider) {
        let Some(interval) = provider.min_interval else {
            return;
        };

        let reservation = self.reserve(&provider.name, interval);
        let now = Instant::now();
        if reservation.slot > now {
            let wait = reservation.slot - now;
            tracing::debug!(provider = %provider.name, wait = ?wait, "Rate limit wait");
            metrics::record_rate_limit_wait(&provider.name, wait);
            sleep_until(reservation.slot).await;
        }
        reservation.keep();
    }

    /// Claim the earliest slot at least `interval` after the previous one.
    fn reserve(&self, provider: &str, interval: Duration) -> Reservation {
        let cell = match self.slots.get(provider) {
            Some(cell) => cell.clone(),
            None => self.slots.entry(provider.to_string()).or_default().clone(),
        };

        let (slot, previous) = {
            let mut last = cell.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let previous = *last;
            let slot = match previous {
                Some(previous) => (previous + interval).max(now),
                None => now,
            };
            *last = Some(slot);
            (slot, previous)
        };

        Reservation {
            cell,
            slot,
            previous,
            kept: false,
        }
    }
}
