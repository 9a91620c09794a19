//! Metrics hooks for engine operations.
//!
//! Thread-safe counters for monitoring bidding volume, escrow traffic,
//! and notification throughput.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for the auction engine.
#[derive(Default)]
pub struct Metrics {
    /// Auctions created.
    pub auctions_created: AtomicU64,
    /// Auctions moved from scheduled to active.
    pub auctions_activated: AtomicU64,
    /// Auctions that reached a terminal ended state.
    pub auctions_ended: AtomicU64,
    /// Auctions cancelled by an admin.
    pub auctions_cancelled: AtomicU64,
    /// Accepted bids (including sealed losing bids).
    pub bids_accepted: AtomicU64,
    /// Rejected bids, any error kind.
    pub bids_rejected: AtomicU64,
    /// Idempotency-key replays answered from the replay table.
    pub bids_replayed: AtomicU64,
    /// Proxy bids raised in place.
    pub proxy_raises: AtomicU64,
    /// Escrow holds placed.
    pub holds_placed: AtomicU64,
    /// Escrow holds released (refunds).
    pub holds_released: AtomicU64,
    /// Escrow holds captured (finalized payments).
    pub holds_captured: AtomicU64,
    /// Ledger operations parked for the sweep after retry exhaustion.
    pub fixups_parked: AtomicU64,
    /// Parked ledger operations completed by the sweep.
    pub fixups_drained: AtomicU64,
    /// Successful item deliveries.
    pub deliveries_completed: AtomicU64,
    /// Delivery attempts that exhausted their retry budget.
    pub deliveries_failed: AtomicU64,
    /// Notifications handed to the emitter.
    pub notifications_emitted: AtomicU64,
    /// Notifications lost to a closed or failing sink.
    pub notifications_dropped: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_auction_created(&self) {
        self.auctions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auction_activated(&self) {
        self.auctions_activated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auction_ended(&self) {
        self.auctions_ended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auction_cancelled(&self) {
        self.auctions_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bid_accepted(&self) {
        self.bids_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bid_rejected(&self) {
        self.bids_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bid_replayed(&self) {
        self.bids_replayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_proxy_raise(&self) {
        self.proxy_raises.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hold_placed(&self) {
        self.holds_placed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hold_released(&self) {
        self.holds_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hold_captured(&self) {
        self.holds_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fixup_parked(&self) {
        self.fixups_parked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fixup_drained(&self) {
        self.fixups_drained.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_completed(&self) {
        self.deliveries_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_failed(&self) {
        self.deliveries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_emitted(&self) {
        self.notifications_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_dropped(&self) {
        self.notifications_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            auctions_created: self.auctions_created.load(Ordering::Relaxed),
            auctions_activated: self.auctions_activated.load(Ordering::Relaxed),
            auctions_ended: self.auctions_ended.load(Ordering::Relaxed),
            auctions_cancelled: self.auctions_cancelled.load(Ordering::Relaxed),
            bids_accepted: self.bids_accepted.load(Ordering::Relaxed),
            bids_rejected: self.bids_rejected.load(Ordering::Relaxed),
            bids_replayed: self.bids_replayed.load(Ordering::Relaxed),
            proxy_raises: self.proxy_raises.load(Ordering::Relaxed),
            holds_placed: self.holds_placed.load(Ordering::Relaxed),
            holds_released: self.holds_released.load(Ordering::Relaxed),
            holds_captured: self.holds_captured.load(Ordering::Relaxed),
            fixups_parked: self.fixups_parked.load(Ordering::Relaxed),
            fixups_drained: self.fixups_drained.load(Ordering::Relaxed),
            deliveries_completed: self.deliveries_completed.load(Ordering::Relaxed),
            deliveries_failed: self.deliveries_failed.load(Ordering::Relaxed),
            notifications_emitted: self.notifications_emitted.load(Ordering::Relaxed),
            notifications_dropped: self.notifications_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of all counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub auctions_created: u64,
    pub auctions_activated: u64,
    pub auctions_ended: u64,
    pub auctions_cancelled: u64,
    pub bids_accepted: u64,
    pub bids_rejected: u64,
    pub bids_replayed: u64,
    pub proxy_raises: u64,
    pub holds_placed: u64,
    pub holds_released: u64,
    pub holds_captured: u64,
    pub fixups_parked: u64,
    pub fixups_drained: u64,
    pub deliveries_completed: u64,
    pub deliveries_failed: u64,
    pub notifications_emitted: u64,
    pub notifications_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_bid_accepted();
        metrics.record_bid_accepted();
        metrics.record_bid_rejected();
        metrics.record_hold_placed();

        let snap = metrics.snapshot();
        assert_eq!(snap.bids_accepted, 2);
        assert_eq!(snap.bids_rejected, 1);
        assert_eq!(snap.holds_placed, 1);
        assert_eq!(snap.holds_released, 0);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let metrics = Metrics::new();
        let before = metrics.snapshot();
        metrics.record_auction_created();
        assert_eq!(before.auctions_created, 0);
        assert_eq!(metrics.snapshot().auctions_created, 1);
    }
}
