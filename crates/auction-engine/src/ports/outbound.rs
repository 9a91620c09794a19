//! Outbound (Driven) Ports
//!
//! Dependencies the engine needs from the rest of the system. The ledger
//! is the only party allowed to mutate balances: the engine never reads a
//! balance and writes it back, it only asks for hold/release/capture.

use async_trait::async_trait;

use crate::domain::{
    AccessRule, AuctionId, AuctionItem, Besitos, DeliveryError, HoldId, LedgerError, Timestamp,
    UserId,
};

/// Currency escrow (Driven Port).
///
/// All three operations are treated as remote and fallible; the engine
/// retries `Unavailable` with bounded backoff and surfaces
/// `InsufficientFunds` to the caller unchanged.
#[async_trait]
pub trait LedgerPort: Send + Sync {
    /// Reserves `amount` against the user's balance.
    async fn hold(
        &self,
        user_id: UserId,
        amount: Besitos,
        reference: AuctionId,
    ) -> Result<HoldId, LedgerError>;

    /// Returns held funds to the user (refund).
    async fn release(&self, hold_id: HoldId) -> Result<(), LedgerError>;

    /// Finalizes held funds as payment.
    async fn capture(&self, hold_id: HoldId) -> Result<(), LedgerError>;
}

/// Eligibility oracle for access rules (Driven Port).
///
/// The participant cap is evaluated inside the engine (it depends on bid
/// state); level and VIP checks live behind this port.
#[async_trait]
pub trait AccessPort: Send + Sync {
    async fn check_eligibility(&self, user_id: UserId, rule: &AccessRule) -> bool;
}

/// Prize hand-off to the inventory/content system (Driven Port).
///
/// Failures are retryable and independent of payment finality: a captured
/// payment is never reversed because delivery lagged.
#[async_trait]
pub trait ContentDeliveryPort: Send + Sync {
    async fn deliver(
        &self,
        auction_id: AuctionId,
        winner_id: UserId,
        items: &[AuctionItem],
    ) -> Result<(), DeliveryError>;
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Mock time source for testing.
#[cfg(test)]
pub struct MockTimeSource {
    time: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: std::sync::atomic::AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(std::sync::atomic::Ordering::SeqCst)
    }
}
