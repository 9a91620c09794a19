//! In-memory implementations of the driven ports.
//!
//! Used by the test suites and by deployments that keep the besitos
//! ledger in process. `InMemoryLedger` models the full hold lifecycle so
//! escrow-conservation assertions can audit it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    AccessRule, AuctionId, AuctionItem, Besitos, DeliveryError, HoldId, LedgerError, UserId,
};
use crate::ports::outbound::{AccessPort, ContentDeliveryPort, LedgerPort};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HoldState {
    Held,
    Released,
    Captured,
}

#[derive(Clone, Debug)]
struct HoldEntry {
    user_id: UserId,
    amount: Besitos,
    state: HoldState,
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<UserId, Besitos>,
    holds: HashMap<HoldId, HoldEntry>,
}

/// In-memory besitos ledger.
///
/// A hold moves funds out of the available balance; release moves them
/// back; capture retires them. Holds are kept after they settle so tests
/// can audit the full escrow history.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    /// Number of upcoming calls that fail with `Unavailable`, for
    /// exercising the retry paths.
    fail_next: AtomicU32,
    /// Like `fail_next`, but only for `release`, so a displacement's
    /// refund can be failed without touching its hold.
    fail_next_releases: AtomicU32,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn credit(&self, user_id: UserId, amount: Besitos) {
        let mut state = self.state.lock().await;
        *state.balances.entry(user_id).or_insert(0) += amount;
    }

    /// Available (unheld) balance.
    pub async fn balance(&self, user_id: UserId) -> Besitos {
        self.state
            .lock()
            .await
            .balances
            .get(&user_id)
            .copied()
            .unwrap_or(0)
    }

    /// Sum of active holds for a user.
    pub async fn held_total(&self, user_id: UserId) -> Besitos {
        self.state
            .lock()
            .await
            .holds
            .values()
            .filter(|h| h.user_id == user_id && h.state == HoldState::Held)
            .map(|h| h.amount)
            .sum()
    }

    /// Totals over the entire hold history: (placed, released, captured).
    pub async fn escrow_totals(&self) -> (Besitos, Besitos, Besitos) {
        let state = self.state.lock().await;
        let mut placed = 0;
        let mut released = 0;
        let mut captured = 0;
        for h in state.holds.values() {
            placed += h.amount;
            match h.state {
                HoldState::Released => released += h.amount,
                HoldState::Captured => captured += h.amount,
                HoldState::Held => {}
            }
        }
        (placed, released, captured)
    }

    /// Makes the next `n` ledger calls fail as unavailable.
    pub fn fail_next_ops(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` release calls fail as unavailable.
    pub fn fail_next_releases(&self, n: u32) {
        self.fail_next_releases.store(n, Ordering::SeqCst);
    }

    fn maybe_fail(&self, counter: &AtomicU32) -> Result<(), LedgerError> {
        let remaining = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        if remaining > 0 {
            return Err(LedgerError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerPort for InMemoryLedger {
    async fn hold(
        &self,
        user_id: UserId,
        amount: Besitos,
        _reference: AuctionId,
    ) -> Result<HoldId, LedgerError> {
        self.maybe_fail(&self.fail_next)?;
        let mut state = self.state.lock().await;
        let available = state.balances.get(&user_id).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        *state.balances.entry(user_id).or_insert(0) -= amount;
        let hold_id = Uuid::new_v4();
        state.holds.insert(
            hold_id,
            HoldEntry {
                user_id,
                amount,
                state: HoldState::Held,
            },
        );
        Ok(hold_id)
    }

    async fn release(&self, hold_id: HoldId) -> Result<(), LedgerError> {
        self.maybe_fail(&self.fail_next)?;
        self.maybe_fail(&self.fail_next_releases)?;
        let mut state = self.state.lock().await;
        let entry = state
            .holds
            .get_mut(&hold_id)
            .ok_or(LedgerError::HoldNotFound(hold_id))?;
        if entry.state != HoldState::Held {
            return Err(LedgerError::HoldNotFound(hold_id));
        }
        entry.state = HoldState::Released;
        let (user_id, amount) = (entry.user_id, entry.amount);
        *state.balances.entry(user_id).or_insert(0) += amount;
        Ok(())
    }

    async fn capture(&self, hold_id: HoldId) -> Result<(), LedgerError> {
        self.maybe_fail(&self.fail_next)?;
        let mut state = self.state.lock().await;
        let entry = state
            .holds
            .get_mut(&hold_id)
            .ok_or(LedgerError::HoldNotFound(hold_id))?;
        if entry.state != HoldState::Held {
            return Err(LedgerError::HoldNotFound(hold_id));
        }
        entry.state = HoldState::Captured;
        Ok(())
    }
}

/// Access oracle backed by a static user directory.
///
/// Unknown users have level 0 and no VIP flag, so a default rule admits
/// everyone.
#[derive(Default)]
pub struct InMemoryAccess {
    levels: HashMap<UserId, u32>,
    vips: HashSet<UserId>,
}

impl InMemoryAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: UserId, level: u32, vip: bool) -> Self {
        self.levels.insert(user_id, level);
        if vip {
            self.vips.insert(user_id);
        }
        self
    }
}

#[async_trait]
impl AccessPort for InMemoryAccess {
    async fn check_eligibility(&self, user_id: UserId, rule: &AccessRule) -> bool {
        let level = self.levels.get(&user_id).copied().unwrap_or(0);
        if level < rule.min_level {
            return false;
        }
        if rule.vip_only && !self.vips.contains(&user_id) {
            return false;
        }
        true
    }
}

/// Delivery port that records hand-offs, with failure injection.
#[derive(Default)]
pub struct RecordingDelivery {
    pub deliveries: std::sync::Mutex<Vec<(AuctionId, UserId, usize)>>,
    fail_next: AtomicU32,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` delivery calls fail retryably.
    pub fn fail_next_ops(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn delivered_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentDeliveryPort for RecordingDelivery {
    async fn deliver(
        &self,
        auction_id: AuctionId,
        winner_id: UserId,
        items: &[AuctionItem],
    ) -> Result<(), DeliveryError> {
        let remaining = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        if remaining > 0 {
            return Err(DeliveryError::new("injected delivery outage"));
        }
        self.deliveries
            .lock()
            .unwrap()
            .push((auction_id, winner_id, items.len()));
        Ok(())
    }
}
