//! # Auction Record - Per-Auction State and Transitions
//!
//! One `AuctionRecord` owns the complete mutable state of a single auction:
//! the auction row, its bids in acceptance order, its prize items, watch
//! subscriptions, the idempotency replay table, and parked ledger fixups.
//!
//! The record is the engine's unit of serialization. Every method here is
//! pure bookkeeping: validation produces a [`BidPlan`] describing what the
//! service must do against the ledger, and the matching `commit_*` method
//! applies the result. No I/O happens in this module.
//!
//! ## Invariants Enforced
//!
//! - At most one bid has `is_winning = true` (`commit_new_winner`)
//! - `current_price` equals the winning bid's amount, or the starting
//!   price with no accepted bids
//! - A bid marked `is_refunded` is never mutated again
//! - Terminal statuses are never left (`finalize`, `cancel` are no-ops on
//!   terminal records)
//! - `ends_at` never moves backwards (`maybe_auto_extend`)

use std::collections::{HashMap, HashSet};

use super::entities::{
    Auction, AuctionItem, AuctionKind, AuctionStatus, Besitos, Bid, BidId, HoldId, Timestamp,
    UserId, Watch,
};
use super::errors::AuctionError;
use super::services;
use super::value_objects::{AuctionView, BidReceipt, EndOutcome, LedgerFixup};
use uuid::Uuid;

/// What accepting a bid requires from the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BidPlan {
    /// The bid becomes the new winner: hold `hold_amount`, then commit.
    NewWinner {
        hold_amount: Besitos,
        /// Winning bid displaced by this one, if any.
        displaces: Option<BidId>,
        /// Buyout or descending-clock acceptance: end right after commit.
        ends_immediately: bool,
    },
    /// Sealed bid at or below the concealed best: recorded, never held.
    SealedLoser,
    /// The standing proxy bid absorbs the challenge and is raised.
    ProxyRaise {
        winner_bid: BidId,
        winner_user: UserId,
        raise_to: Besitos,
    },
}

/// Complete serialized state of one auction.
#[derive(Debug)]
pub struct AuctionRecord {
    auction: Auction,
    /// Bids in acceptance order.
    bids: Vec<Bid>,
    items: Vec<AuctionItem>,
    watches: HashMap<UserId, Watch>,
    /// Idempotency-key replay table: retries return the original receipt.
    replays: HashMap<String, BidReceipt>,
    /// Ledger operations that exhausted retries, drained by the sweep.
    fixups: Vec<LedgerFixup>,
    distinct_bidders: HashSet<UserId>,
    ending_soon_notified: bool,
    delivery_failed: bool,
}

impl AuctionRecord {
    pub fn new(auction: Auction, items: Vec<AuctionItem>) -> Self {
        Self {
            auction,
            bids: Vec::new(),
            items,
            watches: HashMap::new(),
            replays: HashMap::new(),
            fixups: Vec::new(),
            distinct_bidders: HashSet::new(),
            ending_soon_notified: false,
            delivery_failed: false,
        }
    }

    pub fn auction(&self) -> &Auction {
        &self.auction
    }

    pub fn items(&self) -> &[AuctionItem] {
        &self.items
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    pub fn distinct_bidder_count(&self) -> usize {
        self.distinct_bidders.len()
    }

    /// The unique winning bid, if one stands.
    pub fn winning_bid(&self) -> Option<&Bid> {
        self.bids.iter().find(|b| b.is_winning)
    }

    // =========================================================================
    // IDEMPOTENCY
    // =========================================================================

    /// Returns the original receipt for a replayed idempotency key.
    pub fn replay(&self, key: &str) -> Option<BidReceipt> {
        self.replays.get(key).map(|receipt| BidReceipt {
            replayed: true,
            ..receipt.clone()
        })
    }

    pub fn remember_replay(&mut self, key: String, receipt: BidReceipt) {
        self.replays.insert(key, receipt);
    }

    // =========================================================================
    // BID VALIDATION
    // =========================================================================

    /// Checks that the auction accepts bids at `now`.
    pub fn ensure_biddable(&self, now: Timestamp) -> Result<(), AuctionError> {
        if self.auction.status != AuctionStatus::Active {
            return Err(AuctionError::AuctionNotBiddable {
                status: self.auction.status,
            });
        }
        if now < self.auction.starts_at || now >= self.auction.ends_at {
            return Err(AuctionError::AuctionNotBiddable {
                status: self.auction.status,
            });
        }
        Ok(())
    }

    /// Participant-cap part of the access rule. Users who already bid are
    /// always allowed back in.
    pub fn participant_allowed(&self, user_id: UserId) -> bool {
        if self.distinct_bidders.contains(&user_id) {
            return true;
        }
        match self.auction.access_rule.max_participants {
            Some(cap) => (self.distinct_bidders.len() as u32) < cap,
            None => true,
        }
    }

    /// Validates an offer and decides what it does to the standing state.
    ///
    /// Does not mutate; the service executes the returned plan against the
    /// ledger and then calls the matching `commit_*`.
    pub fn plan_bid(
        &self,
        user_id: UserId,
        amount: Besitos,
        now: Timestamp,
    ) -> Result<BidPlan, AuctionError> {
        match self.auction.kind {
            AuctionKind::Dutch => self.plan_dutch_bid(amount, now),
            AuctionKind::SealedBid => self.plan_sealed_bid(amount),
            AuctionKind::Normal | AuctionKind::Reserve => self.plan_open_bid(user_id, amount),
        }
    }

    fn plan_open_bid(&self, user_id: UserId, amount: Besitos) -> Result<BidPlan, AuctionError> {
        let winner = self.winning_bid();

        if winner.map(|w| w.user_id) == Some(user_id) {
            return Err(AuctionError::AlreadyHighestBidder { user_id });
        }

        let current = self.auction.current_price;
        let min_required = services::min_acceptable_bid(current, self.auction.min_increment);
        let max_allowed = services::max_acceptable_bid(current, self.auction.max_increment);
        if amount < min_required || max_allowed.is_some_and(|max| amount > max) {
            return Err(AuctionError::BidTooLow {
                amount,
                current_price: current,
                min_required,
                max_allowed,
            });
        }

        if let Some(w) = winner {
            if let Some(ceiling) = w.max_auto_bid {
                if ceiling >= amount {
                    return Ok(BidPlan::ProxyRaise {
                        winner_bid: w.id,
                        winner_user: w.user_id,
                        raise_to: services::proxy_raise_amount(
                            w.amount,
                            ceiling,
                            amount,
                            self.auction.min_increment,
                        ),
                    });
                }
            }
        }

        Ok(BidPlan::NewWinner {
            hold_amount: amount,
            displaces: winner.map(|w| w.id),
            ends_immediately: self.auction.buyout_price.is_some_and(|b| amount >= b),
        })
    }

    /// Sealed bidding skips the highest-bidder check: bidders cannot
    /// observe the leader, and raising one's own bid is legitimate.
    fn plan_sealed_bid(&self, amount: Besitos) -> Result<BidPlan, AuctionError> {
        // Rejections quote the starting price only; the running best stays
        // concealed.
        if amount < self.auction.starting_price {
            return Err(AuctionError::BidTooLow {
                amount,
                current_price: self.auction.starting_price,
                min_required: self.auction.starting_price,
                max_allowed: None,
            });
        }
        match self.winning_bid() {
            Some(w) if amount <= w.amount => Ok(BidPlan::SealedLoser),
            winner => Ok(BidPlan::NewWinner {
                hold_amount: amount,
                displaces: winner.map(|w| w.id),
                ends_immediately: false,
            }),
        }
    }

    fn plan_dutch_bid(&self, amount: Besitos, now: Timestamp) -> Result<BidPlan, AuctionError> {
        let floor = services::dutch_floor(self.auction.reserve_price, self.auction.min_increment);
        let quote = services::dutch_quote(
            self.auction.starting_price,
            floor,
            self.auction.starts_at,
            self.auction.ends_at,
            now,
        );
        if amount < quote {
            return Err(AuctionError::BidTooLow {
                amount,
                current_price: quote,
                min_required: quote,
                max_allowed: None,
            });
        }
        Ok(BidPlan::NewWinner {
            hold_amount: amount,
            displaces: self.winning_bid().map(|w| w.id),
            ends_immediately: true,
        })
    }

    // =========================================================================
    // BID COMMITS
    // =========================================================================

    /// Installs a new winning bid backed by `hold_id`.
    ///
    /// Returns the new bid id and, when a previous winner was displaced,
    /// the hold the service must release.
    pub fn commit_new_winner(
        &mut self,
        user_id: UserId,
        amount: Besitos,
        max_auto_bid: Option<Besitos>,
        hold_id: HoldId,
        now: Timestamp,
    ) -> (BidId, Option<(BidId, HoldId)>) {
        let mut displaced = None;
        if let Some(prev) = self.bids.iter_mut().find(|b| b.is_winning) {
            prev.is_winning = false;
            if let Some(hold) = prev.hold_id {
                displaced = Some((prev.id, hold));
            }
        }

        let bid = Bid {
            id: Uuid::new_v4(),
            auction_id: self.auction.id,
            user_id,
            amount,
            is_auto_bid: max_auto_bid.is_some(),
            max_auto_bid,
            is_winning: true,
            is_refunded: false,
            hold_id: Some(hold_id),
            created_at: now,
        };
        let bid_id = bid.id;
        self.bids.push(bid);
        self.distinct_bidders.insert(user_id);
        self.auction.current_price = amount;

        debug_assert!(self.bids.iter().filter(|b| b.is_winning).count() == 1);
        (bid_id, displaced)
    }

    /// Records a sealed bid that did not beat the concealed best. The bid
    /// is born losing and already settled: no hold was ever placed.
    pub fn commit_sealed_loser(
        &mut self,
        user_id: UserId,
        amount: Besitos,
        now: Timestamp,
    ) -> BidId {
        let bid = Bid {
            id: Uuid::new_v4(),
            auction_id: self.auction.id,
            user_id,
            amount,
            is_auto_bid: false,
            max_auto_bid: None,
            is_winning: false,
            is_refunded: true,
            hold_id: None,
            created_at: now,
        };
        let bid_id = bid.id;
        self.bids.push(bid);
        self.distinct_bidders.insert(user_id);
        bid_id
    }

    /// Raises the standing proxy bid and records the absorbed challenger.
    ///
    /// This is the only place a bid amount changes after creation. When the
    /// raise moved the amount, `new_hold` backs it and the returned hold
    /// must be released. Returns the challenger's (losing) bid id.
    pub fn commit_proxy_raise(
        &mut self,
        winner_bid: BidId,
        raise_to: Besitos,
        new_hold: Option<HoldId>,
        challenger: UserId,
        challenger_amount: Besitos,
        now: Timestamp,
    ) -> (BidId, Option<HoldId>) {
        let mut released = None;
        if let Some(w) = self.bids.iter_mut().find(|b| b.id == winner_bid) {
            if raise_to > w.amount {
                w.amount = raise_to;
                released = std::mem::replace(&mut w.hold_id, new_hold);
                self.auction.current_price = raise_to;
            }
        }

        let bid = Bid {
            id: Uuid::new_v4(),
            auction_id: self.auction.id,
            user_id: challenger,
            amount: challenger_amount,
            is_auto_bid: false,
            max_auto_bid: None,
            is_winning: false,
            is_refunded: true,
            hold_id: None,
            created_at: now,
        };
        let bid_id = bid.id;
        self.bids.push(bid);
        self.distinct_bidders.insert(challenger);
        (bid_id, released)
    }

    /// Re-evaluated after every accepted bid, not only on a timer, so a
    /// last-second bid cannot slip through unextended. Returns the new
    /// deadline when it moved.
    pub fn maybe_auto_extend(&mut self, accepted_at: Timestamp) -> Option<Timestamp> {
        if !self.auction.auto_extend || self.auction.kind == AuctionKind::Dutch {
            return None;
        }
        let window = self.auction.extension_window_ms;
        if !services::within_extension_window(self.auction.ends_at, accepted_at, window) {
            return None;
        }
        let extended = services::extended_deadline(self.auction.ends_at, accepted_at, window);
        if extended > self.auction.ends_at {
            self.auction.ends_at = extended;
            Some(extended)
        } else {
            None
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    pub fn due_to_activate(&self, now: Timestamp) -> bool {
        self.auction.status == AuctionStatus::Scheduled && now >= self.auction.starts_at
    }

    pub fn due_to_end(&self, now: Timestamp) -> bool {
        self.auction.status == AuctionStatus::Active && now >= self.auction.ends_at
    }

    /// Scheduled → Active. Idempotent: activating an active auction is a
    /// no-op returning false.
    pub fn activate(&mut self, now: Timestamp) -> bool {
        if self.due_to_activate(now) {
            self.auction.status = AuctionStatus::Active;
            true
        } else {
            false
        }
    }

    pub fn pause(&mut self, now: Timestamp) -> Result<(), AuctionError> {
        if self.auction.status != AuctionStatus::Active {
            return Err(AuctionError::InvalidTransition {
                from: self.auction.status,
            });
        }
        self.auction.status = AuctionStatus::Paused;
        self.auction.paused_at = Some(now);
        Ok(())
    }

    /// Resumes a paused auction, shifting `ends_at` by the paused duration
    /// so a pause never eats bidding time.
    pub fn resume(&mut self, now: Timestamp) -> Result<(), AuctionError> {
        if self.auction.status != AuctionStatus::Paused {
            return Err(AuctionError::InvalidTransition {
                from: self.auction.status,
            });
        }
        let paused_for = now.saturating_sub(self.auction.paused_at.unwrap_or(now));
        self.auction.ends_at = self.auction.ends_at.saturating_add(paused_for);
        self.auction.paused_at = None;
        self.auction.status = AuctionStatus::Active;
        Ok(())
    }

    /// Moves the auction to its terminal state and decides the outcome.
    ///
    /// Idempotent: returns `None` on an already-terminal record, so a
    /// repeated ending sweep cannot double-settle.
    pub fn finalize(&mut self, _now: Timestamp) -> Option<EndOutcome> {
        if self.auction.status.is_terminal() {
            return None;
        }

        let outcome = match self.winning_bid() {
            None => {
                self.auction.status = AuctionStatus::EndedNoBids;
                EndOutcome::NoBids
            }
            Some(w) => {
                let (bid_id, user_id, amount) = (w.id, w.user_id, w.amount);
                match self.auction.reserve_price {
                    Some(reserve) if amount < reserve => {
                        self.auction.status = AuctionStatus::EndedReserveNotMet;
                        // The best bid did not win; it no longer stands.
                        if let Some(b) = self.bids.iter_mut().find(|b| b.id == bid_id) {
                            b.is_winning = false;
                        }
                        EndOutcome::ReserveNotMet { highest: amount }
                    }
                    _ => {
                        self.auction.status = AuctionStatus::EndedWithWinner;
                        self.auction.winner_id = Some(user_id);
                        self.auction.winning_bid_id = Some(bid_id);
                        EndOutcome::Winner {
                            user_id,
                            bid_id,
                            amount,
                        }
                    }
                }
            }
        };
        Some(outcome)
    }

    /// Cancels a non-terminal auction and hands back every outstanding
    /// hold for release.
    pub fn cancel(&mut self) -> Result<Vec<(BidId, HoldId)>, AuctionError> {
        if self.auction.status.is_terminal() {
            return Err(AuctionError::InvalidTransition {
                from: self.auction.status,
            });
        }
        self.auction.status = AuctionStatus::Cancelled;
        if let Some(w) = self.bids.iter_mut().find(|b| b.is_winning) {
            w.is_winning = false;
        }
        Ok(self.outstanding_holds())
    }

    // =========================================================================
    // ESCROW BOOKKEEPING
    // =========================================================================

    /// Bids still backed by a hold.
    pub fn outstanding_holds(&self) -> Vec<(BidId, HoldId)> {
        self.bids
            .iter()
            .filter_map(|b| b.hold_id.map(|h| (b.id, h)))
            .collect()
    }

    /// Marks a hold released. Refunded bids are immutable afterwards.
    ///
    /// A winning bid is never marked: when a proxy raise swaps holds, the
    /// released hold is the old one and the bid stays live on its fresh
    /// hold.
    pub fn mark_refunded(&mut self, bid_id: BidId) {
        if let Some(b) = self.bids.iter_mut().find(|b| b.id == bid_id) {
            if !b.is_winning && !b.is_refunded {
                b.is_refunded = true;
                b.hold_id = None;
            }
        }
    }

    /// Marks the winner's hold captured (payment final).
    pub fn mark_captured(&mut self, bid_id: BidId) {
        if let Some(b) = self.bids.iter_mut().find(|b| b.id == bid_id) {
            b.hold_id = None;
        }
    }

    pub fn push_fixup(&mut self, fixup: LedgerFixup) {
        self.fixups.push(fixup);
    }

    pub fn take_fixups(&mut self) -> Vec<LedgerFixup> {
        std::mem::take(&mut self.fixups)
    }

    pub fn has_fixups(&self) -> bool {
        !self.fixups.is_empty()
    }

    // =========================================================================
    // DELIVERY
    // =========================================================================

    pub fn mark_delivered(&mut self, now: Timestamp) {
        for item in &mut self.items {
            item.is_delivered = true;
            item.delivered_at = Some(now);
        }
        self.delivery_failed = false;
    }

    pub fn set_delivery_failed(&mut self) {
        self.delivery_failed = true;
    }

    /// Ended with a winner but items still undelivered.
    pub fn delivery_pending(&self) -> bool {
        self.delivery_failed && self.auction.status == AuctionStatus::EndedWithWinner
    }

    // =========================================================================
    // WATCHES & NOTIFICATIONS
    // =========================================================================

    pub fn add_watch(&mut self, user_id: UserId, now: Timestamp) {
        self.watches.entry(user_id).or_insert(Watch {
            auction_id: self.auction.id,
            user_id,
            created_at: now,
        });
    }

    pub fn remove_watch(&mut self, user_id: UserId) -> bool {
        self.watches.remove(&user_id).is_some()
    }

    pub fn watchers(&self) -> Vec<UserId> {
        self.watches.keys().copied().collect()
    }

    pub fn clear_watches(&mut self) {
        self.watches.clear();
    }

    /// One-shot check for the ending-soon window; flips the notified flag.
    pub fn due_for_ending_soon(&mut self, now: Timestamp, window_ms: u64) -> bool {
        if self.ending_soon_notified || self.auction.status != AuctionStatus::Active {
            return false;
        }
        if self.auction.ends_at.saturating_sub(now) <= window_ms {
            self.ending_soon_notified = true;
            return true;
        }
        false
    }

    // =========================================================================
    // READ MODEL
    // =========================================================================

    /// Builds the public view. Sealed-bid auctions conceal the running
    /// price until they terminate.
    pub fn view(&self) -> AuctionView {
        let conceal = self.auction.kind == AuctionKind::SealedBid
            && !self.auction.status.is_terminal();
        AuctionView {
            id: self.auction.id,
            title: self.auction.title.clone(),
            description: self.auction.description.clone(),
            kind: self.auction.kind,
            status: self.auction.status,
            starting_price: self.auction.starting_price,
            current_price: if conceal {
                self.auction.starting_price
            } else {
                self.auction.current_price
            },
            buyout_price: self.auction.buyout_price,
            min_increment: self.auction.min_increment,
            bid_count: self.bid_count(),
            item_count: self.items.len(),
            starts_at: self.auction.starts_at,
            ends_at: self.auction.ends_at,
            auto_extend: self.auction.auto_extend,
            winner_id: self.auction.winner_id,
            created_by: self.auction.created_by,
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::domain::entities::{AccessRule, AuctionSpec, ItemDraft, ItemPayload};
    use proptest::prelude::*;

    fn active_record() -> AuctionRecord {
        let spec = AuctionSpec {
            title: "prop".to_string(),
            description: String::new(),
            kind: AuctionKind::Normal,
            starting_price: 100,
            reserve_price: None,
            buyout_price: None,
            min_increment: 10,
            max_increment: None,
            access_rule: AccessRule::default(),
            starts_at: 1_000,
            ends_at: 1_000_000,
            auto_extend: false,
            extension_window_ms: 0,
            items: vec![ItemDraft {
                payload: ItemPayload::CurrencyPack { amount: 1 },
                quantity: 1,
            }],
            created_by: 1,
        };
        let mut auction = spec.into_auction(Uuid::new_v4(), 500);
        auction.status = AuctionStatus::Active;
        AuctionRecord::new(auction, vec![])
    }

    proptest! {
        /// Whatever sequence of offers arrives, the price never falls and
        /// at most one bid is winning.
        #[test]
        fn prop_price_monotone_and_single_winner(
            amounts in prop::collection::vec(1u64..2_000, 1..40)
        ) {
            let mut rec = active_record();
            let mut last_price = rec.auction().current_price;
            for (i, amount) in amounts.into_iter().enumerate() {
                let user = i as UserId + 1;
                if let Ok(BidPlan::NewWinner { hold_amount, .. }) =
                    rec.plan_bid(user, amount, 2_000)
                {
                    rec.commit_new_winner(user, hold_amount, None, Uuid::new_v4(), 2_000);
                }
                prop_assert!(rec.auction().current_price >= last_price);
                prop_assert!(rec.bids().iter().filter(|b| b.is_winning).count() <= 1);
                last_price = rec.auction().current_price;
            }
        }

        /// With displaced holds refunded as they go, the outstanding
        /// escrow always equals the standing winning amount.
        #[test]
        fn prop_outstanding_escrow_tracks_winning_bid(
            amounts in prop::collection::vec(1u64..2_000, 1..40)
        ) {
            let mut rec = active_record();
            for (i, amount) in amounts.into_iter().enumerate() {
                let user = i as UserId + 1;
                if let Ok(BidPlan::NewWinner { hold_amount, .. }) =
                    rec.plan_bid(user, amount, 2_000)
                {
                    let (_, displaced) =
                        rec.commit_new_winner(user, hold_amount, None, Uuid::new_v4(), 2_000);
                    if let Some((bid_id, _)) = displaced {
                        rec.mark_refunded(bid_id);
                    }
                }

                let outstanding: Vec<_> = rec.outstanding_holds();
                match rec.winning_bid() {
                    Some(w) => {
                        prop_assert_eq!(outstanding.len(), 1);
                        prop_assert_eq!(outstanding[0].0, w.id);
                    }
                    None => prop_assert!(outstanding.is_empty()),
                }
            }
        }
    }
}
