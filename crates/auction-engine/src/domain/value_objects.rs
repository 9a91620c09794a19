//! Value objects exchanged across the engine boundary.

use serde::{Deserialize, Serialize};

use super::entities::{
    AuctionId, AuctionKind, AuctionStatus, Besitos, BidId, HoldId, Timestamp, UserId,
};

/// Result of an accepted (or replayed) bid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidReceipt {
    pub bid_id: BidId,
    pub auction_id: AuctionId,
    pub accepted: bool,
    /// Price standing after this call committed.
    pub current_price: Besitos,
    pub is_winning: bool,
    /// True when an idempotency-key replay returned the original result.
    pub replayed: bool,
}

/// Read model of an auction.
///
/// Sealed-bid auctions conceal the running price: `current_price` reports
/// the starting price until the auction ends.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionView {
    pub id: AuctionId,
    pub title: String,
    pub description: String,
    pub kind: AuctionKind,
    pub status: AuctionStatus,
    pub starting_price: Besitos,
    pub current_price: Besitos,
    pub buyout_price: Option<Besitos>,
    pub min_increment: Besitos,
    pub bid_count: usize,
    pub item_count: usize,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub auto_extend: bool,
    pub winner_id: Option<UserId>,
    pub created_by: UserId,
}

/// Filter for listing active auctions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuctionFilter {
    pub kind: Option<AuctionKind>,
    pub created_by: Option<UserId>,
    pub ending_before: Option<Timestamp>,
}

impl AuctionFilter {
    pub fn matches(&self, view: &AuctionView) -> bool {
        if let Some(kind) = self.kind {
            if view.kind != kind {
                return false;
            }
        }
        if let Some(creator) = self.created_by {
            if view.created_by != creator {
                return false;
            }
        }
        if let Some(deadline) = self.ending_before {
            if view.ends_at >= deadline {
                return false;
            }
        }
        true
    }
}

/// Outcome decided when an auction ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndOutcome {
    NoBids,
    ReserveNotMet {
        highest: Besitos,
    },
    Winner {
        user_id: UserId,
        bid_id: BidId,
        amount: Besitos,
    },
}

/// A ledger operation that exhausted its retry budget and waits for the
/// next sweep. Parking these keeps ending idempotent: the terminal status
/// is already set, only the side effect is outstanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerFixup {
    Release { bid_id: BidId, hold_id: HoldId },
    Capture { bid_id: BidId, hold_id: HoldId },
}

/// Summary of one scheduler sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub activated: usize,
    pub ended: usize,
    pub ending_soon: usize,
    pub fixups_drained: usize,
    pub deliveries_retried: usize,
}
