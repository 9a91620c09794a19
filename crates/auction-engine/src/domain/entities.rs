//! Core domain entities for the auction engine.
//!
//! Defines auctions, bids, prize items, and watch subscriptions, together
//! with the engine configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::AuctionError;

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

/// Amount of besitos, the internal virtual currency.
pub type Besitos = u64;

/// External user identifier.
pub type UserId = u64;

/// Unique auction identifier.
pub type AuctionId = Uuid;

/// Unique bid identifier.
pub type BidId = Uuid;

/// Identifier of an escrow hold issued by the ledger.
pub type HoldId = Uuid;

/// How bids are solicited and the winner determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionKind {
    /// Open ascending auction; every accepted bid raises the visible price.
    Normal,
    /// Amounts are concealed until the auction ends.
    SealedBid,
    /// Descending clock; the first bid at or above the quote wins instantly.
    Dutch,
    /// Open ascending with a mandatory reserve price.
    Reserve,
}

/// Auction lifecycle state.
///
/// State machine:
/// ```text
/// [SCHEDULED] ──activate──→ [ACTIVE] ──end──→ [ENDED_*]
///                              │  ↕ pause/resume
///                              │ [PAUSED]
///                              └──cancel──→ [CANCELLED]
/// ```
/// All `Ended*` states and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionStatus {
    /// Created, waiting for `starts_at`.
    Scheduled,
    /// Open for bids.
    Active,
    /// Temporarily closed by an admin; the deadline is frozen.
    Paused,
    /// Ended with a winning bid at or above the reserve.
    EndedWithWinner,
    /// Ended without a single accepted bid.
    EndedNoBids,
    /// Ended with bids, but the best one was below the reserve price.
    EndedReserveNotMet,
    /// Cancelled by an admin; all holds were released.
    Cancelled,
}

impl AuctionStatus {
    /// Terminal states are immutable.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::EndedWithWinner | Self::EndedNoBids | Self::EndedReserveNotMet | Self::Cancelled
        )
    }
}

/// Eligibility rule evaluated before a user may bid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    /// Minimum user level.
    pub min_level: u32,
    /// Restrict bidding to VIP users.
    pub vip_only: bool,
    /// Cap on distinct bidders; `None` means unlimited.
    pub max_participants: Option<u32>,
}

/// A timed sale of one or more items.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    pub title: String,
    pub description: String,
    pub kind: AuctionKind,
    pub status: AuctionStatus,
    /// Opening price; `current_price` equals this until a bid is accepted.
    pub starting_price: Besitos,
    /// Minimum acceptable winning amount; below it the sale does not happen.
    pub reserve_price: Option<Besitos>,
    /// Price of the current winning bid (or `starting_price` with no bids).
    pub current_price: Besitos,
    /// A bid at or above this amount ends the auction immediately.
    pub buyout_price: Option<Besitos>,
    /// Minimum step over `current_price` for the next bid.
    pub min_increment: Besitos,
    /// Maximum step over `current_price`, if capped.
    pub max_increment: Option<Besitos>,
    pub access_rule: AccessRule,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    /// Push `ends_at` back when a bid lands inside `extension_window_ms`.
    pub auto_extend: bool,
    pub extension_window_ms: u64,
    /// Set only when the auction ends with a winner.
    pub winner_id: Option<UserId>,
    pub winning_bid_id: Option<BidId>,
    pub created_by: UserId,
    pub created_at: Timestamp,
    /// Set while paused; used to shift `ends_at` on resume.
    pub paused_at: Option<Timestamp>,
}

/// An offer on an auction.
///
/// At most one bid per auction has `is_winning = true` at any instant.
/// A bid marked `is_refunded` is immutable afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub auction_id: AuctionId,
    pub user_id: UserId,
    pub amount: Besitos,
    pub is_auto_bid: bool,
    /// Proxy-bidding ceiling; the engine raises the bid up to this amount.
    pub max_auto_bid: Option<Besitos>,
    pub is_winning: bool,
    pub is_refunded: bool,
    /// Outstanding escrow hold, if any.
    pub hold_id: Option<HoldId>,
    pub created_at: Timestamp,
}

/// Typed prize payload awarded to the winner.
///
/// The `Custom` arm keeps the model extensible without falling back to an
/// open blob: the kind tag routes it, the data travels opaque.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemPayload {
    Character { name: String, rarity: String },
    CurrencyPack { amount: Besitos },
    RoleBadge { role: String, days: u32 },
    Custom { tag: String, data: serde_json::Value },
}

/// A prize attached to an auction, mutated only during settlement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionItem {
    pub id: Uuid,
    pub payload: ItemPayload,
    pub quantity: u32,
    pub is_delivered: bool,
    pub delivered_at: Option<Timestamp>,
}

impl AuctionItem {
    pub fn new(payload: ItemPayload, quantity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            quantity,
            is_delivered: false,
            delivered_at: None,
        }
    }
}

/// A user's subscription to status events for one auction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Watch {
    pub auction_id: AuctionId,
    pub user_id: UserId,
    pub created_at: Timestamp,
}

/// Draft of a prize item inside an [`AuctionSpec`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemDraft {
    pub payload: ItemPayload,
    pub quantity: u32,
}

/// Input for creating an auction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionSpec {
    pub title: String,
    pub description: String,
    pub kind: AuctionKind,
    pub starting_price: Besitos,
    pub reserve_price: Option<Besitos>,
    pub buyout_price: Option<Besitos>,
    pub min_increment: Besitos,
    pub max_increment: Option<Besitos>,
    pub access_rule: AccessRule,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub auto_extend: bool,
    pub extension_window_ms: u64,
    pub items: Vec<ItemDraft>,
    pub created_by: UserId,
}

impl AuctionSpec {
    /// Validates the spec before an auction is created from it.
    ///
    /// # Errors
    /// `InvalidAuctionSpec` describing the first violated rule.
    pub fn validate(&self) -> Result<(), AuctionError> {
        let fail = |msg: &str| Err(AuctionError::InvalidAuctionSpec(msg.to_string()));

        if self.title.trim().is_empty() {
            return fail("title must not be empty");
        }
        if self.items.is_empty() {
            return fail("auction must award at least one item");
        }
        if self.items.iter().any(|i| i.quantity == 0) {
            return fail("item quantity must be positive");
        }
        if self.starting_price == 0 {
            return fail("starting price must be positive");
        }
        if self.min_increment == 0 {
            return fail("minimum increment must be positive");
        }
        if self.ends_at <= self.starts_at {
            return fail("ends_at must be after starts_at");
        }
        if let Some(max) = self.max_increment {
            if max < self.min_increment {
                return fail("maximum increment below minimum increment");
            }
        }
        if let Some(buyout) = self.buyout_price {
            if buyout <= self.starting_price {
                return fail("buyout price must exceed the starting price");
            }
            if matches!(self.kind, AuctionKind::Dutch | AuctionKind::SealedBid) {
                return fail("buyout price is only valid for open ascending auctions");
            }
        }
        if let Some(reserve) = self.reserve_price {
            if reserve < self.starting_price {
                return fail("reserve price below the starting price");
            }
        }
        if self.kind == AuctionKind::Reserve && self.reserve_price.is_none() {
            return fail("reserve auctions require a reserve price");
        }
        if self.auto_extend && self.extension_window_ms == 0 {
            return fail("auto-extend requires a positive extension window");
        }
        Ok(())
    }

    /// Materializes the spec into a `Scheduled` auction.
    pub fn into_auction(self, id: AuctionId, now: Timestamp) -> Auction {
        Auction {
            id,
            title: self.title,
            description: self.description,
            kind: self.kind,
            status: AuctionStatus::Scheduled,
            starting_price: self.starting_price,
            reserve_price: self.reserve_price,
            current_price: self.starting_price,
            buyout_price: self.buyout_price,
            min_increment: self.min_increment,
            max_increment: self.max_increment,
            access_rule: self.access_rule,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            auto_extend: self.auto_extend,
            extension_window_ms: self.extension_window_ms,
            winner_id: None,
            winning_bid_id: None,
            created_by: self.created_by,
            created_at: now,
            paused_at: None,
        }
    }
}

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Attempts per ledger call before giving up.
    pub ledger_retry_attempts: u32,
    /// Base delay for exponential backoff between ledger attempts.
    pub ledger_retry_base_delay_ms: u64,
    /// Attempts per delivery call before parking the auction for the sweep.
    pub delivery_retry_attempts: u32,
    /// How far before `ends_at` the one-shot `EndingSoon` event fires.
    pub ending_soon_window_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ledger_retry_attempts: 3,
            ledger_retry_base_delay_ms: 50,
            delivery_retry_attempts: 3,
            ending_soon_window_ms: 60_000,
        }
    }
}

impl EngineConfig {
    /// Tight timings for tests.
    pub fn for_testing() -> Self {
        Self {
            ledger_retry_attempts: 3,
            ledger_retry_base_delay_ms: 1,
            delivery_retry_attempts: 2,
            ending_soon_window_ms: 5_000,
        }
    }
}
