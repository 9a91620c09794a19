//! Inbound (Driving) Port
//!
//! The API that user-facing callers and the external scheduler use to
//! interact with the auction engine. User actions (`place_bid`,
//! `create_auction`, reads, watches) arrive from request handlers;
//! `tick` is the single scheduler entry point; cancel/pause/resume are
//! admin operations.

use async_trait::async_trait;

use crate::domain::{
    AuctionError, AuctionFilter, AuctionId, AuctionSpec, AuctionView, Besitos, BidReceipt,
    TickReport, UserId,
};

/// A bid submission.
///
/// `idempotency_key` is chosen by the client; retrying a submission with
/// the same key returns the original receipt instead of creating a second
/// hold.
#[derive(Clone, Debug)]
pub struct BidRequest {
    pub auction_id: AuctionId,
    pub user_id: UserId,
    pub amount: Besitos,
    pub idempotency_key: String,
    /// Proxy-bidding ceiling: the engine defends this bid by raising it
    /// up to the ceiling when challenged.
    pub auto_bid_ceiling: Option<Besitos>,
}

/// Primary API of the auction engine (Driving Port).
#[async_trait]
pub trait AuctionEngineApi: Send + Sync {
    /// Validates the spec and creates the auction in `Scheduled`,
    /// activating it immediately when `starts_at` has already passed.
    async fn create_auction(&self, spec: AuctionSpec) -> Result<AuctionId, AuctionError>;

    /// Places a bid. See the precondition ladder on the engine
    /// implementation; every rejection carries the current price so the
    /// caller can retry with a valid amount without a re-fetch.
    async fn place_bid(&self, request: BidRequest) -> Result<BidReceipt, AuctionError>;

    /// Read model of one auction.
    async fn get_auction(&self, auction_id: AuctionId) -> Result<AuctionView, AuctionError>;

    /// Active auctions matching the filter, soonest-ending first.
    async fn list_active(&self, filter: &AuctionFilter) -> Vec<AuctionView>;

    /// Scheduler entry point: activates due auctions, fires ending-soon
    /// notifications, ends due auctions, drains parked ledger fixups, and
    /// retries failed deliveries. Safe to call at any frequency.
    async fn tick(&self) -> TickReport;

    /// Admin: cancels a non-terminal auction and releases every
    /// outstanding hold.
    async fn cancel_auction(&self, auction_id: AuctionId, reason: &str)
        -> Result<(), AuctionError>;

    /// Admin: freezes an active auction.
    async fn pause_auction(&self, auction_id: AuctionId) -> Result<(), AuctionError>;

    /// Admin: reopens a paused auction, shifting the deadline by the
    /// paused duration.
    async fn resume_auction(&self, auction_id: AuctionId) -> Result<(), AuctionError>;

    /// Subscribes a user to status events for an auction.
    async fn watch(&self, auction_id: AuctionId, user_id: UserId) -> Result<(), AuctionError>;

    /// Removes a watch subscription.
    async fn unwatch(&self, auction_id: AuctionId, user_id: UserId) -> Result<(), AuctionError>;
}
