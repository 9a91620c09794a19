//! Domain events published by the engine.
//!
//! Events carry ids and amounts only; message wording and rendering are
//! the notification consumer's concern.

use serde::{Deserialize, Serialize};

use crate::domain::{AuctionId, AuctionStatus, Besitos, Timestamp, UserId};

/// Topics for auction events.
pub mod topics {
    /// A bid was accepted.
    pub const BID_PLACED: &str = "auction.bid_placed";
    /// The previous winning bidder was displaced.
    pub const OUTBID: &str = "auction.outbid";
    /// The auction enters its ending-soon window (fires once).
    pub const ENDING_SOON: &str = "auction.ending_soon";
    /// The auction reached a terminal ended state.
    pub const ENDED: &str = "auction.ended";
    /// The auction was cancelled by an admin.
    pub const CANCELLED: &str = "auction.cancelled";
}

/// A domain event emitted by the bid arbiter or the lifecycle sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AuctionEvent {
    BidPlaced {
        auction_id: AuctionId,
        bidder: UserId,
        amount: Besitos,
    },
    Outbid {
        auction_id: AuctionId,
        previous_bidder: UserId,
        new_price: Besitos,
    },
    EndingSoon {
        auction_id: AuctionId,
        ends_at: Timestamp,
    },
    Ended {
        auction_id: AuctionId,
        status: AuctionStatus,
        winner: Option<UserId>,
        final_price: Option<Besitos>,
    },
    Cancelled {
        auction_id: AuctionId,
        reason: String,
    },
}

impl AuctionEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            Self::BidPlaced { .. } => topics::BID_PLACED,
            Self::Outbid { .. } => topics::OUTBID,
            Self::EndingSoon { .. } => topics::ENDING_SOON,
            Self::Ended { .. } => topics::ENDED,
            Self::Cancelled { .. } => topics::CANCELLED,
        }
    }

    pub fn auction_id(&self) -> AuctionId {
        match self {
            Self::BidPlaced { auction_id, .. }
            | Self::Outbid { auction_id, .. }
            | Self::EndingSoon { auction_id, .. }
            | Self::Ended { auction_id, .. }
            | Self::Cancelled { auction_id, .. } => *auction_id,
        }
    }
}

/// An event addressed to one recipient, ready for the notification port.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub event: AuctionEvent,
}
