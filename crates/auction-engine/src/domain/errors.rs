//! Error types for the auction engine.

use thiserror::Error;

use super::entities::{AuctionId, AuctionStatus, Besitos, HoldId, UserId};

/// Errors surfaced by the engine API.
///
/// Validation errors are terminal for the call and must not be retried by
/// the engine. `LedgerUnavailable` and `DeliveryFailed` are transient: the
/// owning component retries them with bounded backoff before giving up.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuctionError {
    #[error("auction not found: {0}")]
    AuctionNotFound(AuctionId),

    #[error("auction is not open for bidding (status {status:?})")]
    AuctionNotBiddable { status: AuctionStatus },

    #[error("user {user_id} does not satisfy the access rule")]
    AccessDenied { user_id: UserId },

    #[error("user {user_id} is already the highest bidder")]
    AlreadyHighestBidder { user_id: UserId },

    /// Always carries the current price so the caller can retry with a
    /// valid amount without re-fetching the auction.
    #[error(
        "bid of {amount} rejected: current price is {current_price}, \
         acceptable range is [{min_required}, {max_allowed:?}]"
    )]
    BidTooLow {
        amount: Besitos,
        current_price: Besitos,
        min_required: Besitos,
        max_allowed: Option<Besitos>,
    },

    #[error("insufficient funds to hold {required} besitos")]
    InsufficientFunds { required: Besitos },

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("invalid auction spec: {0}")]
    InvalidAuctionSpec(String),

    #[error("invalid lifecycle transition from {from:?}")]
    InvalidTransition { from: AuctionStatus },
}

/// Errors returned by the ledger port.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Besitos,
        available: Besitos,
    },

    #[error("hold not found: {0}")]
    HoldNotFound(HoldId),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Retryable failure from the content delivery port.
///
/// Delivery failures never reverse a captured payment; the items stay
/// undelivered and the sweep retries them.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("content delivery failed: {reason}")]
pub struct DeliveryError {
    pub reason: String,
}

impl DeliveryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bid_too_low_reports_current_price() {
        let err = AuctionError::BidTooLow {
            amount: 140,
            current_price: 150,
            min_required: 160,
            max_allowed: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("140"));
        assert!(msg.contains("150"));
        assert!(msg.contains("160"));
    }

    #[test]
    fn test_ledger_error_display() {
        let err = LedgerError::InsufficientFunds {
            required: 500,
            available: 120,
        };
        assert!(err.to_string().contains("required 500"));
        assert!(err.to_string().contains("available 120"));
    }

    #[test]
    fn test_delivery_error_display() {
        let err = DeliveryError::new("inventory service timed out");
        assert!(err.to_string().contains("inventory service timed out"));
    }
}
