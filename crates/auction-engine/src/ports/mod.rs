//! Port traits: the inbound API surface and the outbound dependencies.

pub mod inbound;
pub mod outbound;

pub use inbound::{AuctionEngineApi, BidRequest};
pub use outbound::{
    AccessPort, ContentDeliveryPort, LedgerPort, SystemTimeSource, TimeSource,
};
