//! Domain layer: pure auction state and transitions, no I/O.

pub mod entities;
pub mod errors;
pub mod record;
pub mod services;
pub mod value_objects;

pub use entities::{
    AccessRule, Auction, AuctionId, AuctionItem, AuctionKind, AuctionSpec, AuctionStatus, Besitos,
    Bid, BidId, EngineConfig, HoldId, ItemDraft, ItemPayload, Timestamp, UserId, Watch,
};
pub use errors::{AuctionError, DeliveryError, LedgerError};
pub use record::{AuctionRecord, BidPlan};
pub use value_objects::{
    AuctionFilter, AuctionView, BidReceipt, EndOutcome, LedgerFixup, TickReport,
};
