//! # Auction & Bidding Engine
//!
//! Runs timed, competitive-bidding sales of virtual items paid for with
//! besitos, the internal currency. Owns auction lifecycle, bid
//! acceptance, currency escrow and refund, reserve and buyout semantics,
//! anti-sniping auto-extension, and winner settlement with delivery
//! hand-off.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | At most one winning bid per auction | `domain/record.rs` - `commit_new_winner()` |
//! | `current_price` is non-decreasing | `domain/record.rs` - `plan_bid()` amount ladder |
//! | Refunded bids are immutable | `domain/record.rs` - `mark_refunded()` |
//! | Terminal statuses never change | `domain/record.rs` - `finalize()` / `cancel()` |
//! | `ends_at` never moves backwards | `domain/record.rs` - `maybe_auto_extend()` |
//! | No refund is silently dropped | `service/engine.rs` - fixup queue + `tick()` |
//!
//! ## Concurrency
//!
//! One `Mutex` cell per auction is the serialization point: the
//! read-validate-commit sequence of a bid runs entirely under it, so two
//! bids racing on one auction resolve first-committed-wins and the loser
//! is rejected against the committed price. Auctions never share a lock;
//! bidding on different auctions is fully parallel.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - in-memory ledger/access/delivery, notify emitter   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - AuctionEngineApi trait                     │
//! │  ports/outbound.rs - LedgerPort, AccessPort, delivery, clock    │
//! │  service/engine.rs - AuctionEngine orchestration                │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/entities.rs      - Auction, Bid, AuctionItem, Watch     │
//! │  domain/record.rs        - AuctionRecord state machine          │
//! │  domain/services.rs      - pricing math                         │
//! │  domain/value_objects.rs - BidReceipt, AuctionView, outcomes    │
//! │  domain/errors.rs        - AuctionError taxonomy                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use auction_engine::{
//!     AuctionEngine, AuctionEngineApi, EngineConfig, InMemoryAccess, InMemoryLedger,
//!     NoOpNotificationPort, RecordingDelivery, SystemTimeSource,
//! };
//!
//! let engine = AuctionEngine::new(
//!     Arc::new(InMemoryLedger::new()),
//!     Arc::new(InMemoryAccess::new()),
//!     Arc::new(RecordingDelivery::new()),
//!     Arc::new(NoOpNotificationPort),
//!     Arc::new(SystemTimeSource),
//!     EngineConfig::default(),
//! );
//!
//! let auction_id = engine.create_auction(spec).await?;
//! let receipt = engine.place_bid(request).await?;
//!
//! // driven by an external scheduler
//! engine.tick().await;
//! ```

pub mod adapters;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::{
    InMemoryAccess, InMemoryLedger, NoOpNotificationPort, NotificationPort, PublishError,
    RecordingDelivery, RecordingNotificationPort, WatchNotifier,
};
pub use domain::{
    AccessRule, Auction, AuctionError, AuctionFilter, AuctionId, AuctionItem, AuctionKind,
    AuctionSpec, AuctionStatus, AuctionView, Besitos, Bid, BidId, BidReceipt, DeliveryError,
    EndOutcome, EngineConfig, HoldId, ItemDraft, ItemPayload, LedgerError, TickReport, Timestamp,
    UserId, Watch,
};
pub use events::{AuctionEvent, Notification};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::{
    AccessPort, AuctionEngineApi, BidRequest, ContentDeliveryPort, LedgerPort, SystemTimeSource,
    TimeSource,
};
pub use service::AuctionEngine;
