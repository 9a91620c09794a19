//! Shared harness: an engine wired to in-memory collaborators with a
//! deterministic clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use auction_engine::{
    AccessRule, AuctionEngine, AuctionKind, AuctionSpec, Besitos, EngineConfig, InMemoryAccess,
    InMemoryLedger, ItemDraft, ItemPayload, RecordingDelivery, RecordingNotificationPort,
    TimeSource, Timestamp, UserId,
};

/// Deterministic clock the scenarios move by hand.
#[derive(Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            now_ms: AtomicU64::new(initial),
        }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.now_ms.store(timestamp, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// A fully wired auction house over in-memory ports.
pub struct AuctionHouse {
    pub engine: Arc<AuctionEngine<InMemoryLedger, InMemoryAccess, RecordingDelivery>>,
    pub ledger: Arc<InMemoryLedger>,
    pub delivery: Arc<RecordingDelivery>,
    pub notifications: Arc<RecordingNotificationPort>,
    pub clock: Arc<ManualClock>,
}

impl AuctionHouse {
    /// Starts the house with the clock inside the standard bidding window.
    pub fn start() -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let delivery = Arc::new(RecordingDelivery::new());
        let notifications = Arc::new(RecordingNotificationPort::new());
        let clock = Arc::new(ManualClock::new(5_000));
        let engine = Arc::new(AuctionEngine::new(
            ledger.clone(),
            Arc::new(InMemoryAccess::new()),
            delivery.clone(),
            notifications.clone(),
            clock.clone(),
            EngineConfig::for_testing(),
        ));
        Self {
            engine,
            ledger,
            delivery,
            notifications,
            clock,
        }
    }

    /// An open ascending auction: start 100, increment 10, window
    /// [1_000, 100_000).
    pub fn standard_spec(&self) -> AuctionSpec {
        AuctionSpec {
            title: "Cofre del tesoro".to_string(),
            description: "Contenido sorpresa".to_string(),
            kind: AuctionKind::Normal,
            starting_price: 100,
            reserve_price: None,
            buyout_price: None,
            min_increment: 10,
            max_increment: None,
            access_rule: AccessRule::default(),
            starts_at: 1_000,
            ends_at: 100_000,
            auto_extend: false,
            extension_window_ms: 0,
            items: vec![ItemDraft {
                payload: ItemPayload::CurrencyPack { amount: 250 },
                quantity: 1,
            }],
            created_by: 1,
        }
    }

    /// Credits each user with the given balance.
    pub async fn fund(&self, accounts: &[(UserId, Besitos)]) {
        for &(user_id, amount) in accounts {
            self.ledger.credit(user_id, amount).await;
        }
    }
}
