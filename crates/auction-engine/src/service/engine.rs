//! # Auction Engine Service
//!
//! Implements [`AuctionEngineApi`] over the domain records and the driven
//! ports.
//!
//! ## Concurrency
//!
//! Every auction lives in its own `Arc<Mutex<AuctionRecord>>` cell inside
//! an outer `RwLock` map. The map is touched only to insert at creation
//! and to resolve an id; all read-validate-commit work on one auction
//! happens with that auction's mutex held. Bids on different auctions
//! never contend.
//!
//! Inside the critical section the only awaited calls are the ledger
//! operations; access eligibility is resolved off-lock. Two bids racing
//! on the same auction serialize at the cell mutex: the loser re-validates
//! against the committed price and gets `BidTooLow` quoting it.
//!
//! ## Failure policy
//!
//! Ledger and delivery calls are retried with bounded exponential backoff.
//! A release or capture that stays down is parked in the record's fixup
//! queue and re-driven by `tick()`; a refund is never silently dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::notifier::{NotificationPort, WatchNotifier};
use crate::domain::{
    AuctionError, AuctionFilter, AuctionId, AuctionItem, AuctionRecord, AuctionSpec, AuctionView,
    Besitos, BidId, BidPlan, BidReceipt, EndOutcome, EngineConfig, HoldId, LedgerError, LedgerFixup,
    TickReport, Timestamp, UserId,
};
use crate::events::AuctionEvent;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::ports::inbound::{AuctionEngineApi, BidRequest};
use crate::ports::outbound::{AccessPort, ContentDeliveryPort, LedgerPort, TimeSource};

type Cell = Arc<Mutex<AuctionRecord>>;

/// The auction engine.
///
/// Generic over the driven ports so deployments and tests can swap the
/// ledger, access oracle, and delivery backends.
pub struct AuctionEngine<L, A, D> {
    config: EngineConfig,
    ledger: Arc<L>,
    access: Arc<A>,
    delivery: Arc<D>,
    notifier: WatchNotifier,
    clock: Arc<dyn TimeSource>,
    cells: RwLock<HashMap<AuctionId, Cell>>,
    metrics: Arc<Metrics>,
}

impl<L, A, D> AuctionEngine<L, A, D>
where
    L: LedgerPort,
    A: AccessPort,
    D: ContentDeliveryPort,
{
    /// Creates the engine and spawns its notification drain task.
    pub fn new(
        ledger: Arc<L>,
        access: Arc<A>,
        delivery: Arc<D>,
        notifications: Arc<dyn NotificationPort>,
        clock: Arc<dyn TimeSource>,
        config: EngineConfig,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        let notifier = WatchNotifier::spawn(notifications, metrics.clone());
        Self {
            config,
            ledger,
            access,
            delivery,
            notifier,
            clock,
            cells: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn cell(&self, auction_id: AuctionId) -> Result<Cell, AuctionError> {
        self.cells
            .read()
            .await
            .get(&auction_id)
            .cloned()
            .ok_or(AuctionError::AuctionNotFound(auction_id))
    }

    /// Ends one auction now: decides the outcome, settles escrow, and
    /// delivers. Idempotent; repeated calls on a terminal auction return
    /// `None`. Invoked by the sweep and by the buyout short-circuit.
    pub async fn end_auction(
        &self,
        auction_id: AuctionId,
    ) -> Result<Option<EndOutcome>, AuctionError> {
        let cell = self.cell(auction_id).await?;
        let mut rec = cell.lock().await;
        let now = self.clock.now();
        Ok(self.finish_locked(&mut rec, now).await)
    }

    /// Manually re-attempts a failed delivery. Only the item hand-off is
    /// re-driven; the captured payment is untouched.
    ///
    /// # Errors
    /// - `InvalidTransition` when the auction has no delivery pending
    /// - `DeliveryFailed` when the retry exhausts its budget again
    pub async fn retry_delivery(&self, auction_id: AuctionId) -> Result<(), AuctionError> {
        let cell = self.cell(auction_id).await?;
        let mut rec = cell.lock().await;
        if !rec.delivery_pending() {
            return Err(AuctionError::InvalidTransition {
                from: rec.auction().status,
            });
        }
        let winner_id = rec.auction().winner_id.ok_or(AuctionError::InvalidTransition {
            from: rec.auction().status,
        })?;
        self.deliver_items(&mut rec, winner_id).await;
        if rec.delivery_pending() {
            return Err(AuctionError::DeliveryFailed(format!(
                "items for auction {auction_id} still undelivered"
            )));
        }
        Ok(())
    }

    // =========================================================================
    // LEDGER CALLS WITH BOUNDED BACKOFF
    // =========================================================================

    async fn hold_with_retry(
        &self,
        user_id: UserId,
        amount: Besitos,
        reference: AuctionId,
    ) -> Result<HoldId, AuctionError> {
        let mut delay = Duration::from_millis(self.config.ledger_retry_base_delay_ms);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.ledger.hold(user_id, amount, reference).await {
                Ok(hold_id) => {
                    self.metrics.record_hold_placed();
                    return Ok(hold_id);
                }
                Err(LedgerError::InsufficientFunds { required, .. }) => {
                    return Err(AuctionError::InsufficientFunds { required });
                }
                Err(LedgerError::HoldNotFound(h)) => {
                    return Err(AuctionError::LedgerUnavailable(format!(
                        "unexpected hold state for {h}"
                    )));
                }
                Err(LedgerError::Unavailable(reason)) => {
                    if attempt >= self.config.ledger_retry_attempts {
                        warn!(user_id, amount, %reason, "hold failed after {attempt} attempts");
                        return Err(AuctionError::LedgerUnavailable(reason));
                    }
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    /// A missing hold counts as already settled, so a replayed fixup
    /// cannot fail forever.
    async fn release_with_retry(&self, hold_id: HoldId) -> Result<(), AuctionError> {
        let mut delay = Duration::from_millis(self.config.ledger_retry_base_delay_ms);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.ledger.release(hold_id).await {
                Ok(()) => {
                    self.metrics.record_hold_released();
                    return Ok(());
                }
                Err(LedgerError::HoldNotFound(_)) => {
                    debug!(%hold_id, "release of settled hold skipped");
                    return Ok(());
                }
                Err(LedgerError::InsufficientFunds { .. }) | Err(LedgerError::Unavailable(_))
                    if attempt < self.config.ledger_retry_attempts =>
                {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    warn!(%hold_id, error = %e, "release failed after {attempt} attempts");
                    return Err(AuctionError::LedgerUnavailable(e.to_string()));
                }
            }
        }
    }

    async fn capture_with_retry(&self, hold_id: HoldId) -> Result<(), AuctionError> {
        let mut delay = Duration::from_millis(self.config.ledger_retry_base_delay_ms);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.ledger.capture(hold_id).await {
                Ok(()) => {
                    self.metrics.record_hold_captured();
                    return Ok(());
                }
                Err(LedgerError::HoldNotFound(_)) => {
                    debug!(%hold_id, "capture of settled hold skipped");
                    return Ok(());
                }
                Err(e) if attempt < self.config.ledger_retry_attempts => {
                    debug!(%hold_id, error = %e, "capture retry");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    warn!(%hold_id, error = %e, "capture failed after {attempt} attempts");
                    return Err(AuctionError::LedgerUnavailable(e.to_string()));
                }
            }
        }
    }

    /// Releases a hold, parking a fixup for the sweep when the ledger
    /// stays down.
    async fn release_or_park(&self, rec: &mut AuctionRecord, bid_id: BidId, hold_id: HoldId) {
        match self.release_with_retry(hold_id).await {
            Ok(()) => rec.mark_refunded(bid_id),
            Err(_) => {
                rec.push_fixup(LedgerFixup::Release { bid_id, hold_id });
                self.metrics.record_fixup_parked();
            }
        }
    }

    /// Captures the winner's hold, parking a fixup when the ledger stays
    /// down.
    async fn capture_or_park(&self, rec: &mut AuctionRecord, bid_id: BidId, hold_id: HoldId) {
        match self.capture_with_retry(hold_id).await {
            Ok(()) => rec.mark_captured(bid_id),
            Err(_) => {
                rec.push_fixup(LedgerFixup::Capture { bid_id, hold_id });
                self.metrics.record_fixup_parked();
            }
        }
    }

    // =========================================================================
    // BID ACCEPTANCE
    // =========================================================================

    /// Escrows and commits a bid that becomes the new winner; releases
    /// the displaced hold and notifies the displaced bidder.
    async fn accept_new_winner(
        &self,
        rec: &mut AuctionRecord,
        request: &BidRequest,
        now: Timestamp,
        ends_immediately: bool,
    ) -> Result<BidReceipt, AuctionError> {
        let hold_id = self
            .hold_with_retry(request.user_id, request.amount, request.auction_id)
            .await?;

        let (bid_id, displaced) = rec.commit_new_winner(
            request.user_id,
            request.amount,
            request.auto_bid_ceiling,
            hold_id,
            now,
        );
        self.metrics.record_bid_accepted();

        if let Some((displaced_bid, displaced_hold)) = displaced {
            let previous_bidder = rec
                .bids()
                .iter()
                .find(|b| b.id == displaced_bid)
                .map(|b| b.user_id);
            self.release_or_park(rec, displaced_bid, displaced_hold).await;
            if let Some(prev) = previous_bidder {
                if prev != request.user_id {
                    self.notifier.notify(
                        prev,
                        AuctionEvent::Outbid {
                            auction_id: request.auction_id,
                            previous_bidder: prev,
                            new_price: rec.view().current_price,
                        },
                    );
                }
            }
        }

        if let Some(new_ends) = rec.maybe_auto_extend(now) {
            debug!(auction_id = %request.auction_id, new_ends, "deadline auto-extended");
        }

        // Watchers see the concealed price on sealed auctions.
        let event = AuctionEvent::BidPlaced {
            auction_id: request.auction_id,
            bidder: request.user_id,
            amount: rec.view().current_price,
        };
        self.notifier.fan_out(&rec.watchers(), &event);

        if ends_immediately {
            info!(auction_id = %request.auction_id, "buyout reached, ending auction");
            self.finish_locked(rec, now).await;
        }

        let is_winning = rec
            .bids()
            .iter()
            .find(|b| b.id == bid_id)
            .is_some_and(|b| b.is_winning);
        Ok(BidReceipt {
            bid_id,
            auction_id: request.auction_id,
            accepted: true,
            current_price: rec.view().current_price,
            is_winning,
            replayed: false,
        })
    }

    /// The standing proxy bid absorbs the challenge: fresh hold at the
    /// raised amount, old hold released, challenger recorded as losing.
    /// Falls back to normal displacement when the proxy wallet cannot
    /// fund the raise.
    async fn accept_proxy_raise(
        &self,
        rec: &mut AuctionRecord,
        request: &BidRequest,
        now: Timestamp,
        winner_bid: BidId,
        winner_user: UserId,
        raise_to: Besitos,
    ) -> Result<BidReceipt, AuctionError> {
        let standing = rec.winning_bid().map(|w| w.amount).unwrap_or_default();
        let new_hold = if raise_to > standing {
            match self
                .hold_with_retry(winner_user, raise_to, request.auction_id)
                .await
            {
                Ok(h) => Some(h),
                Err(AuctionError::InsufficientFunds { .. }) => {
                    // The defender is out of funds; the challenger takes
                    // the lead through the normal displacement path.
                    debug!(auction_id = %request.auction_id, winner_user,
                        "proxy raise unfunded, challenger displaces");
                    let ends_immediately = rec
                        .auction()
                        .buyout_price
                        .is_some_and(|b| request.amount >= b);
                    return self
                        .accept_new_winner(rec, request, now, ends_immediately)
                        .await;
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        let (challenger_bid, released) = rec.commit_proxy_raise(
            winner_bid,
            raise_to,
            new_hold,
            request.user_id,
            request.amount,
            now,
        );
        self.metrics.record_proxy_raise();
        self.metrics.record_bid_accepted();
        if let Some(old_hold) = released {
            // The winning bid stays live on its fresh hold; only the old
            // hold is returned. `mark_refunded` skips winning bids, so a
            // parked fixup cannot corrupt the swap either.
            if self.release_with_retry(old_hold).await.is_err() {
                rec.push_fixup(LedgerFixup::Release {
                    bid_id: winner_bid,
                    hold_id: old_hold,
                });
                self.metrics.record_fixup_parked();
            }
        }
        rec.maybe_auto_extend(now);

        let event = AuctionEvent::BidPlaced {
            auction_id: request.auction_id,
            bidder: winner_user,
            amount: rec.view().current_price,
        };
        self.notifier.fan_out(&rec.watchers(), &event);

        Ok(BidReceipt {
            bid_id: challenger_bid,
            auction_id: request.auction_id,
            accepted: true,
            current_price: rec.view().current_price,
            is_winning: false,
            replayed: false,
        })
    }

    // =========================================================================
    // ENDING & SETTLEMENT
    // =========================================================================

    /// Finalizes a record already under its cell lock: terminal status,
    /// escrow settlement, delivery, notifications, watch cleanup.
    async fn finish_locked(
        &self,
        rec: &mut AuctionRecord,
        now: Timestamp,
    ) -> Option<EndOutcome> {
        let outcome = rec.finalize(now)?;
        self.metrics.record_auction_ended();

        match outcome {
            EndOutcome::NoBids => {}
            EndOutcome::ReserveNotMet { highest } => {
                debug!(auction_id = %rec.auction().id, highest, "reserve not met");
                for (bid_id, hold_id) in rec.outstanding_holds() {
                    self.release_or_park(rec, bid_id, hold_id).await;
                }
            }
            EndOutcome::Winner {
                user_id, bid_id, ..
            } => {
                // Capture the winner first; payment finality does not wait
                // for refunds or delivery.
                if let Some(hold_id) = rec
                    .bids()
                    .iter()
                    .find(|b| b.id == bid_id)
                    .and_then(|b| b.hold_id)
                {
                    self.capture_or_park(rec, bid_id, hold_id).await;
                }
                for (other_bid, hold_id) in rec.outstanding_holds() {
                    if other_bid != bid_id {
                        self.release_or_park(rec, other_bid, hold_id).await;
                    }
                }
                self.deliver_items(rec, user_id).await;
            }
        }

        let auction = rec.auction();
        let final_price = match &outcome {
            EndOutcome::Winner { amount, .. } => Some(*amount),
            _ => None,
        };
        let event = AuctionEvent::Ended {
            auction_id: auction.id,
            status: auction.status,
            winner: auction.winner_id,
            final_price,
        };
        let mut recipients = rec.watchers();
        if let Some(winner) = rec.auction().winner_id {
            recipients.push(winner);
        }
        self.notifier.fan_out(&recipients, &event);
        rec.clear_watches();

        info!(auction_id = %rec.auction().id, status = ?rec.auction().status, "auction ended");
        Some(outcome)
    }

    /// Hands the prize items to the delivery port with bounded retry.
    /// Exhausted retries leave the items undelivered for the sweep;
    /// the captured payment stands either way.
    async fn deliver_items(&self, rec: &mut AuctionRecord, winner_id: UserId) {
        let auction_id = rec.auction().id;
        let items: Vec<AuctionItem> = rec.items().to_vec();
        let mut delay = Duration::from_millis(self.config.ledger_retry_base_delay_ms);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.delivery.deliver(auction_id, winner_id, &items).await {
                Ok(()) => {
                    rec.mark_delivered(self.clock.now());
                    self.metrics.record_delivery_completed();
                    return;
                }
                Err(e) if attempt < self.config.delivery_retry_attempts => {
                    debug!(%auction_id, error = %e, "delivery retry");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    warn!(%auction_id, winner_id, error = %e, "delivery parked for next sweep");
                    rec.set_delivery_failed();
                    self.metrics.record_delivery_failed();
                    return;
                }
            }
        }
    }

    /// Re-drives ledger operations parked after retry exhaustion.
    async fn drain_fixups(&self, rec: &mut AuctionRecord) -> usize {
        let mut drained = 0;
        for fixup in rec.take_fixups() {
            match fixup {
                LedgerFixup::Release { bid_id, hold_id } => {
                    match self.release_with_retry(hold_id).await {
                        Ok(()) => {
                            rec.mark_refunded(bid_id);
                            self.metrics.record_fixup_drained();
                            drained += 1;
                        }
                        Err(_) => rec.push_fixup(fixup),
                    }
                }
                LedgerFixup::Capture { bid_id, hold_id } => {
                    match self.capture_with_retry(hold_id).await {
                        Ok(()) => {
                            rec.mark_captured(bid_id);
                            self.metrics.record_fixup_drained();
                            drained += 1;
                        }
                        Err(_) => rec.push_fixup(fixup),
                    }
                }
            }
        }
        drained
    }
}

#[async_trait]
impl<L, A, D> AuctionEngineApi for AuctionEngine<L, A, D>
where
    L: LedgerPort + 'static,
    A: AccessPort + 'static,
    D: ContentDeliveryPort + 'static,
{
    #[instrument(skip(self, spec), fields(title = %spec.title))]
    async fn create_auction(&self, spec: AuctionSpec) -> Result<AuctionId, AuctionError> {
        spec.validate()?;
        let now = self.clock.now();
        let auction_id = Uuid::new_v4();
        let items: Vec<AuctionItem> = spec
            .items
            .iter()
            .map(|draft| AuctionItem::new(draft.payload.clone(), draft.quantity))
            .collect();
        let mut record = AuctionRecord::new(spec.into_auction(auction_id, now), items);
        if record.activate(now) {
            self.metrics.record_auction_activated();
        }
        self.cells
            .write()
            .await
            .insert(auction_id, Arc::new(Mutex::new(record)));
        self.metrics.record_auction_created();
        info!(%auction_id, "auction created");
        Ok(auction_id)
    }

    #[instrument(
        skip(self, request),
        fields(
            auction_id = %request.auction_id,
            user_id = request.user_id,
            amount = request.amount,
        )
    )]
    async fn place_bid(&self, request: BidRequest) -> Result<BidReceipt, AuctionError> {
        let cell = self.cell(request.auction_id).await?;

        // Replay fast path and eligibility run off-lock; inside the
        // critical section the only awaited calls are ledger operations.
        let rule = {
            let rec = cell.lock().await;
            if let Some(receipt) = rec.replay(&request.idempotency_key) {
                self.metrics.record_bid_replayed();
                return Ok(receipt);
            }
            if let Err(e) = rec.ensure_biddable(self.clock.now()) {
                self.metrics.record_bid_rejected();
                return Err(e);
            }
            rec.auction().access_rule.clone()
        };
        if !self.access.check_eligibility(request.user_id, &rule).await {
            self.metrics.record_bid_rejected();
            return Err(AuctionError::AccessDenied {
                user_id: request.user_id,
            });
        }

        let mut rec = cell.lock().await;
        let result = async {
            // Re-validate under the lock: another bid may have committed
            // between the pre-check and here.
            if let Some(receipt) = rec.replay(&request.idempotency_key) {
                self.metrics.record_bid_replayed();
                return Ok(receipt);
            }
            let now = self.clock.now();
            rec.ensure_biddable(now)?;
            if !rec.participant_allowed(request.user_id) {
                return Err(AuctionError::AccessDenied {
                    user_id: request.user_id,
                });
            }

            let receipt = match rec.plan_bid(request.user_id, request.amount, now)? {
                BidPlan::NewWinner {
                    ends_immediately, ..
                } => {
                    self.accept_new_winner(&mut rec, &request, now, ends_immediately)
                        .await?
                }
                BidPlan::SealedLoser => {
                    let bid_id = rec.commit_sealed_loser(request.user_id, request.amount, now);
                    self.metrics.record_bid_accepted();
                    BidReceipt {
                        bid_id,
                        auction_id: request.auction_id,
                        accepted: true,
                        current_price: rec.view().current_price,
                        is_winning: false,
                        replayed: false,
                    }
                }
                BidPlan::ProxyRaise {
                    winner_bid,
                    winner_user,
                    raise_to,
                } => {
                    self.accept_proxy_raise(
                        &mut rec,
                        &request,
                        now,
                        winner_bid,
                        winner_user,
                        raise_to,
                    )
                    .await?
                }
            };
            rec.remember_replay(request.idempotency_key.clone(), receipt.clone());
            Ok(receipt)
        }
        .await;

        if result.is_err() {
            self.metrics.record_bid_rejected();
        }
        result
    }

    async fn get_auction(&self, auction_id: AuctionId) -> Result<AuctionView, AuctionError> {
        let cell = self.cell(auction_id).await?;
        let rec = cell.lock().await;
        Ok(rec.view())
    }

    async fn list_active(&self, filter: &AuctionFilter) -> Vec<AuctionView> {
        let cells: Vec<Cell> = self.cells.read().await.values().cloned().collect();
        let mut views = Vec::new();
        for cell in cells {
            let rec = cell.lock().await;
            let view = rec.view();
            if view.status == crate::domain::AuctionStatus::Active && filter.matches(&view) {
                views.push(view);
            }
        }
        views.sort_by_key(|v| v.ends_at);
        views
    }

    #[instrument(skip(self))]
    async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        let cells: Vec<Cell> = self.cells.read().await.values().cloned().collect();
        for cell in cells {
            let mut rec = cell.lock().await;
            let now = self.clock.now();

            if rec.activate(now) {
                self.metrics.record_auction_activated();
                report.activated += 1;
            }
            if rec.due_to_end(now) && self.finish_locked(&mut rec, now).await.is_some() {
                report.ended += 1;
            }
            if rec.due_for_ending_soon(now, self.config.ending_soon_window_ms) {
                let event = AuctionEvent::EndingSoon {
                    auction_id: rec.auction().id,
                    ends_at: rec.auction().ends_at,
                };
                self.notifier.fan_out(&rec.watchers(), &event);
                report.ending_soon += 1;
            }
            if rec.has_fixups() {
                report.fixups_drained += self.drain_fixups(&mut rec).await;
            }
            if rec.delivery_pending() {
                if let Some(winner_id) = rec.auction().winner_id {
                    self.deliver_items(&mut rec, winner_id).await;
                    report.deliveries_retried += 1;
                }
            }
        }
        debug!(?report, "sweep complete");
        report
    }

    #[instrument(skip(self), fields(auction_id = %auction_id))]
    async fn cancel_auction(
        &self,
        auction_id: AuctionId,
        reason: &str,
    ) -> Result<(), AuctionError> {
        let cell = self.cell(auction_id).await?;
        let mut rec = cell.lock().await;
        let holds = rec.cancel()?;
        self.metrics.record_auction_cancelled();
        for (bid_id, hold_id) in holds {
            self.release_or_park(&mut rec, bid_id, hold_id).await;
        }

        let mut recipients = rec.watchers();
        recipients.extend(rec.bids().iter().map(|b| b.user_id));
        self.notifier.fan_out(
            &recipients,
            &AuctionEvent::Cancelled {
                auction_id,
                reason: reason.to_string(),
            },
        );
        rec.clear_watches();
        info!(%auction_id, reason, "auction cancelled");
        Ok(())
    }

    async fn pause_auction(&self, auction_id: AuctionId) -> Result<(), AuctionError> {
        let cell = self.cell(auction_id).await?;
        let mut rec = cell.lock().await;
        rec.pause(self.clock.now())
    }

    async fn resume_auction(&self, auction_id: AuctionId) -> Result<(), AuctionError> {
        let cell = self.cell(auction_id).await?;
        let mut rec = cell.lock().await;
        rec.resume(self.clock.now())
    }

    async fn watch(&self, auction_id: AuctionId, user_id: UserId) -> Result<(), AuctionError> {
        let cell = self.cell(auction_id).await?;
        let mut rec = cell.lock().await;
        if rec.auction().status.is_terminal() {
            return Err(AuctionError::InvalidTransition {
                from: rec.auction().status,
            });
        }
        rec.add_watch(user_id, self.clock.now());
        Ok(())
    }

    async fn unwatch(&self, auction_id: AuctionId, user_id: UserId) -> Result<(), AuctionError> {
        let cell = self.cell(auction_id).await?;
        let mut rec = cell.lock().await;
        rec.remove_watch(user_id);
        Ok(())
    }
}
