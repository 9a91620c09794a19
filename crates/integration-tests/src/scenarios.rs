//! End-to-end scenarios over the public engine API.

use std::time::Duration;

use auction_engine::{
    AuctionEngineApi, AuctionError, AuctionEvent, AuctionFilter, AuctionId, AuctionKind,
    AuctionStatus, Besitos, BidRequest, UserId,
};
use futures::future::join_all;
use rand::seq::SliceRandom;

use crate::harness::AuctionHouse;

fn bid(auction_id: AuctionId, user_id: UserId, amount: Besitos, key: &str) -> BidRequest {
    BidRequest {
        auction_id,
        user_id,
        amount,
        idempotency_key: key.to_string(),
        auto_bid_ceiling: None,
    }
}

#[tokio::test]
async fn test_unknown_auction_is_reported_as_not_found() {
    let house = AuctionHouse::start();
    let ghost = uuid::Uuid::new_v4();
    assert_eq!(
        house.engine.place_bid(bid(ghost, 1, 150, "k")).await.unwrap_err(),
        AuctionError::AuctionNotFound(ghost)
    );
    assert!(house.engine.get_auction(ghost).await.is_err());
}

#[tokio::test]
async fn test_full_lifecycle_from_scheduled_to_delivered() {
    let house = AuctionHouse::start();
    house.fund(&[(2, 1_000), (3, 1_000)]).await;

    let mut spec = house.standard_spec();
    spec.starts_at = 10_000; // not yet open
    let id = house.engine.create_auction(spec).await.unwrap();
    house.engine.watch(id, 7).await.unwrap();
    assert_eq!(
        house.engine.get_auction(id).await.unwrap().status,
        AuctionStatus::Scheduled
    );

    // the sweep opens it once the start time passes
    house.clock.set(10_000);
    assert_eq!(house.engine.tick().await.activated, 1);
    assert_eq!(house.engine.list_active(&AuctionFilter::default()).await.len(), 1);

    house.engine.place_bid(bid(id, 2, 150, "b-2")).await.unwrap();
    house.engine.place_bid(bid(id, 3, 200, "b-3")).await.unwrap();

    // ending-soon fires once inside the window
    house.clock.set(96_000);
    assert_eq!(house.engine.tick().await.ending_soon, 1);

    house.clock.set(100_000);
    assert_eq!(house.engine.tick().await.ended, 1);

    let view = house.engine.get_auction(id).await.unwrap();
    assert_eq!(view.status, AuctionStatus::EndedWithWinner);
    assert_eq!(view.winner_id, Some(3));
    assert_eq!(view.current_price, 200);
    assert_eq!(house.delivery.delivered_count(), 1);

    // every besito is accounted for: loser refunded, winner captured
    let (placed, released, captured) = house.ledger.escrow_totals().await;
    assert_eq!((placed, released, captured), (350, 150, 200));
    assert_eq!(house.ledger.balance(2).await, 1_000);
    assert_eq!(house.ledger.balance(3).await, 800);

    // the watcher heard the whole story
    tokio::time::sleep(Duration::from_millis(20)).await;
    let notes = house.notifications.take();
    let to_watcher: Vec<_> = notes.iter().filter(|n| n.recipient == 7).collect();
    assert!(to_watcher
        .iter()
        .any(|n| matches!(n.event, AuctionEvent::BidPlaced { .. })));
    assert!(to_watcher
        .iter()
        .any(|n| matches!(n.event, AuctionEvent::EndingSoon { .. })));
    assert!(to_watcher
        .iter()
        .any(|n| matches!(n.event, AuctionEvent::Ended { winner: Some(3), .. })));

    // watches are dropped at termination
    assert!(matches!(
        house.engine.watch(id, 8).await.unwrap_err(),
        AuctionError::InvalidTransition { .. }
    ));
}

#[tokio::test]
async fn test_racing_bids_resolve_first_committed_wins() {
    let house = AuctionHouse::start();
    house.fund(&[(9, 1_000), (2, 1_000), (3, 1_000)]).await;
    let id = house.engine.create_auction(house.standard_spec()).await.unwrap();
    house.engine.place_bid(bid(id, 9, 150, "seed")).await.unwrap();

    // two bids of 200 race for the same slot
    let engine_a = house.engine.clone();
    let engine_b = house.engine.clone();
    let race_a = tokio::spawn(async move { engine_a.place_bid(bid(id, 2, 200, "race-a")).await });
    let race_b = tokio::spawn(async move { engine_b.place_bid(bid(id, 3, 200, "race-b")).await });
    let results = [race_a.await.unwrap(), race_b.await.unwrap()];

    let accepted: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    let rejected: Vec<_> = results.iter().filter(|r| r.is_err()).collect();
    assert_eq!(accepted.len(), 1);
    assert_eq!(rejected.len(), 1);

    // the loser is told the committed price so it can retry above it
    match rejected[0].as_ref().unwrap_err() {
        AuctionError::BidTooLow {
            current_price,
            min_required,
            ..
        } => {
            assert_eq!(*current_price, 200);
            assert_eq!(*min_required, 210);
        }
        other => panic!("expected BidTooLow, got {other:?}"),
    }

    assert_eq!(house.engine.get_auction(id).await.unwrap().current_price, 200);
}

#[tokio::test]
async fn test_concurrent_bidders_conserve_escrow() {
    let house = AuctionHouse::start();
    let users: Vec<UserId> = (1..=12).collect();
    for &user in &users {
        house.ledger.credit(user, 10_000).await;
    }
    let id = house.engine.create_auction(house.standard_spec()).await.unwrap();

    // distinct amounts submitted in random order, all at once
    let mut offers: Vec<(UserId, Besitos)> = users
        .iter()
        .enumerate()
        .map(|(i, &user)| (user, 110 + 10 * i as Besitos))
        .collect();
    offers.shuffle(&mut rand::thread_rng());

    let tasks = offers.into_iter().map(|(user, amount)| {
        let engine = house.engine.clone();
        let key = format!("{user}-{amount}");
        tokio::spawn(async move { engine.place_bid(bid(id, user, amount, &key)).await })
    });
    join_all(tasks).await;

    // exactly one winner stands, holding exactly the current price
    let view = house.engine.get_auction(id).await.unwrap();
    let (placed, released, captured) = house.ledger.escrow_totals().await;
    assert_eq!(captured, 0);
    assert_eq!(placed - released, view.current_price);

    // after the ending sweep every hold is settled exactly once
    house.clock.set(100_000);
    house.engine.tick().await;
    let (placed, released, captured) = house.ledger.escrow_totals().await;
    assert_eq!(captured, view.current_price);
    assert_eq!(placed, released + captured);

    let total_funds: Besitos = {
        let mut sum = 0;
        for &user in &users {
            sum += house.ledger.balance(user).await + house.ledger.held_total(user).await;
        }
        sum
    };
    assert_eq!(total_funds, 12 * 10_000 - captured);
}

#[tokio::test]
async fn test_repeated_sweeps_do_not_double_settle() {
    let house = AuctionHouse::start();
    house.fund(&[(2, 1_000)]).await;
    let id = house.engine.create_auction(house.standard_spec()).await.unwrap();
    house.engine.place_bid(bid(id, 2, 150, "k")).await.unwrap();

    house.clock.set(100_000);
    assert_eq!(house.engine.tick().await.ended, 1);
    let totals = house.ledger.escrow_totals().await;

    // cron jitter: the sweep fires again on an already-ended auction
    assert_eq!(house.engine.tick().await.ended, 0);
    house.clock.advance(60_000);
    assert_eq!(house.engine.tick().await.ended, 0);

    assert_eq!(house.ledger.escrow_totals().await, totals);
    assert_eq!(house.delivery.delivered_count(), 1);
    assert_eq!(
        house.engine.get_auction(id).await.unwrap().status,
        AuctionStatus::EndedWithWinner
    );
}

#[tokio::test]
async fn test_replayed_submission_races_create_one_hold() {
    let house = AuctionHouse::start();
    house.fund(&[(2, 1_000)]).await;
    let id = house.engine.create_auction(house.standard_spec()).await.unwrap();

    // a flaky client fires the same submission twice, concurrently
    let engine_a = house.engine.clone();
    let engine_b = house.engine.clone();
    let first = tokio::spawn(async move { engine_a.place_bid(bid(id, 2, 150, "dup")).await });
    let second = tokio::spawn(async move { engine_b.place_bid(bid(id, 2, 150, "dup")).await });
    let a = first.await.unwrap().unwrap();
    let b = second.await.unwrap().unwrap();

    assert_eq!(a.bid_id, b.bid_id);
    assert!(a.replayed != b.replayed);
    let (placed, _, _) = house.ledger.escrow_totals().await;
    assert_eq!(placed, 150);
    assert_eq!(house.engine.get_auction(id).await.unwrap().bid_count, 1);
}

#[tokio::test]
async fn test_delivery_outage_recovers_on_later_sweep() {
    let house = AuctionHouse::start();
    house.fund(&[(2, 1_000)]).await;
    let id = house.engine.create_auction(house.standard_spec()).await.unwrap();
    house.engine.place_bid(bid(id, 2, 150, "k")).await.unwrap();

    // outage spans the ending attempt and the same-sweep retry
    house.delivery.fail_next_ops(4);
    house.clock.set(100_000);
    house.engine.tick().await;

    assert_eq!(house.delivery.delivered_count(), 0);
    let (_, _, captured) = house.ledger.escrow_totals().await;
    assert_eq!(captured, 150); // payment stands while delivery lags

    house.engine.tick().await;
    assert_eq!(house.delivery.delivered_count(), 1);
    let (_, _, captured) = house.ledger.escrow_totals().await;
    assert_eq!(captured, 150);
}

#[tokio::test]
async fn test_reserve_not_met_releases_every_besito() {
    let house = AuctionHouse::start();
    house.fund(&[(2, 1_000)]).await;
    let mut spec = house.standard_spec();
    spec.kind = AuctionKind::Reserve;
    spec.reserve_price = Some(1_000);
    let id = house.engine.create_auction(spec).await.unwrap();

    house.engine.place_bid(bid(id, 2, 800, "k")).await.unwrap();
    house.clock.set(100_000);
    house.engine.tick().await;

    assert_eq!(
        house.engine.get_auction(id).await.unwrap().status,
        AuctionStatus::EndedReserveNotMet
    );
    assert_eq!(house.ledger.balance(2).await, 1_000);
    assert_eq!(house.delivery.delivered_count(), 0);
}

#[tokio::test]
async fn test_buyout_closes_against_concurrent_traffic() {
    let house = AuctionHouse::start();
    house.fund(&[(2, 1_000), (3, 1_000), (4, 1_000)]).await;
    let mut spec = house.standard_spec();
    spec.buyout_price = Some(400);
    let id = house.engine.create_auction(spec).await.unwrap();

    // one buyout races two ordinary bids
    let tasks: Vec<_> = [(2u64, 400u64, "buy"), (3, 150, "low"), (4, 200, "mid")]
        .into_iter()
        .map(|(user, amount, key)| {
            let engine = house.engine.clone();
            tokio::spawn(async move { engine.place_bid(bid(id, user, amount, key)).await })
        })
        .collect();
    join_all(tasks).await;

    // whoever interleaved how, the auction is closed with the buyout
    // bidder as winner and no besito is stuck in escrow
    let view = house.engine.get_auction(id).await.unwrap();
    assert_eq!(view.status, AuctionStatus::EndedWithWinner);
    assert_eq!(view.winner_id, Some(2));
    let (placed, released, captured) = house.ledger.escrow_totals().await;
    assert_eq!(captured, 400);
    assert_eq!(placed, released + captured);
}
