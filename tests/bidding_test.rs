mod common;

use {
    callbid::{
        domain::{error::MarketError, money::FeePolicy, provider::Notifier},
        services::bidding::{self, PlaceBidOutcome},
    },
    common::{FakeGateway, FakeNotifier},
    std::sync::{Arc, atomic::Ordering},
};

fn providers() -> (Arc<FakeGateway>, Arc<dyn Notifier>, FeePolicy) {
    (
        Arc::new(FakeGateway::default()),
        Arc::new(FakeNotifier::default()),
        FeePolicy::default(),
    )
}

#[tokio::test]
async fn first_bid_must_clear_starting_price_plus_increment() {
    let Some(pool) = common::try_pool().await else { return };
    let (gateway, notifier, fee) = providers();
    let fx = common::create_auction(&pool, 1_000, 100, None).await;
    let bidder = common::insert_user(&pool).await;

    // Starting price 1000, increment 100: 1050 is not enough.
    let err = bidding::place_bid(&pool, &*gateway, &notifier, fee, fx.auction_id, bidder, 1_050)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::StaleBid { current: 1_000 }), "got {err:?}");

    // Rejected before any money movement: no ledger row, no hold.
    assert_eq!(common::count_bids(&pool, fx.auction_id).await, 0);
    assert_eq!(gateway.hold_count(), 0);

    let outcome =
        bidding::place_bid(&pool, &*gateway, &notifier, fee, fx.auction_id, bidder, 1_100)
            .await
            .unwrap();
    match outcome {
        PlaceBidOutcome::Placed { current_highest, .. } => assert_eq!(current_highest, 1_100),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(common::count_bids(&pool, fx.auction_id).await, 1);
    assert_eq!(gateway.hold_count(), 1);
}

#[tokio::test]
async fn stale_bid_reports_the_price_to_beat() {
    let Some(pool) = common::try_pool().await else { return };
    let (gateway, notifier, fee) = providers();
    let fx = common::create_auction(&pool, 1_000, 100, None).await;
    let alice = common::insert_user(&pool).await;
    let bob = common::insert_user(&pool).await;

    bidding::place_bid(&pool, &*gateway, &notifier, fee, fx.auction_id, alice, 1_100)
        .await
        .unwrap();

    // Bob's 1150 no longer clears 1100 + 100.
    let err = bidding::place_bid(&pool, &*gateway, &notifier, fee, fx.auction_id, bob, 1_150)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::StaleBid { current: 1_100 }), "got {err:?}");

    bidding::place_bid(&pool, &*gateway, &notifier, fee, fx.auction_id, bob, 1_200)
        .await
        .unwrap();
    let highest = bidding::highest_bid(&pool, fx.auction_id).await.unwrap();
    assert_eq!(highest.amount, 1_200);
    assert_eq!(highest.bidder_id, Some(bob));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bids_settle_on_the_maximum() {
    let Some(pool) = common::try_pool().await else { return };
    let (gateway, notifier, fee) = providers();
    let fx = common::create_auction(&pool, 1_000, 100, None).await;

    let mut bidders = Vec::new();
    for _ in 0..8 {
        bidders.push(common::insert_user(&pool).await);
    }
    let amounts: Vec<i64> = (1..=8).map(|i| 1_000 + i * 100).collect();

    let mut handles = Vec::new();
    for (bidder, amount) in bidders.iter().copied().zip(amounts.iter().copied()) {
        let pool = pool.clone();
        let gateway = Arc::clone(&gateway);
        let notifier = Arc::clone(&notifier);
        let auction_id = fx.auction_id;
        handles.push(tokio::spawn(async move {
            bidding::place_bid(&pool, &*gateway, &notifier, fee, auction_id, bidder, amount).await
        }));
    }
    for handle in handles {
        // Individual bids may lose the race (StaleBid); nothing may fail
        // with a system error.
        match handle.await.unwrap() {
            Ok(_) | Err(MarketError::StaleBid { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    // The 1800 bid clears every possible interleaving, so it must win.
    let highest = bidding::highest_bid(&pool, fx.auction_id).await.unwrap();
    assert_eq!(highest.amount, 1_800);
    assert_eq!(highest.bidder_id, Some(bidders[7]));

    // Every hold the gateway issued has a matching ledger row: bids that
    // were outrun at commit are kept, not deleted.
    assert_eq!(
        common::count_bids(&pool, fx.auction_id).await,
        gateway.hold_count() as i64
    );
}

#[tokio::test]
async fn declined_card_leaves_no_bid_row() {
    let Some(pool) = common::try_pool().await else { return };
    let (gateway, notifier, fee) = providers();
    let fx = common::create_auction(&pool, 1_000, 100, None).await;
    let bidder = common::insert_user(&pool).await;

    gateway.decline_authorize.store(true, Ordering::SeqCst);
    let err = bidding::place_bid(&pool, &*gateway, &notifier, fee, fx.auction_id, bidder, 1_100)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::ProviderDeclined(_)), "got {err:?}");
    assert_eq!(common::count_bids(&pool, fx.auction_id).await, 0);
}

#[tokio::test]
async fn bidder_without_a_card_on_file_is_rejected() {
    let Some(pool) = common::try_pool().await else { return };
    let (gateway, notifier, fee) = providers();
    let fx = common::create_auction(&pool, 1_000, 100, None).await;
    let bidder = common::insert_user_without_card(&pool).await;

    let err = bidding::place_bid(&pool, &*gateway, &notifier, fee, fx.auction_id, bidder, 1_100)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::NoPaymentMethod), "got {err:?}");
    assert_eq!(gateway.hold_count(), 0);
}

#[tokio::test]
async fn bidding_on_a_missing_auction_is_not_found() {
    let Some(pool) = common::try_pool().await else { return };
    let (gateway, notifier, fee) = providers();
    let bidder = common::insert_user(&pool).await;

    let err = bidding::place_bid(
        &pool,
        &*gateway,
        &notifier,
        fee,
        uuid::Uuid::now_v7(),
        bidder,
        1_100,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, MarketError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn bid_at_or_above_buy_now_settles_at_the_buy_now_price() {
    let Some(pool) = common::try_pool().await else { return };
    let (gateway, notifier, fee) = providers();
    let fx = common::create_auction(&pool, 1_000, 100, Some(5_000)).await;
    let bidder = common::insert_user(&pool).await;

    // Overshooting the buy-now price never charges more than it.
    let outcome =
        bidding::place_bid(&pool, &*gateway, &notifier, fee, fx.auction_id, bidder, 6_000)
            .await
            .unwrap();
    let PlaceBidOutcome::BoughtNow { purchased_slot_id } = outcome else {
        panic!("expected immediate win, got {outcome:?}");
    };

    let purchased = common::get_purchased(&pool, fx.auction_id).await.unwrap();
    assert_eq!(purchased.id, purchased_slot_id);
    assert_eq!(purchased.fan_id, bidder);
    assert_eq!(purchased.winning_bid_amount, 5_000);
    assert_eq!(purchased.platform_fee + purchased.influencer_payout, 5_000);
    assert_eq!(common::auction_status(&pool, fx.auction_id).await, "ended");
    assert_eq!(gateway.capture_transitions(), 1);

    // The auction is over; late bids bounce.
    let late = common::insert_user(&pool).await;
    let err = bidding::place_bid(&pool, &*gateway, &notifier, fee, fx.auction_id, late, 2_000)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::AuctionNotActive), "got {err:?}");
}
