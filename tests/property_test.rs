use {
    callbid::domain::{
        auction::{self, Auction, AuctionStatus, BidKind},
        bid::Bid,
        error::MarketError,
        id::HoldId,
        money::{FeePolicy, MoneyAmount},
    },
    chrono::{DateTime, Duration, TimeZone, Utc},
    proptest::prelude::*,
    uuid::Uuid,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn bid(amount: i64, offset_secs: i64) -> Bid {
    Bid {
        id: Uuid::now_v7(),
        auction_id: Uuid::now_v7(),
        bidder_id: Uuid::now_v7(),
        amount,
        auto: false,
        hold_id: HoldId::new("pi_prop").unwrap(),
        created_at: t0() + Duration::seconds(offset_secs),
    }
}

fn open_auction(highest: i64, increment: i64, buy_now: Option<i64>) -> Auction {
    Auction {
        id: Uuid::now_v7(),
        call_slot_id: Uuid::now_v7(),
        status: AuctionStatus::Active,
        start_time: t0(),
        end_time: t0() + Duration::hours(24),
        current_highest_bid: highest,
        current_winner_id: None,
        min_increment: increment,
        buy_now_price: buy_now,
        bid_count: 0,
        unique_bidders: 0,
    }
}

proptest! {
    /// The split never creates or destroys a cent, for any amount and rate.
    #[test]
    fn fee_split_is_exact(amount in 0i64..1_000_000_000_000, bps in 0i64..=10_000) {
        let policy = FeePolicy::new(bps).unwrap();
        let split = policy.split(MoneyAmount::new(amount).unwrap());

        prop_assert_eq!(split.fee.cents() + split.payout.cents(), amount);
        prop_assert!(split.fee.cents() >= 0);
        prop_assert!(split.payout.cents() >= 0);
        // Rounding direction favors the platform by less than one cent.
        prop_assert!(split.fee.cents() * 10_000 >= amount * bps);
        prop_assert!((split.fee.cents() - 1) * 10_000 < amount * bps || split.fee.cents() == 0);
    }

    #[test]
    fn money_subtraction_never_goes_negative(a in 0i64..1_000_000_000, b in 0i64..1_000_000_000) {
        let a = MoneyAmount::new(a).unwrap();
        let b = MoneyAmount::new(b).unwrap();
        match a.checked_sub(b) {
            Some(diff) => prop_assert!(diff.cents() >= 0),
            None => prop_assert!(b > a),
        }
    }

    /// Whatever the ledger looks like, the winner carries its maximum amount.
    #[test]
    fn winner_always_carries_the_maximum(amounts in prop::collection::vec(1i64..1_000_000, 1..20)) {
        let bids: Vec<Bid> = amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| bid(amount, i as i64))
            .collect();
        let winner = auction::pick_winner(&bids).unwrap();
        prop_assert_eq!(winner.amount, *amounts.iter().max().unwrap());
    }

    /// Among equal top bids, the earliest one wins regardless of ledger order.
    #[test]
    fn ties_go_to_the_earliest_bid(
        top in 1i64..1_000_000,
        dupes in 2usize..6,
        lower in prop::collection::vec(0i64..1_000_000, 0..10),
    ) {
        let mut bids: Vec<Bid> = (0..dupes).map(|i| bid(top, i as i64)).collect();
        let earliest = bids[0].id;
        bids.extend(lower.iter().filter(|&&a| a < top).enumerate().map(|(i, &a)| bid(a, 100 + i as i64)));

        let winner = auction::pick_winner(&bids).unwrap();
        prop_assert_eq!(winner.id, earliest);
    }

    /// Pre-flight classification agrees with the increment rule: a bid is
    /// either routed (regular or buy-now) or stale, and the routed regular
    /// ones always clear the floor.
    #[test]
    fn classification_respects_the_increment(
        highest in 0i64..1_000_000,
        increment in 1i64..10_000,
        amount in 0i64..2_000_000,
    ) {
        let auction = open_auction(highest, increment, None);
        match auction::classify_bid(&auction, amount, t0() + Duration::hours(1)) {
            Ok(BidKind::Regular) => prop_assert!(amount >= highest + increment),
            Ok(BidKind::BuyNow) => prop_assert!(false, "no buy-now price configured"),
            Err(MarketError::StaleBid { current }) => {
                prop_assert_eq!(current, highest);
                prop_assert!(amount < highest + increment);
            }
            Err(e) => prop_assert!(false, "unexpected error: {e:?}"),
        }
    }

    /// Any amount at or above buy-now short-circuits, anything else falls
    /// back to the regular rules.
    #[test]
    fn buy_now_threshold_is_sharp(
        highest in 0i64..10_000,
        increment in 1i64..1_000,
        buy_now_gap in 1i64..100_000,
        amount in 0i64..200_000,
    ) {
        let buy_now = highest + buy_now_gap;
        let auction = open_auction(highest, increment, Some(buy_now));
        let kind = auction::classify_bid(&auction, amount, t0() + Duration::hours(1));
        if amount >= buy_now {
            prop_assert_eq!(kind.unwrap(), BidKind::BuyNow);
        } else {
            prop_assert!(!matches!(kind, Ok(BidKind::BuyNow)));
        }
    }

    /// Valid windows always end exactly 24h before the call, after at least
    /// an hour of runway.
    #[test]
    fn auction_window_leads_the_call_by_24h(hours_out in 0i64..200) {
        let now = t0();
        let scheduled = now + Duration::hours(hours_out);
        match auction::auction_window(scheduled, now) {
            Ok((start, end)) => {
                prop_assert_eq!(start, now);
                prop_assert_eq!(end, scheduled - Duration::hours(24));
                prop_assert!(end - now >= Duration::hours(1));
            }
            Err(_) => prop_assert!(hours_out < 25),
        }
    }
}
