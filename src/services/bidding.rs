use {
    super::settlement::{self, SettlementOutcome},
    crate::domain::audit::NewAuditEntry,
    crate::domain::auction::{self, BidKind},
    crate::domain::bid::NewBid,
    crate::domain::error::MarketError,
    crate::domain::money::FeePolicy,
    crate::domain::provider::{Notifier, PaymentGateway},
    crate::infra::postgres::{audit_repo, auction_repo, bid_repo, user_repo},
    chrono::Utc,
    sqlx::PgPool,
    std::sync::Arc,
    uuid::Uuid,
};

#[derive(Debug)]
pub enum PlaceBidOutcome {
    /// Bid accepted and now leading the auction.
    Placed { bid_id: Uuid, current_highest: i64 },
    /// The amount met the buy-now price and the auction settled immediately.
    BoughtNow { purchased_slot_id: Uuid },
}

/// Place a bid. The happy path is: pre-flight check against the snapshot,
/// create the payment hold, record the bid, then win the denormalized
/// highest-bid fields with one conditional update. A bid that loses the
/// commit-time race keeps its ledger row and hold (released at settlement)
/// but reports `StaleBid` so the caller can retry with fresh state.
pub async fn place_bid(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    notifier: &Arc<dyn Notifier>,
    fee: FeePolicy,
    auction_id: Uuid,
    bidder_id: Uuid,
    amount: i64,
) -> Result<PlaceBidOutcome, MarketError> {
    let auction = auction_repo::get(pool, auction_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("auction {auction_id}")))?;

    match auction::classify_bid(&auction, amount, Utc::now())? {
        BidKind::BuyNow => {
            // Immediate win is charged at exactly the buy-now price.
            let buy_now = auction.buy_now_price.expect("classified as buy-now");
            let outcome = settlement::close_auction_by_buy_now(
                pool, gateway, notifier, fee, auction_id, bidder_id, buy_now,
            )
            .await?;
            match outcome {
                SettlementOutcome::Settled { purchased_slot_id }
                | SettlementOutcome::AlreadySettled { purchased_slot_id } => {
                    Ok(PlaceBidOutcome::BoughtNow { purchased_slot_id })
                }
                SettlementOutcome::NoBids | SettlementOutcome::AlreadyCancelled => {
                    Err(MarketError::AuctionNotActive)
                }
            }
        }
        BidKind::Regular => {
            let payer = user_repo::get_payer_profile(pool, bidder_id).await?;
            // Hold first: a declined card means no bid row at all.
            let hold_id = gateway.authorize(&payer, amount).await?;
            let bid = NewBid::new(auction_id, bidder_id, amount, hold_id);

            let mut tx = pool.begin().await?;
            bid_repo::insert(&mut tx, &bid).await?;
            auction_repo::bump_bid_counts(&mut tx, auction_id).await?;
            let leads = auction_repo::try_outbid(&mut tx, auction_id, bidder_id, amount).await?;
            let audit = NewAuditEntry::new(
                "bid",
                Some(bid.id),
                if leads { "placed" } else { "placed_outrun" },
                "api",
                serde_json::json!({
                    "auction_id": auction_id,
                    "bidder_id": bidder_id,
                    "amount": amount,
                    "hold_id": bid.hold_id.as_str(),
                }),
            );
            audit_repo::insert_audit_entry(&mut *tx, &audit).await?;
            tx.commit().await?;

            if leads {
                tracing::info!(auction_id = %auction_id, bid_id = %bid.id, amount, "bid leads auction");
                Ok(PlaceBidOutcome::Placed {
                    bid_id: bid.id,
                    current_highest: amount,
                })
            } else {
                // Outrun between snapshot and commit. The hold normally
                // stays and is released with the other losing bids at close,
                // but if the auction went terminal under us settlement has
                // already run its release pass and will never see this hold.
                let auction = auction_repo::get(pool, auction_id)
                    .await?
                    .ok_or_else(|| MarketError::NotFound(format!("auction {auction_id}")))?;
                if auction.status.is_terminal() {
                    if let Err(e) = gateway.cancel(&bid.hold_id).await {
                        tracing::warn!(
                            bid_id = %bid.id,
                            hold_id = %bid.hold_id,
                            error = %e,
                            "failed to release hold for bid that lost to auction close"
                        );
                    }
                    return Err(MarketError::AuctionNotActive);
                }
                let current = auction.current_highest_bid;
                tracing::info!(auction_id = %auction_id, bid_id = %bid.id, amount, current, "bid outrun at commit");
                Err(MarketError::StaleBid { current })
            }
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HighestBid {
    pub amount: i64,
    pub bidder_id: Option<Uuid>,
}

/// Pure read of the auction's denormalized winner fields, the single
/// source of truth for "current highest", maintained by `try_outbid`.
pub async fn highest_bid(pool: &PgPool, auction_id: Uuid) -> Result<HighestBid, MarketError> {
    let auction = auction_repo::get(pool, auction_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("auction {auction_id}")))?;
    Ok(HighestBid {
        amount: auction.current_highest_bid,
        bidder_id: auction.current_winner_id,
    })
}
