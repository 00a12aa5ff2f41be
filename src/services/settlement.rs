use {
    crate::domain::audit::NewAuditEntry,
    crate::domain::auction::{self, AuctionStatus},
    crate::domain::bid::{Bid, NewBid},
    crate::domain::error::MarketError,
    crate::domain::id::HoldId,
    crate::domain::money::{FeePolicy, MoneyAmount},
    crate::domain::provider::{Notifier, PaymentGateway},
    crate::infra::postgres::{audit_repo, auction_repo, bid_repo, slot_repo, user_repo},
    chrono::Utc,
    sqlx::PgPool,
    std::sync::Arc,
    uuid::Uuid,
};

#[derive(Debug)]
pub enum SettlementOutcome {
    /// Winner captured, purchased slot created, auction ended.
    Settled { purchased_slot_id: Uuid },
    /// Auction was already ended; converged no-op.
    AlreadySettled { purchased_slot_id: Uuid },
    /// No valid bids; auction cancelled.
    NoBids,
    /// Auction was already cancelled; converged no-op.
    AlreadyCancelled,
}

/// Close an auction and settle money movement. Idempotent: the scheduled
/// sweep, a buy-now, and the call-end webhook can all invoke this for the
/// same auction and converge on one settlement.
pub async fn close_auction(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    notifier: &Arc<dyn Notifier>,
    fee: FeePolicy,
    auction_id: Uuid,
) -> Result<SettlementOutcome, MarketError> {
    settle(pool, gateway, notifier, fee, auction_id, None, "closer").await
}

/// Immediate-win path: validates the buy-now price, reuses the buyer's
/// standing hold at that amount or authorizes a fresh one, then runs the
/// same settlement with the winner forced. Standing bids from other fans
/// still get their holds released.
pub async fn close_auction_by_buy_now(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    notifier: &Arc<dyn Notifier>,
    fee: FeePolicy,
    auction_id: Uuid,
    buyer_id: Uuid,
    amount: i64,
) -> Result<SettlementOutcome, MarketError> {
    let auction = auction_repo::get(pool, auction_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("auction {auction_id}")))?;
    if !auction.is_open(Utc::now()) {
        return Err(MarketError::AuctionNotActive);
    }
    let buy_now = auction
        .buy_now_price
        .ok_or_else(|| MarketError::Validation("auction has no buy-now price".into()))?;
    if amount != buy_now {
        return Err(MarketError::PriceMismatch { expected: buy_now });
    }

    let standing =
        bid_repo::find_by_bidder_and_amount(pool, auction_id, buyer_id, amount).await?;
    let (winning_bid_id, fresh_hold) = match standing {
        Some(bid) => (bid.id, None),
        None => {
            let payer = user_repo::get_payer_profile(pool, buyer_id).await?;
            let hold_id = gateway.authorize(&payer, amount).await?;
            let bid = NewBid::new(auction_id, buyer_id, amount, hold_id);
            let mut tx = pool.begin().await?;
            bid_repo::insert(&mut tx, &bid).await?;
            auction_repo::bump_bid_counts(&mut tx, auction_id).await?;
            tx.commit().await?;
            (bid.id, Some(bid.hold_id))
        }
    };

    let outcome =
        settle(pool, gateway, notifier, fee, auction_id, Some(winning_bid_id), "buy_now").await?;

    // The auction can close between the snapshot check above and settle's
    // advisory lock. A settlement that already ran never saw the hold we
    // just authorized, so on any converged no-op it has to be released
    // here; the buyer only keeps the slot if that settlement was theirs.
    match outcome {
        SettlementOutcome::Settled { .. } => Ok(outcome),
        SettlementOutcome::AlreadySettled { purchased_slot_id } => {
            let buyer_won = slot_repo::get_purchased(pool, purchased_slot_id)
                .await?
                .is_some_and(|slot| slot.fan_id == buyer_id);
            if buyer_won {
                return Ok(outcome);
            }
            release_fresh_hold(gateway, fresh_hold.as_ref()).await;
            Err(MarketError::AuctionNotActive)
        }
        SettlementOutcome::NoBids | SettlementOutcome::AlreadyCancelled => {
            release_fresh_hold(gateway, fresh_hold.as_ref()).await;
            Err(MarketError::AuctionNotActive)
        }
    }
}

async fn release_fresh_hold(gateway: &dyn PaymentGateway, hold: Option<&HoldId>) {
    let Some(hold) = hold else { return };
    if let Err(e) = gateway.cancel(hold).await {
        tracing::warn!(
            hold_id = %hold,
            error = %e,
            "failed to release buy-now hold after losing the close race"
        );
    }
}

async fn settle(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    notifier: &Arc<dyn Notifier>,
    fee: FeePolicy,
    auction_id: Uuid,
    forced_winner: Option<Uuid>,
    actor: &str,
) -> Result<SettlementOutcome, MarketError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;

    // Serialize settlement per auction. Correctness does not depend on this
    // lock (the purchased_slots unique constraint and the idempotent
    // capture do), but it keeps concurrent closers from racing the provider.
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(auction_id.to_string())
        .execute(&mut *tx)
        .await?;

    let auction = auction_repo::get(&mut *tx, auction_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("auction {auction_id}")))?;

    match auction.status {
        AuctionStatus::Ended => {
            let slot = slot_repo::get_purchased_by_auction(&mut *tx, auction_id)
                .await?
                .ok_or_else(|| {
                    MarketError::NotFound(format!("settlement record for auction {auction_id}"))
                })?;
            tx.commit().await?;
            return Ok(SettlementOutcome::AlreadySettled {
                purchased_slot_id: slot.id,
            });
        }
        AuctionStatus::Cancelled => {
            tx.commit().await?;
            return Ok(SettlementOutcome::AlreadyCancelled);
        }
        AuctionStatus::Active => {}
        AuctionStatus::Draft | AuctionStatus::Scheduled => {
            return Err(MarketError::AuctionNotActive);
        }
    }

    let bids = bid_repo::ledger(&mut *tx, auction_id).await?;
    let winner = match forced_winner {
        Some(bid_id) => bids
            .iter()
            .find(|b| b.id == bid_id)
            .ok_or_else(|| MarketError::NotFound(format!("bid {bid_id}")))?,
        None => match auction::pick_winner(&bids) {
            Some(winner) => winner,
            None => {
                auction_repo::finish(&mut tx, auction_id, &AuctionStatus::Cancelled).await?;
                let audit = NewAuditEntry::new(
                    "auction",
                    Some(auction_id),
                    "cancelled_no_bids",
                    actor,
                    serde_json::json!({}),
                );
                audit_repo::insert_audit_entry(&mut *tx, &audit).await?;
                tx.commit().await?;
                tracing::info!(auction_id = %auction_id, "auction closed with no bids");
                return Ok(SettlementOutcome::NoBids);
            }
        },
    };

    // Capture before any terminal write. On failure the transaction rolls
    // back, the auction stays active, and the sweep retries; the slot is
    // never left "ended but unpaid".
    let captured = gateway.capture(&winner.hold_id).await?;
    if captured.already_captured {
        tracing::info!(auction_id = %auction_id, hold_id = %winner.hold_id, "hold was already captured, converging");
    }

    let split = fee.split(MoneyAmount::new(winner.amount)?);
    let call_slot = slot_repo::get_call_slot(&mut *tx, auction.call_slot_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("call slot {}", auction.call_slot_id)))?;

    let purchased = slot_repo::NewPurchasedSlot {
        id: Uuid::now_v7(),
        call_slot_id: call_slot.id,
        auction_id,
        fan_id: winner.bidder_id,
        influencer_id: call_slot.influencer_id,
        winning_bid_amount: winner.amount,
        platform_fee: split.fee.cents(),
        influencer_payout: split.payout.cents(),
    };
    let purchased_slot_id = slot_repo::insert_purchased(&mut tx, &purchased).await?;

    auction_repo::finish(&mut tx, auction_id, &AuctionStatus::Ended).await?;

    let audit = NewAuditEntry::new(
        "auction",
        Some(auction_id),
        "settled",
        actor,
        serde_json::json!({
            "purchased_slot_id": purchased_slot_id,
            "winning_bid_id": winner.id,
            "winning_bid_amount": winner.amount,
            "platform_fee": split.fee.cents(),
            "influencer_payout": split.payout.cents(),
            "captured_amount": captured.captured_amount,
            "already_captured": captured.already_captured,
        }),
    );
    audit_repo::insert_audit_entry(&mut *tx, &audit).await?;
    tx.commit().await?;

    tracing::info!(
        auction_id = %auction_id,
        purchased_slot_id = %purchased_slot_id,
        amount = winner.amount,
        "auction settled"
    );

    // Everything past the commit is best-effort and must never undo a
    // successful capture.
    release_losing_holds(pool, gateway, &bids, winner.id, auction_id).await;
    notify_winner(pool, notifier, winner.bidder_id, purchased_slot_id);

    Ok(SettlementOutcome::Settled { purchased_slot_id })
}

async fn release_losing_holds(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    bids: &[Bid],
    winning_bid_id: Uuid,
    auction_id: Uuid,
) {
    for bid in bids.iter().filter(|b| b.id != winning_bid_id) {
        if let Err(e) = gateway.cancel(&bid.hold_id).await {
            tracing::warn!(
                auction_id = %auction_id,
                bid_id = %bid.id,
                hold_id = %bid.hold_id,
                error = %e,
                "failed to release losing hold"
            );
            let audit = NewAuditEntry::new(
                "bid",
                Some(bid.id),
                "hold_release_failed",
                "settlement",
                serde_json::json!({"hold_id": bid.hold_id.as_str(), "error": e.to_string()}),
            );
            if let Err(e) = audit_repo::insert_audit_entry(pool, &audit).await {
                tracing::error!(error = %e, "failed to audit hold release failure");
            }
        }
    }
}

fn notify_winner(pool: &PgPool, notifier: &Arc<dyn Notifier>, fan_id: Uuid, slot_id: Uuid) {
    let notifier = Arc::clone(notifier);
    let pool = pool.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.auction_won(fan_id, slot_id).await {
            tracing::warn!(fan_id = %fan_id, error = %e, "winner notification failed");
            let audit = NewAuditEntry::new(
                "purchased_slot",
                Some(slot_id),
                "notify_failed",
                "settlement",
                serde_json::json!({"fan_id": fan_id, "error": e.to_string()}),
            );
            if let Err(e) = audit_repo::insert_audit_entry(&pool, &audit).await {
                tracing::error!(error = %e, "failed to audit notification failure");
            }
        }
    });
}
