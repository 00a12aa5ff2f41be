use {
    crate::domain::audit::NewAuditEntry,
    crate::domain::auction::{self, Auction, AuctionStatus},
    crate::domain::error::MarketError,
    crate::domain::slot::{CallSlot, NewCallSlot},
    crate::infra::postgres::{auction_repo, audit_repo, slot_repo},
    chrono::Utc,
    sqlx::PgPool,
    uuid::Uuid,
};

/// Create a call slot and its auction in one transaction. The auction opens
/// immediately and closes 24h before the call; slots scheduled too soon to
/// leave a usable auction window are rejected up front.
pub async fn create_call_slot(
    pool: &PgPool,
    new: NewCallSlot,
) -> Result<(CallSlot, Auction), MarketError> {
    new.validate()?;
    let now = Utc::now();
    let (start_time, end_time) = auction::auction_window(new.scheduled_start, now)?;

    let slot = CallSlot {
        id: Uuid::now_v7(),
        influencer_id: new.influencer_id,
        title: new.title,
        description: new.description,
        scheduled_start: new.scheduled_start,
        duration_minutes: new.duration_minutes,
        starting_price: new.starting_price,
        min_increment: new.min_increment,
        buy_now_price: new.buy_now_price,
        published: true,
        thumbnail_url: new.thumbnail_url,
    };

    let auction = Auction {
        id: Uuid::now_v7(),
        call_slot_id: slot.id,
        status: AuctionStatus::Active,
        start_time,
        end_time,
        // The floor every first bid has to clear by one increment.
        current_highest_bid: slot.starting_price,
        current_winner_id: None,
        min_increment: slot.min_increment,
        buy_now_price: slot.buy_now_price,
        bid_count: 0,
        unique_bidders: 0,
    };

    let mut tx = pool.begin().await?;
    slot_repo::insert_call_slot(&mut tx, &slot).await?;
    auction_repo::insert(&mut tx, &auction).await?;
    let audit = NewAuditEntry::new(
        "auction",
        Some(auction.id),
        "listed",
        "api",
        serde_json::json!({
            "call_slot_id": slot.id,
            "starting_price": slot.starting_price,
            "end_time": auction.end_time,
        }),
    );
    audit_repo::insert_audit_entry(&mut *tx, &audit).await?;
    tx.commit().await?;

    tracing::info!(auction_id = %auction.id, call_slot_id = %slot.id, "call slot listed");
    Ok((slot, auction))
}
