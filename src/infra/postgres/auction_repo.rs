use {
    crate::domain::auction::{Auction, AuctionStatus},
    crate::domain::error::MarketError,
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct AuctionRow {
    id: Uuid,
    call_slot_id: Uuid,
    status: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    current_highest_bid: i64,
    current_winner_id: Option<Uuid>,
    min_increment: i64,
    buy_now_price: Option<i64>,
    bid_count: i32,
    unique_bidders: i32,
}

impl TryFrom<AuctionRow> for Auction {
    type Error = MarketError;

    fn try_from(row: AuctionRow) -> Result<Self, Self::Error> {
        Ok(Auction {
            id: row.id,
            call_slot_id: row.call_slot_id,
            status: AuctionStatus::try_from(row.status.as_str())?,
            start_time: row.start_time,
            end_time: row.end_time,
            current_highest_bid: row.current_highest_bid,
            current_winner_id: row.current_winner_id,
            min_increment: row.min_increment,
            buy_now_price: row.buy_now_price,
            bid_count: row.bid_count,
            unique_bidders: row.unique_bidders,
        })
    }
}

const AUCTION_COLUMNS: &str = "id, call_slot_id, status, start_time, end_time, \
     current_highest_bid, current_winner_id, min_increment, buy_now_price, \
     bid_count, unique_bidders";

pub async fn insert(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    auction: &Auction,
) -> Result<(), MarketError> {
    sqlx::query(
        r#"
        INSERT INTO auctions
            (id, call_slot_id, status, start_time, end_time,
             current_highest_bid, current_winner_id, min_increment, buy_now_price)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(auction.id)
    .bind(auction.call_slot_id)
    .bind(auction.status.as_str())
    .bind(auction.start_time)
    .bind(auction.end_time)
    .bind(auction.current_highest_bid)
    .bind(auction.current_winner_id)
    .bind(auction.min_increment)
    .bind(auction.buy_now_price)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn get(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<Auction>, MarketError> {
    let row: Option<AuctionRow> =
        sqlx::query_as(&format!("SELECT {AUCTION_COLUMNS} FROM auctions WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
    row.map(Auction::try_from).transpose()
}

/// The winner CAS: take the denormalized winner fields only if the amount
/// still clears the bar at commit time. One atomic statement: concurrent
/// bidders serialize here, never via in-process locks.
/// Returns false when the bid lost the race (caller reports `StaleBid`).
pub async fn try_outbid(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    auction_id: Uuid,
    bidder_id: Uuid,
    amount: i64,
) -> Result<bool, MarketError> {
    let result = sqlx::query(
        r#"
        UPDATE auctions
        SET current_highest_bid = $3, current_winner_id = $2, updated_at = now()
        WHERE id = $1
          AND status = 'active'
          AND current_highest_bid + min_increment <= $3
        "#,
    )
    .bind(auction_id)
    .bind(bidder_id)
    .bind(amount)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Every accepted bid row (winning or not) counts toward the ledger stats.
pub async fn bump_bid_counts(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    auction_id: Uuid,
) -> Result<(), MarketError> {
    sqlx::query(
        r#"
        UPDATE auctions
        SET bid_count = bid_count + 1,
            unique_bidders = (SELECT COUNT(DISTINCT bidder_id) FROM bids WHERE auction_id = $1),
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(auction_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Terminal transition, guarded so a settled auction is never re-settled.
pub async fn finish(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    auction_id: Uuid,
    status: &AuctionStatus,
) -> Result<bool, MarketError> {
    debug_assert!(status.is_terminal());
    let result = sqlx::query(
        "UPDATE auctions SET status = $2, updated_at = now() WHERE id = $1 AND status = 'active'",
    )
    .bind(auction_id)
    .bind(status.as_str())
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Active auctions whose end time has passed. The reconciliation sweep
/// re-drives `close_auction` for these until they converge.
pub async fn list_expired(
    pool: &sqlx::PgPool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Uuid>, MarketError> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT id FROM auctions WHERE status = 'active' AND end_time <= $1 ORDER BY end_time LIMIT $2",
    )
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}
