use {
    crate::domain::bid::{Bid, NewBid},
    crate::domain::error::MarketError,
    crate::domain::id::HoldId,
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct BidRow {
    id: Uuid,
    auction_id: Uuid,
    bidder_id: Uuid,
    amount: i64,
    auto: bool,
    hold_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BidRow> for Bid {
    type Error = MarketError;

    fn try_from(row: BidRow) -> Result<Self, Self::Error> {
        Ok(Bid {
            id: row.id,
            auction_id: row.auction_id,
            bidder_id: row.bidder_id,
            amount: row.amount,
            auto: row.auto,
            hold_id: HoldId::new(row.hold_id)?,
            created_at: row.created_at,
        })
    }
}

pub async fn insert(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    bid: &NewBid,
) -> Result<(), MarketError> {
    sqlx::query(
        r#"
        INSERT INTO bids (id, auction_id, bidder_id, amount, auto, hold_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(bid.id)
    .bind(bid.auction_id)
    .bind(bid.bidder_id)
    .bind(bid.amount)
    .bind(bid.auto)
    .bind(bid.hold_id.as_str())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// The full ledger for one auction, in winner order: highest amount first,
/// ties broken by earliest placement.
pub async fn ledger(
    executor: impl sqlx::PgExecutor<'_>,
    auction_id: Uuid,
) -> Result<Vec<Bid>, MarketError> {
    let rows: Vec<BidRow> = sqlx::query_as(
        r#"
        SELECT id, auction_id, bidder_id, amount, auto, hold_id, created_at
        FROM bids
        WHERE auction_id = $1
        ORDER BY amount DESC, created_at ASC
        "#,
    )
    .bind(auction_id)
    .fetch_all(executor)
    .await?;
    rows.into_iter().map(Bid::try_from).collect()
}

/// A buyer's standing bid at an exact amount, if any. Buy-now reuses its
/// hold instead of authorizing a second one.
pub async fn find_by_bidder_and_amount(
    executor: impl sqlx::PgExecutor<'_>,
    auction_id: Uuid,
    bidder_id: Uuid,
    amount: i64,
) -> Result<Option<Bid>, MarketError> {
    let row: Option<BidRow> = sqlx::query_as(
        r#"
        SELECT id, auction_id, bidder_id, amount, auto, hold_id, created_at
        FROM bids
        WHERE auction_id = $1 AND bidder_id = $2 AND amount = $3
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    )
    .bind(auction_id)
    .bind(bidder_id)
    .bind(amount)
    .fetch_optional(executor)
    .await?;
    row.map(Bid::try_from).transpose()
}
