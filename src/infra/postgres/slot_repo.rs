use {
    crate::domain::error::MarketError,
    crate::domain::slot::{CallSlot, CallStatus, ParticipantRole, PurchasedSlot},
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

pub async fn insert_call_slot(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    slot: &CallSlot,
) -> Result<(), MarketError> {
    sqlx::query(
        r#"
        INSERT INTO call_slots
            (id, influencer_id, title, description, scheduled_start, duration_minutes,
             starting_price, min_increment, buy_now_price, published, thumbnail_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(slot.id)
    .bind(slot.influencer_id)
    .bind(&slot.title)
    .bind(&slot.description)
    .bind(slot.scheduled_start)
    .bind(slot.duration_minutes)
    .bind(slot.starting_price)
    .bind(slot.min_increment)
    .bind(slot.buy_now_price)
    .bind(slot.published)
    .bind(&slot.thumbnail_url)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct CallSlotRow {
    id: Uuid,
    influencer_id: Uuid,
    title: String,
    description: String,
    scheduled_start: DateTime<Utc>,
    duration_minutes: i32,
    starting_price: i64,
    min_increment: i64,
    buy_now_price: Option<i64>,
    published: bool,
    thumbnail_url: Option<String>,
}

pub async fn get_call_slot(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<CallSlot>, MarketError> {
    let row: Option<CallSlotRow> = sqlx::query_as(
        r#"
        SELECT id, influencer_id, title, description, scheduled_start, duration_minutes,
               starting_price, min_increment, buy_now_price, published, thumbnail_url
        FROM call_slots
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(|r| CallSlot {
        id: r.id,
        influencer_id: r.influencer_id,
        title: r.title,
        description: r.description,
        scheduled_start: r.scheduled_start,
        duration_minutes: r.duration_minutes,
        starting_price: r.starting_price,
        min_increment: r.min_increment,
        buy_now_price: r.buy_now_price,
        published: r.published,
        thumbnail_url: r.thumbnail_url,
    }))
}

pub struct NewPurchasedSlot {
    pub id: Uuid,
    pub call_slot_id: Uuid,
    pub auction_id: Uuid,
    pub fan_id: Uuid,
    pub influencer_id: Uuid,
    pub winning_bid_amount: i64,
    pub platform_fee: i64,
    pub influencer_payout: i64,
}

/// Insert the settlement record. The UNIQUE constraint on auction_id makes
/// this the single-settlement guard: a concurrent settle loses the insert
/// and reads back the row the winner wrote. Returns the surviving id.
pub async fn insert_purchased(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    slot: &NewPurchasedSlot,
) -> Result<Uuid, MarketError> {
    let inserted: Option<Uuid> = sqlx::query_scalar(
        r#"
        INSERT INTO purchased_slots
            (id, call_slot_id, auction_id, fan_id, influencer_id,
             winning_bid_amount, platform_fee, influencer_payout)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (auction_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(slot.id)
    .bind(slot.call_slot_id)
    .bind(slot.auction_id)
    .bind(slot.fan_id)
    .bind(slot.influencer_id)
    .bind(slot.winning_bid_amount)
    .bind(slot.platform_fee)
    .bind(slot.influencer_payout)
    .fetch_optional(&mut **tx)
    .await?;

    match inserted {
        Some(id) => Ok(id),
        None => {
            let existing: Uuid =
                sqlx::query_scalar("SELECT id FROM purchased_slots WHERE auction_id = $1")
                    .bind(slot.auction_id)
                    .fetch_one(&mut **tx)
                    .await?;
            Ok(existing)
        }
    }
}

#[derive(sqlx::FromRow)]
struct PurchasedRow {
    id: Uuid,
    call_slot_id: Uuid,
    auction_id: Uuid,
    fan_id: Uuid,
    influencer_id: Uuid,
    winning_bid_amount: i64,
    platform_fee: i64,
    influencer_payout: i64,
    call_status: String,
    room_name: Option<String>,
    room_url: Option<String>,
    influencer_joined: bool,
    fan_joined: bool,
    call_started_at: Option<DateTime<Utc>>,
    call_ended_at: Option<DateTime<Utc>>,
    scheduled_start: DateTime<Utc>,
    duration_minutes: i32,
}

impl TryFrom<PurchasedRow> for PurchasedSlot {
    type Error = MarketError;

    fn try_from(r: PurchasedRow) -> Result<Self, Self::Error> {
        Ok(PurchasedSlot {
            id: r.id,
            call_slot_id: r.call_slot_id,
            auction_id: r.auction_id,
            fan_id: r.fan_id,
            influencer_id: r.influencer_id,
            winning_bid_amount: r.winning_bid_amount,
            platform_fee: r.platform_fee,
            influencer_payout: r.influencer_payout,
            call_status: CallStatus::try_from(r.call_status.as_str())?,
            room_name: r.room_name,
            room_url: r.room_url,
            influencer_joined: r.influencer_joined,
            fan_joined: r.fan_joined,
            call_started_at: r.call_started_at,
            call_ended_at: r.call_ended_at,
            scheduled_start: r.scheduled_start,
            duration_minutes: r.duration_minutes,
        })
    }
}

const PURCHASED_SELECT: &str = r#"
    SELECT p.id, p.call_slot_id, p.auction_id, p.fan_id, p.influencer_id,
           p.winning_bid_amount, p.platform_fee, p.influencer_payout,
           p.call_status, p.room_name, p.room_url,
           p.influencer_joined, p.fan_joined, p.call_started_at, p.call_ended_at,
           c.scheduled_start, c.duration_minutes
    FROM purchased_slots p
    JOIN call_slots c ON c.id = p.call_slot_id
"#;

pub async fn get_purchased(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<PurchasedSlot>, MarketError> {
    let row: Option<PurchasedRow> = sqlx::query_as(&format!("{PURCHASED_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.map(PurchasedSlot::try_from).transpose()
}

pub async fn get_purchased_by_auction(
    executor: impl sqlx::PgExecutor<'_>,
    auction_id: Uuid,
) -> Result<Option<PurchasedSlot>, MarketError> {
    let row: Option<PurchasedRow> =
        sqlx::query_as(&format!("{PURCHASED_SELECT} WHERE p.auction_id = $1"))
            .bind(auction_id)
            .fetch_optional(executor)
            .await?;
    row.map(PurchasedSlot::try_from).transpose()
}

/// First-writer-wins room assignment; repeated creations return the room
/// already on the row.
pub async fn set_room(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
    room_name: &str,
    room_url: &str,
) -> Result<bool, MarketError> {
    let result = sqlx::query(
        r#"
        UPDATE purchased_slots
        SET room_name = $2, room_url = $3, updated_at = now()
        WHERE id = $1 AND room_name IS NULL
        "#,
    )
    .bind(id)
    .bind(room_name)
    .bind(room_url)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Guarded status flip. The WHERE clause is the state machine at the data
/// layer: a concurrent or replayed transition from the wrong state writes
/// nothing and reports false.
pub async fn transition_call_status(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
    from: &[CallStatus],
    to: &CallStatus,
) -> Result<bool, MarketError> {
    let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();
    let result = sqlx::query(
        r#"
        UPDATE purchased_slots
        SET call_status = $2,
            call_started_at = CASE WHEN $2 = 'in_progress' AND call_started_at IS NULL
                                   THEN now() ELSE call_started_at END,
            call_ended_at   = CASE WHEN $2 IN ('completed', 'no_show') AND call_ended_at IS NULL
                                   THEN now() ELSE call_ended_at END,
            updated_at = now()
        WHERE id = $1 AND call_status = ANY($3)
        "#,
    )
    .bind(id)
    .bind(to.as_str())
    .bind(&from)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_participant_joined(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
    role: ParticipantRole,
) -> Result<(), MarketError> {
    let column = match role {
        ParticipantRole::Influencer => "influencer_joined",
        ParticipantRole::Fan => "fan_joined",
    };
    sqlx::query(&format!(
        "UPDATE purchased_slots SET {column} = true, updated_at = now() WHERE id = $1"
    ))
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Slots past the no-show grace where nobody ever joined.
pub async fn list_no_show_candidates(
    pool: &sqlx::PgPool,
    deadline: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Uuid>, MarketError> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT p.id
        FROM purchased_slots p
        JOIN call_slots c ON c.id = p.call_slot_id
        WHERE p.call_status IN ('pending', 'ready')
          AND NOT p.influencer_joined AND NOT p.fan_joined
          AND c.scheduled_start <= $1
        ORDER BY c.scheduled_start
        LIMIT $2
        "#,
    )
    .bind(deadline)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}
