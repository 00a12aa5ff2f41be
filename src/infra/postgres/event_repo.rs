use crate::domain::error::MarketError;

/// Record a provider event. Returns `false` when this delivery was already
/// seen; at-least-once redeliveries dedup here.
pub async fn insert_provider_event(
    executor: impl sqlx::PgExecutor<'_>,
    event_type: &str,
    room_name: &str,
    participant_id: &str,
    provider_ts: i64,
    payload: &serde_json::Value,
) -> Result<bool, MarketError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO provider_events (event_type, room_name, participant_id, provider_ts, payload)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (event_type, room_name, participant_id, provider_ts) DO NOTHING
        RETURNING true
        "#,
    )
    .bind(event_type)
    .bind(room_name)
    .bind(participant_id)
    .bind(provider_ts)
    .bind(payload)
    .fetch_optional(executor)
    .await?;
    Ok(inserted.is_some())
}
