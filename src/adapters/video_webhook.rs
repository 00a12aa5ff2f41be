use {
    crate::{AppState, domain::event::VideoEvent, services::call_session},
    axum::{Json, extract::State},
};

/// Video-provider webhook entry point. Always acknowledges with 200; the
/// provider delivers at-least-once and a non-2xx would only provoke a retry
/// storm. Internal failures are logged and converge through the sweeps.
#[tracing::instrument(name = "video_webhook", skip_all, fields(event_type, room))]
pub async fn video_webhook_handler(
    State(state): State<AppState>,
    body: String,
) -> Json<serde_json::Value> {
    let ack = Json(serde_json::json!({"received": true}));

    let raw: serde_json::Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable webhook body, acknowledging anyway");
            return ack;
        }
    };

    let event: VideoEvent = match serde_json::from_value(raw.clone()) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "webhook body did not match any known event shape");
            VideoEvent::Unknown
        }
    };

    tracing::Span::current()
        .record("event_type", event.event_type())
        .record("room", event.room().unwrap_or("-"));

    match call_session::apply_video_event(
        &state.pool,
        &*state.video,
        &*state.gateway,
        &state.notifier,
        state.fee,
        &event,
        &raw,
    )
    .await
    {
        Ok(status) => tracing::info!(status, "video event processed"),
        Err(e) => tracing::error!(error = %e, "video event processing failed"),
    }

    ack
}
