use {
    super::settlement,
    crate::domain::audit::NewAuditEntry,
    crate::domain::error::MarketError,
    crate::domain::event::VideoEvent,
    crate::domain::id::RoomName,
    crate::domain::money::FeePolicy,
    crate::domain::provider::{Notifier, PaymentGateway, VideoProvider},
    crate::domain::slot::{CallStatus, ParticipantRole, PurchasedSlot},
    crate::infra::postgres::{audit_repo, event_repo, slot_repo},
    chrono::{Duration, Utc},
    sqlx::PgPool,
    std::sync::Arc,
    uuid::Uuid,
};

#[derive(Debug, serde::Serialize)]
pub struct RoomSession {
    pub room_url: String,
    pub token: String,
    pub time_until_start_seconds: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct Participants {
    pub influencer_joined: bool,
    pub fan_joined: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct CallStatusView {
    pub status: CallStatus,
    pub time_until_start_seconds: i64,
    pub participants: Participants,
    pub can_join: bool,
    pub room_created: bool,
}

async fn load_slot(pool: &PgPool, slot_id: Uuid) -> Result<PurchasedSlot, MarketError> {
    slot_repo::get_purchased(pool, slot_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("purchased slot {slot_id}")))
}

fn require_participant(
    slot: &PurchasedSlot,
    user_id: Uuid,
) -> Result<ParticipantRole, MarketError> {
    slot.participant_role(user_id)
        .ok_or_else(|| MarketError::Forbidden("not a participant of this call".into()))
}

/// Create (or return) the video room for a purchased slot. Only permitted
/// inside the join window. Idempotent: the room name is `call-{slot_id}` and
/// a concurrent creation loses the first-writer race and reads the winner's
/// room back.
pub async fn create_room(
    pool: &PgPool,
    video: &dyn VideoProvider,
    slot_id: Uuid,
    user_id: Uuid,
) -> Result<RoomSession, MarketError> {
    let slot = load_slot(pool, slot_id).await?;
    let role = require_participant(&slot, user_id)?;

    if slot.call_status.is_terminal() {
        return Err(MarketError::Validation(format!(
            "call is already {}",
            slot.call_status
        )));
    }

    let now = Utc::now();
    if !slot.join_window_open(now) {
        return Err(MarketError::OutsideJoinWindow {
            starts_in_seconds: slot.time_until_start(now).max(0),
        });
    }

    let room_name = RoomName::for_slot(slot.id);
    let room_url = match slot.room_url.clone() {
        Some(url) => url,
        None => {
            let expires_at =
                slot.scheduled_start + Duration::minutes(slot.duration_minutes as i64 + 30);
            let room = video.create_room(&room_name, expires_at).await?;
            let claimed = slot_repo::set_room(pool, slot.id, room_name.as_str(), &room.url).await?;
            if claimed {
                slot_repo::transition_call_status(
                    pool,
                    slot.id,
                    &[CallStatus::Pending],
                    &CallStatus::Ready,
                )
                .await?;
                let audit = NewAuditEntry::new(
                    "purchased_slot",
                    Some(slot.id),
                    "room_created",
                    "api",
                    serde_json::json!({"room": room_name.as_str(), "by": user_id}),
                );
                audit_repo::insert_audit_entry(pool, &audit).await?;
                room.url
            } else {
                // Lost the race; someone else just created it.
                load_slot(pool, slot.id)
                    .await?
                    .room_url
                    .unwrap_or(room.url)
            }
        }
    };

    let token = video
        .meeting_token(&room_name, user_id, role == ParticipantRole::Influencer)
        .await?;

    Ok(RoomSession {
        room_url,
        token,
        time_until_start_seconds: slot.time_until_start(now),
    })
}

/// Join an existing room. The room must have been created (`ready` or
/// already `in_progress`) and the window must still be open.
pub async fn join_room(
    pool: &PgPool,
    video: &dyn VideoProvider,
    slot_id: Uuid,
    user_id: Uuid,
) -> Result<RoomSession, MarketError> {
    let slot = load_slot(pool, slot_id).await?;
    let role = require_participant(&slot, user_id)?;

    if !matches!(slot.call_status, CallStatus::Ready | CallStatus::InProgress) {
        return Err(MarketError::Validation(format!(
            "call is {} and cannot be joined",
            slot.call_status
        )));
    }

    let now = Utc::now();
    if !slot.join_window_open(now) {
        return Err(MarketError::OutsideJoinWindow {
            starts_in_seconds: slot.time_until_start(now).max(0),
        });
    }

    let room_url = slot
        .room_url
        .clone()
        .ok_or_else(|| MarketError::Validation("room has not been created".into()))?;
    let room_name = RoomName::for_slot(slot.id);
    let token = video
        .meeting_token(&room_name, user_id, role == ParticipantRole::Influencer)
        .await?;

    Ok(RoomSession {
        room_url,
        token,
        time_until_start_seconds: slot.time_until_start(now),
    })
}

/// End the call. Idempotent: ending an already-completed call just reports
/// the recorded duration. On the first completion this also re-drives
/// settlement (a no-op when the timer path already captured) and tears the
/// room down best-effort.
pub async fn end_call(
    pool: &PgPool,
    video: &dyn VideoProvider,
    gateway: &dyn PaymentGateway,
    notifier: &Arc<dyn Notifier>,
    fee: FeePolicy,
    slot_id: Uuid,
    user_id: Uuid,
) -> Result<i64, MarketError> {
    let slot = load_slot(pool, slot_id).await?;
    require_participant(&slot, user_id)?;

    if slot.call_status == CallStatus::Completed {
        return Ok(slot.call_duration_seconds().unwrap_or(0));
    }

    let flipped = slot_repo::transition_call_status(
        pool,
        slot.id,
        &[CallStatus::Ready, CallStatus::InProgress],
        &CallStatus::Completed,
    )
    .await?;
    if !flipped {
        // Raced with the webhook or the call never started; re-read and
        // answer from whatever state won.
        let slot = load_slot(pool, slot_id).await?;
        return match slot.call_status {
            CallStatus::Completed => Ok(slot.call_duration_seconds().unwrap_or(0)),
            other => Err(MarketError::Validation(format!(
                "call is {other} and cannot be ended"
            ))),
        };
    }

    finalize_completed_call(pool, video, gateway, notifier, fee, &slot, "api").await;

    let slot = load_slot(pool, slot_id).await?;
    Ok(slot.call_duration_seconds().unwrap_or(0))
}

/// Post-completion side effects, shared by the end-call endpoint and the
/// room-ended webhook. All best-effort: the call is already completed and
/// none of these may fail it.
async fn finalize_completed_call(
    pool: &PgPool,
    video: &dyn VideoProvider,
    gateway: &dyn PaymentGateway,
    notifier: &Arc<dyn Notifier>,
    fee: FeePolicy,
    slot: &PurchasedSlot,
    actor: &str,
) {
    let room_name = RoomName::for_slot(slot.id);
    if let Err(e) = video.delete_room(&room_name).await {
        tracing::warn!(slot_id = %slot.id, error = %e, "failed to delete video room");
    }

    // Dual-trigger settlement: capture converges here when the room-ended
    // signal arrives before the scheduled closer has run.
    if let Err(e) =
        settlement::close_auction(pool, gateway, notifier, fee, slot.auction_id).await
    {
        tracing::error!(auction_id = %slot.auction_id, error = %e, "post-call settlement did not converge");
    }

    let audit = NewAuditEntry::new(
        "purchased_slot",
        Some(slot.id),
        "call_completed",
        actor,
        serde_json::json!({"auction_id": slot.auction_id}),
    );
    if let Err(e) = audit_repo::insert_audit_entry(pool, &audit).await {
        tracing::error!(error = %e, "failed to audit call completion");
    }
}

pub async fn call_status(pool: &PgPool, slot_id: Uuid) -> Result<CallStatusView, MarketError> {
    let slot = load_slot(pool, slot_id).await?;
    let now = Utc::now();
    Ok(CallStatusView {
        can_join: matches!(slot.call_status, CallStatus::Ready | CallStatus::InProgress)
            && slot.join_window_open(now),
        room_created: slot.room_url.is_some(),
        time_until_start_seconds: slot.time_until_start(now),
        participants: Participants {
            influencer_joined: slot.influencer_joined,
            fan_joined: slot.fan_joined,
        },
        status: slot.call_status,
    })
}

/// Apply one provider webhook event. Returns a short status for the
/// handler's log line. Duplicated deliveries and events for rooms we do not
/// know are acknowledged as no-ops.
pub async fn apply_video_event(
    pool: &PgPool,
    video: &dyn VideoProvider,
    gateway: &dyn PaymentGateway,
    notifier: &Arc<dyn Notifier>,
    fee: FeePolicy,
    event: &VideoEvent,
    raw: &serde_json::Value,
) -> Result<&'static str, MarketError> {
    let Some(room) = event.room() else {
        return Ok("ignored");
    };

    let fresh = event_repo::insert_provider_event(
        pool,
        event.event_type(),
        room,
        event.participant().unwrap_or(""),
        event.event_ts(),
        raw,
    )
    .await?;
    if !fresh {
        return Ok("duplicate");
    }

    let Ok(room_name) = RoomName::parse(room) else {
        tracing::warn!(room = %room, "event for a room outside our naming scheme");
        return Ok("ignored");
    };

    let Some(slot) = slot_repo::get_purchased(pool, room_name.purchased_slot_id()).await? else {
        tracing::warn!(room = %room, "event for an unknown purchased slot");
        return Ok("ignored");
    };

    match event {
        VideoEvent::ParticipantJoined { payload } => {
            if slot.call_status.is_terminal() {
                return Ok("ignored");
            }
            slot_repo::transition_call_status(
                pool,
                slot.id,
                &[CallStatus::Ready],
                &CallStatus::InProgress,
            )
            .await?;
            if let Some(role) = payload
                .user_id
                .as_deref()
                .and_then(|raw| raw.parse::<Uuid>().ok())
                .and_then(|id| slot.participant_role(id))
            {
                slot_repo::mark_participant_joined(pool, slot.id, role).await?;
            }
            Ok("participant_joined")
        }
        VideoEvent::MeetingEnded { .. } => {
            let flipped = slot_repo::transition_call_status(
                pool,
                slot.id,
                &[CallStatus::Ready, CallStatus::InProgress],
                &CallStatus::Completed,
            )
            .await?;
            if flipped {
                finalize_completed_call(pool, video, gateway, notifier, fee, &slot, "webhook")
                    .await;
                Ok("completed")
            } else {
                Ok("already_terminal")
            }
        }
        VideoEvent::MeetingStarted { .. } | VideoEvent::ParticipantLeft { .. } => Ok("noted"),
        VideoEvent::Unknown => Ok("ignored"),
    }
}

/// Flag slots where nobody ever joined within the grace period. Which side
/// is penalized is a policy decision outside this core; we only record the
/// state.
pub async fn mark_no_show(pool: &PgPool, slot_id: Uuid) -> Result<bool, MarketError> {
    let flipped = slot_repo::transition_call_status(
        pool,
        slot_id,
        &[CallStatus::Pending, CallStatus::Ready],
        &CallStatus::NoShow,
    )
    .await?;
    if flipped {
        let audit = NewAuditEntry::new(
            "purchased_slot",
            Some(slot_id),
            "no_show",
            "sweeper",
            serde_json::json!({}),
        );
        audit_repo::insert_audit_entry(pool, &audit).await?;
        tracing::info!(slot_id = %slot_id, "slot flagged as no-show");
    }
    Ok(flipped)
}
