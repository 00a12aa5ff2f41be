use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        services::{
            bidding::{self, PlaceBidOutcome},
            call_session, listing,
            settlement::{self, SettlementOutcome},
        },
    },
    axum::{
        Json,
        extract::{Path, State},
    },
    crate::domain::slot::NewCallSlot,
    serde::Deserialize,
    uuid::Uuid,
};

pub async fn create_slot(
    State(state): State<AppState>,
    Json(new): Json<NewCallSlot>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (slot, auction) = listing::create_call_slot(&state.pool, new).await?;
    Ok(Json(serde_json::json!({
        "call_slot_id": slot.id,
        "auction_id": auction.id,
        "auction_end_time": auction.end_time,
    })))
}

pub async fn get_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let highest = bidding::highest_bid(&state.pool, auction_id).await?;
    Ok(Json(serde_json::json!({
        "auction_id": auction_id,
        "current_highest_bid": highest.amount,
        "current_winner_id": highest.bidder_id,
    })))
}

#[derive(Deserialize)]
pub struct PlaceBidRequest {
    pub bidder_id: Uuid,
    pub amount: i64,
}

pub async fn place_bid(
    State(state): State<AppState>,
    Path(auction_id): Path<Uuid>,
    Json(req): Json<PlaceBidRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = bidding::place_bid(
        &state.pool,
        &*state.gateway,
        &state.notifier,
        state.fee,
        auction_id,
        req.bidder_id,
        req.amount,
    )
    .await?;

    Ok(Json(match outcome {
        PlaceBidOutcome::Placed {
            bid_id,
            current_highest,
        } => serde_json::json!({
            "status": "placed",
            "bid_id": bid_id,
            "current_highest_bid": current_highest,
        }),
        PlaceBidOutcome::BoughtNow { purchased_slot_id } => serde_json::json!({
            "status": "bought_now",
            "purchased_slot_id": purchased_slot_id,
        }),
    }))
}

/// Scheduled/internal close trigger. Succeeds on a converged no-op; a failed
/// capture surfaces as 409 so the caller retries.
pub async fn close_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = settlement::close_auction(
        &state.pool,
        &*state.gateway,
        &state.notifier,
        state.fee,
        auction_id,
    )
    .await?;

    Ok(Json(match outcome {
        SettlementOutcome::Settled { purchased_slot_id } => {
            serde_json::json!({"status": "settled", "purchased_slot_id": purchased_slot_id})
        }
        SettlementOutcome::AlreadySettled { purchased_slot_id } => {
            serde_json::json!({"status": "already_settled", "purchased_slot_id": purchased_slot_id})
        }
        SettlementOutcome::NoBids => serde_json::json!({"status": "cancelled_no_bids"}),
        SettlementOutcome::AlreadyCancelled => serde_json::json!({"status": "already_cancelled"}),
    }))
}

#[derive(Deserialize)]
pub struct BuyNowRequest {
    pub buyer_id: Uuid,
    pub amount: i64,
}

pub async fn buy_now(
    State(state): State<AppState>,
    Path(auction_id): Path<Uuid>,
    Json(req): Json<BuyNowRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = settlement::close_auction_by_buy_now(
        &state.pool,
        &*state.gateway,
        &state.notifier,
        state.fee,
        auction_id,
        req.buyer_id,
        req.amount,
    )
    .await?;

    match outcome {
        SettlementOutcome::Settled { purchased_slot_id }
        | SettlementOutcome::AlreadySettled { purchased_slot_id } => Ok(Json(
            serde_json::json!({"purchased_slot_id": purchased_slot_id}),
        )),
        SettlementOutcome::NoBids | SettlementOutcome::AlreadyCancelled => {
            Err(crate::domain::error::MarketError::AuctionNotActive.into())
        }
    }
}

#[derive(Deserialize)]
pub struct CallRequest {
    pub purchased_slot_id: Uuid,
    pub user_id: Uuid,
}

pub async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CallRequest>,
) -> Result<Json<call_session::RoomSession>, ApiError> {
    let session =
        call_session::create_room(&state.pool, &*state.video, req.purchased_slot_id, req.user_id)
            .await?;
    Ok(Json(session))
}

pub async fn join_room(
    State(state): State<AppState>,
    Json(req): Json<CallRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session =
        call_session::join_room(&state.pool, &*state.video, req.purchased_slot_id, req.user_id)
            .await?;
    Ok(Json(serde_json::json!({
        "room_url": session.room_url,
        "token": session.token,
    })))
}

pub async fn end_call(
    State(state): State<AppState>,
    Json(req): Json<CallRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let duration = call_session::end_call(
        &state.pool,
        &*state.video,
        &*state.gateway,
        &state.notifier,
        state.fee,
        req.purchased_slot_id,
        req.user_id,
    )
    .await?;
    Ok(Json(serde_json::json!({"duration": duration})))
}

pub async fn call_status(
    State(state): State<AppState>,
    Path(purchased_slot_id): Path<Uuid>,
) -> Result<Json<call_session::CallStatusView>, ApiError> {
    let view = call_session::call_status(&state.pool, purchased_slot_id).await?;
    Ok(Json(view))
}
