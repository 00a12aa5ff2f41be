use {
    super::{call_session, settlement},
    crate::domain::error::MarketError,
    crate::domain::money::FeePolicy,
    crate::domain::provider::{Notifier, PaymentGateway},
    crate::domain::slot::NO_SHOW_GRACE,
    crate::infra::postgres::{auction_repo, slot_repo},
    chrono::Utc,
    sqlx::PgPool,
    std::sync::Arc,
    tokio::sync::watch,
};

/// Re-drive settlement for active auctions past their end time. This is the
/// reconciliation path: a capture that failed, a webhook that was dropped,
/// or a closer instance that died all converge here, because
/// `close_auction` is idempotent.
pub async fn run_closer(
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    fee: FeePolicy,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("auction closer started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("auction closer shutting down");
                return;
            }
            _ = tokio::time::sleep(std::time::Duration::from_secs(30)) => {}
        }

        if let Err(e) = close_expired(&pool, &*gateway, &notifier, fee).await {
            tracing::error!(error = %e, "closer sweep error");
        }
    }
}

async fn close_expired(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    notifier: &Arc<dyn Notifier>,
    fee: FeePolicy,
) -> Result<(), MarketError> {
    let expired = auction_repo::list_expired(pool, Utc::now(), 50).await?;

    for auction_id in expired {
        match settlement::close_auction(pool, gateway, notifier, fee, auction_id).await {
            Ok(outcome) => {
                tracing::info!(auction_id = %auction_id, ?outcome, "closer settled auction");
            }
            Err(MarketError::CaptureFailed(msg)) => {
                // Auction stays active; the next sweep retries.
                tracing::warn!(auction_id = %auction_id, error = %msg, "capture failed, will retry");
            }
            Err(e) => {
                tracing::error!(auction_id = %auction_id, error = %e, "closing auction failed");
            }
        }
    }

    Ok(())
}

/// Flag purchased slots where nobody joined within the grace period past
/// the scheduled start.
pub async fn run_no_show_sweep(pool: PgPool, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("no-show sweep started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("no-show sweep shutting down");
                return;
            }
            _ = tokio::time::sleep(std::time::Duration::from_secs(60)) => {}
        }

        let deadline = Utc::now() - NO_SHOW_GRACE;
        match slot_repo::list_no_show_candidates(&pool, deadline, 50).await {
            Ok(candidates) => {
                for slot_id in candidates {
                    if let Err(e) = call_session::mark_no_show(&pool, slot_id).await {
                        tracing::error!(slot_id = %slot_id, error = %e, "no-show flagging failed");
                    }
                }
            }
            Err(e) => tracing::error!(error = %e, "no-show sweep error"),
        }
    }
}
