use {
    super::error::MarketError,
    super::id::{HoldId, RoomName},
    chrono::{DateTime, Utc},
    std::{future::Future, pin::Pin},
    uuid::Uuid,
};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, MarketError>> + Send + 'a>>;

/// A bidder's stored card-on-file, as held by the payment provider.
#[derive(Debug, Clone)]
pub struct PayerProfile {
    pub user_id: Uuid,
    pub customer_id: String,
    pub payment_method_id: String,
}

/// Result of capturing a hold.
#[derive(Debug, Clone)]
pub struct CapturedHold {
    pub hold_id: HoldId,
    pub captured_amount: i64,
    /// The hold had already been captured by an earlier invocation.
    pub already_captured: bool,
}

/// Seam over the payment provider. `capture` and `cancel` are idempotent by
/// contract: settlement can be re-driven by the sweep or a webhook redelivery
/// and must converge, not fail.
pub trait PaymentGateway: Send + Sync {
    /// Place a hold for `amount_cents` against the payer's stored card.
    fn authorize(&self, payer: &PayerProfile, amount_cents: i64) -> BoxFuture<'_, HoldId>;

    /// Convert a hold into a charge. Re-capturing an already-captured hold
    /// reports success with `already_captured` set.
    fn capture(&self, hold: &HoldId) -> BoxFuture<'_, CapturedHold>;

    /// Release a hold. Cancelling an already-cancelled (or captured) hold is
    /// not an error.
    fn cancel(&self, hold: &HoldId) -> BoxFuture<'_, ()>;
}

#[derive(Debug, Clone)]
pub struct Room {
    pub name: RoomName,
    pub url: String,
}

/// Seam over the embeddable video provider.
pub trait VideoProvider: Send + Sync {
    fn create_room(&self, name: &RoomName, expires_at: DateTime<Utc>) -> BoxFuture<'_, Room>;

    fn delete_room(&self, name: &RoomName) -> BoxFuture<'_, ()>;

    /// Short-lived join token; `is_owner` grants host controls.
    fn meeting_token(&self, name: &RoomName, user_id: Uuid, is_owner: bool)
    -> BoxFuture<'_, String>;
}

/// Post-settlement notifications. Fire-and-forget: failures are logged and
/// audited, never propagated into settlement.
pub trait Notifier: Send + Sync {
    fn auction_won(&self, user_id: Uuid, purchased_slot_id: Uuid) -> BoxFuture<'_, ()>;
}
