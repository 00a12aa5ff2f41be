use {
    super::id::HoldId,
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

/// One row of the append-only bid ledger.
#[derive(Debug, Clone, Serialize)]
pub struct Bid {
    pub id: Uuid,
    pub auction_id: Uuid,
    pub bidder_id: Uuid,
    pub amount: i64,
    pub auto: bool,
    pub hold_id: HoldId,
    pub created_at: DateTime<Utc>,
}

/// For INSERT; id generated in Rust via Uuid::now_v7().
#[derive(Debug, Clone)]
pub struct NewBid {
    pub id: Uuid,
    pub auction_id: Uuid,
    pub bidder_id: Uuid,
    pub amount: i64,
    pub auto: bool,
    pub hold_id: HoldId,
}

impl NewBid {
    pub fn new(auction_id: Uuid, bidder_id: Uuid, amount: i64, hold_id: HoldId) -> Self {
        Self {
            id: Uuid::now_v7(),
            auction_id,
            bidder_id,
            amount,
            auto: false,
            hold_id,
        }
    }
}
