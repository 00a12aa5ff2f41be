use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("bid no longer beats the current highest of {current}")]
    StaleBid { current: i64 },

    #[error("auction is not active")]
    AuctionNotActive,

    #[error("amount does not match the buy-now price of {expected}")]
    PriceMismatch { expected: i64 },

    #[error("no usable payment method on file")]
    NoPaymentMethod,

    #[error("payment provider declined: {0}")]
    ProviderDeclined(String),

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("join window is not open (starts in {starts_in_seconds}s)")]
    OutsideJoinWindow { starts_in_seconds: i64 },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("provider: {0}")]
    Provider(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
