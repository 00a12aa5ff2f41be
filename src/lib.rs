pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

use std::sync::Arc;

use domain::money::FeePolicy;
use domain::provider::{Notifier, PaymentGateway, VideoProvider};

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub gateway: Arc<dyn PaymentGateway>,
    pub video: Arc<dyn VideoProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub fee: FeePolicy,
}
