use {
    crate::domain::{error::MarketError, provider::Notifier},
    std::{future::Future, pin::Pin},
    uuid::Uuid,
};

/// Log-only notifier. The real delivery channel (email, push) hangs off the
/// same trait; settlement only ever fires and forgets.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn auction_won(
        &self,
        user_id: Uuid,
        purchased_slot_id: Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<(), MarketError>> + Send + '_>> {
        Box::pin(async move {
            tracing::info!(
                user_id = %user_id,
                purchased_slot_id = %purchased_slot_id,
                "auction won notification"
            );
            Ok(())
        })
    }
}
