use {
    crate::domain::error::MarketError,
    crate::domain::provider::PayerProfile,
    uuid::Uuid,
};

/// The bidder's card-on-file references. `NoPaymentMethod` when either the
/// customer or the stored method is missing.
pub async fn get_payer_profile(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: Uuid,
) -> Result<PayerProfile, MarketError> {
    let row: Option<(Option<String>, Option<String>)> = sqlx::query_as(
        "SELECT stripe_customer_id, stripe_payment_method_id FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    match row {
        None => Err(MarketError::NotFound(format!("user {user_id}"))),
        Some((Some(customer_id), Some(payment_method_id))) => Ok(PayerProfile {
            user_id,
            customer_id,
            payment_method_id,
        }),
        Some(_) => Err(MarketError::NoPaymentMethod),
    }
}
