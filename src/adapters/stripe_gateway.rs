use {
    crate::domain::{
        error::MarketError,
        id::HoldId,
        money::Currency,
        provider::{CapturedHold, PayerProfile, PaymentGateway},
    },
    std::{future::Future, pin::Pin},
};

/// Holds are manual-capture PaymentIntents: `authorize` confirms one against
/// the stored card, settlement captures the winner's and cancels the rest.
pub struct StripeGateway {
    client: stripe::Client,
    currency: stripe::Currency,
}

impl StripeGateway {
    pub fn new(secret_key: &str, currency: &Currency) -> Self {
        Self {
            client: stripe::Client::new(secret_key),
            currency: convert_currency(currency),
        }
    }
}

fn convert_currency(c: &Currency) -> stripe::Currency {
    match c {
        Currency::Usd => stripe::Currency::USD,
        Currency::Eur => stripe::Currency::EUR,
        Currency::Gbp => stripe::Currency::GBP,
        Currency::Jpy => stripe::Currency::JPY,
    }
}

impl PaymentGateway for StripeGateway {
    fn authorize(
        &self,
        payer: &PayerProfile,
        amount_cents: i64,
    ) -> Pin<Box<dyn Future<Output = Result<HoldId, MarketError>> + Send + '_>> {
        let payer = payer.clone();
        Box::pin(async move { self.authorize_inner(&payer, amount_cents).await })
    }

    fn capture(
        &self,
        hold: &HoldId,
    ) -> Pin<Box<dyn Future<Output = Result<CapturedHold, MarketError>> + Send + '_>> {
        let hold = hold.clone();
        Box::pin(async move { self.capture_inner(&hold).await })
    }

    fn cancel(
        &self,
        hold: &HoldId,
    ) -> Pin<Box<dyn Future<Output = Result<(), MarketError>> + Send + '_>> {
        let hold = hold.clone();
        Box::pin(async move { self.cancel_inner(&hold).await })
    }
}

impl StripeGateway {
    async fn authorize_inner(
        &self,
        payer: &PayerProfile,
        amount_cents: i64,
    ) -> Result<HoldId, MarketError> {
        let customer = payer
            .customer_id
            .parse::<stripe::CustomerId>()
            .map_err(|e| MarketError::Provider(format!("invalid customer id: {e}")))?;
        let payment_method = payer
            .payment_method_id
            .parse::<stripe::PaymentMethodId>()
            .map_err(|e| MarketError::Provider(format!("invalid payment method id: {e}")))?;

        let mut params = stripe::CreatePaymentIntent::new(amount_cents, self.currency);
        params.customer = Some(customer);
        params.payment_method = Some(payment_method);
        params.capture_method = Some(stripe::PaymentIntentCaptureMethod::Manual);
        params.confirm = Some(true);

        let pi = stripe::PaymentIntent::create(&self.client, params)
            .await
            .map_err(|e| MarketError::ProviderDeclined(e.to_string()))?;

        match pi.status {
            stripe::PaymentIntentStatus::RequiresCapture => HoldId::new(pi.id.to_string()),
            other => Err(MarketError::ProviderDeclined(format!(
                "hold not placed, intent status: {other:?}"
            ))),
        }
    }

    async fn capture_inner(&self, hold: &HoldId) -> Result<CapturedHold, MarketError> {
        let pi_id = self.parse_hold(hold)?;

        match stripe::PaymentIntent::capture(
            &self.client,
            &pi_id,
            stripe::CapturePaymentIntent::default(),
        )
        .await
        {
            Ok(pi) => Ok(CapturedHold {
                hold_id: hold.clone(),
                captured_amount: pi.amount_received,
                already_captured: false,
            }),
            Err(err) => {
                // Redeliveries and concurrent closers re-capture; read the
                // intent back and treat an already-settled one as success.
                let pi = stripe::PaymentIntent::retrieve(&self.client, &pi_id, &[])
                    .await
                    .map_err(|e| MarketError::CaptureFailed(e.to_string()))?;
                match pi.status {
                    stripe::PaymentIntentStatus::Succeeded => Ok(CapturedHold {
                        hold_id: hold.clone(),
                        captured_amount: pi.amount_received,
                        already_captured: true,
                    }),
                    stripe::PaymentIntentStatus::Canceled => Err(MarketError::CaptureFailed(
                        format!("hold {hold} expired or was cancelled"),
                    )),
                    _ => Err(MarketError::CaptureFailed(err.to_string())),
                }
            }
        }
    }

    async fn cancel_inner(&self, hold: &HoldId) -> Result<(), MarketError> {
        let pi_id = self.parse_hold(hold)?;

        match stripe::PaymentIntent::cancel(
            &self.client,
            &pi_id,
            stripe::CancelPaymentIntent::default(),
        )
        .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                match stripe::PaymentIntent::retrieve(&self.client, &pi_id, &[]).await {
                    Ok(pi)
                        if matches!(
                            pi.status,
                            stripe::PaymentIntentStatus::Canceled
                                | stripe::PaymentIntentStatus::Succeeded
                        ) =>
                    {
                        // Already released or captured elsewhere; settlement
                        // may race manual cancellation; tolerated, only logged.
                        tracing::info!(hold_id = %hold, status = ?pi.status, "cancel was a no-op");
                        Ok(())
                    }
                    _ => Err(MarketError::Provider(format!(
                        "cancelling hold {hold}: {err}"
                    ))),
                }
            }
        }
    }

    fn parse_hold(&self, hold: &HoldId) -> Result<stripe::PaymentIntentId, MarketError> {
        hold.as_str()
            .parse::<stripe::PaymentIntentId>()
            .map_err(|e| MarketError::Provider(format!("invalid hold id: {e}")))
    }
}
