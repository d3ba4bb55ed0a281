use crate::config::PaymentConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ChargeReceipt {
    pub id: String,
    pub amount: i64,
    pub status: String,
}

/// Thin wrapper over the payment provider's REST API. Charges are issued
/// after a subscription state transition commits; a failed charge is
/// reported back via the payment-result path and never reverts state.
#[derive(Clone)]
pub struct PaymentGateway {
    client: Client,
    config: PaymentConfig,
}

impl PaymentGateway {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn charge(
        &self,
        subscription_id: i64,
        amount_cents: i64,
        currency: &str,
    ) -> AppResult<ChargeReceipt> {
        let url = format!("{}/v1/payment_intents", self.config.base_url);

        let params = [
            ("amount", amount_cents.to_string()),
            ("currency", currency.to_ascii_lowercase()),
            ("confirm", "true".to_string()),
            ("metadata[subscription_id]", subscription_id.to_string()),
        ];

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            let receipt: ChargeReceipt = response.json().await?;
            Ok(receipt)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            Err(AppError::ExternalApiError(format!(
                "Charge failed for subscription {subscription_id}: {error_text}"
            )))
        }
    }
}
