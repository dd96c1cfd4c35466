use serde::Deserialize;

use crate::{error::ApiError, state::PaymentConfig};

#[derive(Debug, Deserialize)]
struct IntentResponse {
    client_secret: String,
}

/// Forwards a price to the external gateway and hands back the opaque
/// client-side secret. The gateway owns all payment logic; nothing about the
/// secret is inspected here.
pub async fn create_intent(config: &PaymentConfig, price: f64) -> Result<String, ApiError> {
    if !config.enabled() {
        log::warn!("Payment gateway not configured; rejecting payment-intent request");
        return Err(ApiError::Unavailable);
    }

    let amount = (price * 100.0).round() as i64;
    let response = reqwest::Client::new()
        .post(format!("{}/payment_intents", config.api_url.trim_end_matches('/')))
        .bearer_auth(&config.secret_key)
        .form(&[
            ("amount", amount.to_string()),
            ("currency", "usd".to_string()),
            ("payment_method_types[]", "card".to_string()),
        ])
        .send()
        .await
        .map_err(|err| {
            log::error!("Payment gateway request failed: {err}");
            ApiError::Unavailable
        })?;

    if !response.status().is_success() {
        log::error!("Payment gateway returned {}", response.status());
        return Err(ApiError::Unavailable);
    }

    let intent: IntentResponse = response.json().await.map_err(|err| {
        log::error!("Payment gateway response decode failed: {err}");
        ApiError::Unavailable
    })?;

    Ok(intent.client_secret)
}
