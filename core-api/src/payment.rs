//! Payment provider onboarding, stored payment methods, and billing history.
//!
//! Card data never transits this client. Card entry happens in a
//! provider-hosted form; the portal only ever sees opaque identifiers
//! (setup-intent client secrets, payment-method ids) and display summaries
//! (brand, last4, expiry).

use chrono::{DateTime, Utc};
use core_session::{ApiClient, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

/// Result of customer registration with the payment provider.
///
/// The provider-side customer id is never returned to the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerStatus {
    pub message: String,
    #[serde(default)]
    pub has_payment_method: bool,
}

/// Handle for a provider-hosted card registration flow.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupIntent {
    /// Opaque secret the host passes to the provider's card form.
    pub client_secret: String,
}

/// Display summary of a stored card. Only what the provider exposes for
/// display; never the card number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CardSummary {
    pub brand: String,
    pub last4: String,
    pub exp_month: u8,
    pub exp_year: u16,
}

/// A stored payment method.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub card: CardSummary,
    #[serde(rename = "isDefault", default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentMethodList {
    payment_methods: Vec<PaymentMethod>,
}

/// One entry in the billing history. Amounts are in the portal's currency
/// minor unit.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub amount: i64,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PaymentHistory {
    payment_history: Vec<PaymentRecord>,
}

/// Client for the payment endpoints.
#[derive(Clone)]
pub struct PaymentClient {
    api: ApiClient,
}

impl PaymentClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Register the signed-in user as a customer with the payment provider.
    /// Idempotent; re-registering reports the existing state.
    #[instrument(skip(self))]
    pub async fn create_customer(&self) -> Result<CustomerStatus> {
        self.api.post_json("/payment/customer", &json!({})).await
    }

    /// Start a card registration flow. The returned secret drives the
    /// provider-hosted form; the card itself never reaches the portal.
    #[instrument(skip(self))]
    pub async fn create_setup_intent(&self) -> Result<SetupIntent> {
        self.api
            .post_json("/payment/setup-intent", &json!({}))
            .await
    }

    /// Attach the payment method produced by a completed card form.
    #[instrument(skip(self, payment_method_id))]
    pub async fn confirm_setup(&self, payment_method_id: &str) -> Result<()> {
        self.api
            .post(
                "/payment/confirm-setup",
                &json!({ "paymentMethodId": payment_method_id }),
            )
            .await
    }

    /// Billing history, newest first.
    pub async fn history(&self) -> Result<Vec<PaymentRecord>> {
        let body: PaymentHistory = self.api.get_json("/payment/history").await?;
        Ok(body.payment_history)
    }

    /// Stored payment methods.
    pub async fn methods(&self) -> Result<Vec<PaymentMethod>> {
        let body: PaymentMethodList = self.api.get_json("/payment/methods").await?;
        Ok(body.payment_methods)
    }

    /// Detach a stored payment method.
    #[instrument(skip(self))]
    pub async fn delete_method(&self, payment_method_id: &str) -> Result<()> {
        self.api
            .delete(&format!("/payment/methods/{}", payment_method_id))
            .await
    }

    /// Make a stored payment method the default for future charges.
    #[instrument(skip(self, payment_method_id))]
    pub async fn set_default_method(&self, payment_method_id: &str) -> Result<()> {
        self.api
            .post(
                "/payment/methods/default",
                &json!({ "paymentMethodId": payment_method_id }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_intent_wire_format() {
        let json = r#"{"clientSecret": "seti_123_secret_456"}"#;
        let intent: SetupIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.client_secret, "seti_123_secret_456");
    }

    #[test]
    fn test_payment_method_list_wire_format() {
        let json = r#"{
            "paymentMethods": [
                {
                    "id": "pm_123",
                    "card": {"brand": "visa", "last4": "4242", "exp_month": 4, "exp_year": 2028},
                    "isDefault": true
                }
            ]
        }"#;

        let list: PaymentMethodList = serde_json::from_str(json).unwrap();
        assert_eq!(list.payment_methods.len(), 1);
        let method = &list.payment_methods[0];
        assert_eq!(method.card.last4, "4242");
        assert!(method.is_default);
    }

    #[test]
    fn test_payment_history_wire_format() {
        let json = r#"{
            "payment_history": [
                {
                    "id": "in_123",
                    "amount": 3000,
                    "status": "paid",
                    "type": "subscription",
                    "created_at": "2026-02-01T00:00:00Z",
                    "description": "Monthly subscription"
                },
                {
                    "id": "upcoming",
                    "amount": 3000,
                    "status": "upcoming",
                    "type": "subscription",
                    "created_at": "2026-03-01T00:00:00Z"
                }
            ]
        }"#;

        let history: PaymentHistory = serde_json::from_str(json).unwrap();
        assert_eq!(history.payment_history.len(), 2);
        assert_eq!(history.payment_history[0].kind, "subscription");
        assert_eq!(history.payment_history[1].description, "");
    }

    #[test]
    fn test_customer_status_without_method_flag() {
        let json = r#"{"message": "Customer created"}"#;
        let status: CustomerStatus = serde_json::from_str(json).unwrap();
        assert!(!status.has_payment_method);
    }
}
