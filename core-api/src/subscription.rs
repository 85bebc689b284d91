//! Subscription status and lifecycle.
//!
//! The server reconciles its own records with the payment provider on every
//! status read, so [`SubscriptionClient::status`] is always safe to call and
//! is the authoritative view. Cancellation takes effect at the end of the
//! current billing period, not immediately.

use chrono::{DateTime, Utc};
use core_session::{ApiClient, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

/// Subscription details. Not every endpoint returns every field, so the
/// identifiers are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionInfo {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub price_id: Option<String>,
    pub current_period_end: DateTime<Utc>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

/// Response of `GET /subscription/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionStatus {
    #[serde(rename = "hasActiveSubscription")]
    pub has_active_subscription: bool,
    #[serde(default)]
    pub subscription: Option<SubscriptionInfo>,
}

/// Response of subscription creation or plan change.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionCreated {
    pub message: String,
    pub subscription: SubscriptionInfo,
    /// Present when the first invoice needs further payment confirmation
    /// in the provider-hosted flow.
    #[serde(default)]
    pub payment_intent_client_secret: Option<String>,
}

/// Response of a cancellation request.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionCanceled {
    pub message: String,
    pub subscription: SubscriptionInfo,
}

/// Coupon granted by a promotion code.
#[derive(Debug, Clone, Deserialize)]
pub struct CouponSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub percent_off: Option<f64>,
    #[serde(default)]
    pub amount_off: Option<i64>,
}

/// Response of applying a promotion code.
#[derive(Debug, Clone, Deserialize)]
pub struct PromotionApplied {
    pub message: String,
    pub coupon: CouponSummary,
}

/// Client for the subscription endpoints.
#[derive(Clone)]
pub struct SubscriptionClient {
    api: ApiClient,
}

impl SubscriptionClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Current subscription state, reconciled with the payment provider.
    pub async fn status(&self) -> Result<SubscriptionStatus> {
        self.api.get_json("/subscription/status").await
    }

    /// Subscribe to a plan, or change plans / resume a pending cancellation
    /// when a subscription already exists.
    #[instrument(skip(self))]
    pub async fn subscribe(&self, price_id: &str) -> Result<SubscriptionCreated> {
        self.api
            .post_json("/payment/subscription", &json!({ "priceId": price_id }))
            .await
    }

    /// Cancel at the end of the current billing period.
    #[instrument(skip(self))]
    pub async fn cancel(&self) -> Result<SubscriptionCanceled> {
        self.api.post_json("/subscription/cancel", &json!({})).await
    }

    /// Apply a promotion code to the active subscription.
    #[instrument(skip(self, code))]
    pub async fn apply_promotion(&self, code: &str) -> Result<PromotionApplied> {
        self.api
            .post_json("/subscription/promotion", &json!({ "code": code }))
            .await
    }
}
