use std::collections::HashMap;

use anyhow::{Context, Result, ensure};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::error;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    success_url: String,
    cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
    decline_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub billing_cycle_anchor: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub id: String,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
}

impl StripeSubscription {
    /// Confirms Stripe reports a pending cancellation.
    pub fn ensure_cancel_scheduled(&self) -> Result<()> {
        ensure!(
            self.cancel_at_period_end,
            "stripe subscription {} is not scheduled to cancel",
            self.id
        );
        Ok(())
    }

    /// Period start, falling back to the first item or the billing cycle anchor.
    pub fn period_start(&self) -> Option<i64> {
        self.current_period_start
            .or_else(|| {
                self.items
                    .data
                    .first()
                    .and_then(|item| item.current_period_start)
            })
            .or(self.billing_cycle_anchor)
    }

    /// Period end, falling back to the first item. Newer API versions only report it per item.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end.or_else(|| {
            self.items
                .data
                .first()
                .and_then(|item| item.current_period_end)
        })
    }
}

impl StripeClient {
    pub fn new(secret_key: String, success_url: String, cancel_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            success_url,
            cancel_url,
        }
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.as_deref()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
            stripe_error_param = ?details.as_ref().and_then(|d| d.param.as_deref()),
            stripe_error_message = ?details.as_ref().and_then(|d| d.message.as_deref()),
            stripe_decline_code = ?details.as_ref().and_then(|d| d.decline_code.as_deref()),
            response_body = %body,
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// Creates a Checkout Session. `mode` is `subscription` or `payment`.
    pub async fn create_checkout_session(
        &self,
        price_id: &str,
        mode: &str,
        customer_id: Option<String>,
        customer_email: Option<String>,
        metadata: HashMap<String, String>,
    ) -> Result<StripeCheckoutSession> {
        // https://stripe.com/docs/api/checkout/sessions/create
        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), mode.to_string()),
            ("line_items[0][price]".to_string(), price_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        // Stripe rejects requests carrying both.
        match (customer_id, customer_email) {
            (Some(customer), _) => body.push(("customer".to_string(), customer)),
            (None, Some(email)) => body.push(("customer_email".to_string(), email)),
            (None, None) => {}
        }

        for (key, value) in metadata {
            if mode == "subscription" {
                body.push((format!("subscription_data[metadata][{}]", key), value.clone()));
            }
            body.push((format!("metadata[{}]", key), value));
        }

        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/checkout/sessions"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        let session: StripeCheckoutSession = resp.json().await?;
        Ok(session)
    }

    /// Marks a Stripe subscription to cancel at period end.
    pub async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<()> {
        // https://stripe.com/docs/api/subscriptions/update#update_subscription-cancel_at_period_end
        let body = [("cancel_at_period_end", "true".to_string())];
        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/subscriptions/{}", subscription_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "cancel subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        subscription.ensure_cancel_scheduled()
    }

    pub async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        // https://stripe.com/docs/api/subscriptions/retrieve
        let resp = self
            .http
            .get(format!("{STRIPE_API_BASE}/subscriptions/{}", subscription_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }

    /// Moves the subscription's single item onto `price_id`, prorating the difference.
    pub async fn change_subscription_price(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> Result<StripeSubscription> {
        let current = self.retrieve_subscription(subscription_id).await?;
        let item_id = current
            .items
            .data
            .first()
            .map(|item| item.id.clone())
            .with_context(|| format!("subscription {subscription_id} has no items"))?;

        // https://stripe.com/docs/billing/subscriptions/upgrade-downgrade
        let body = [
            ("items[0][id]", item_id),
            ("items[0][price]", price_id.to_string()),
            ("proration_behavior", "create_prorations".to_string()),
        ];
        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/subscriptions/{}", subscription_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "update subscription price").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn period_falls_back_to_first_item() {
        let subscription: StripeSubscription = serde_json::from_value(json!({
            "id": "sub_123",
            "status": "active",
            "items": {
                "data": [
                    { "id": "si_1", "current_period_start": 100, "current_period_end": 200 }
                ]
            }
        }))
        .unwrap();

        assert_eq!(subscription.period_start(), Some(100));
        assert_eq!(subscription.period_end(), Some(200));
        assert!(!subscription.cancel_at_period_end);
    }

    #[test]
    fn cancel_is_confirmed_only_when_flag_is_set() {
        let scheduled: StripeSubscription = serde_json::from_value(json!({
            "id": "sub_123",
            "cancel_at_period_end": true
        }))
        .unwrap();
        assert!(scheduled.ensure_cancel_scheduled().is_ok());

        let still_renewing: StripeSubscription = serde_json::from_value(json!({
            "id": "sub_123",
            "status": "active",
            "cancel_at_period_end": false
        }))
        .unwrap();
        let err = still_renewing.ensure_cancel_scheduled().unwrap_err();
        assert_eq!(
            err.to_string(),
            "stripe subscription sub_123 is not scheduled to cancel"
        );
    }

    #[test]
    fn period_start_falls_back_to_billing_anchor() {
        let subscription: StripeSubscription = serde_json::from_value(json!({
            "id": "sub_123",
            "billing_cycle_anchor": 50,
            "current_period_end": 300
        }))
        .unwrap();

        assert_eq!(subscription.period_start(), Some(50));
        assert_eq!(subscription.period_end(), Some(300));
        assert!(subscription.items.data.is_empty());
    }
}
