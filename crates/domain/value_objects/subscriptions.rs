use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::enums::{
    billing_cycles::BillingCycle, payment_methods::PaymentMethod,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub user_id: Option<String>,
    pub plan_code: Option<String>,
    pub billing_cycle: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelSubscriptionRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeSubscriptionRequest {
    pub user_id: Option<String>,
    pub new_plan_code: Option<String>,
    pub new_billing_cycle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeCommand {
    pub user_id: Uuid,
    pub plan_code: String,
    pub billing_cycle: BillingCycle,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelCommand {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeCommand {
    pub user_id: Uuid,
    pub new_plan_code: String,
    pub new_billing_cycle: BillingCycle,
}

/// Collects blank or absent fields so a single error can name all of them.
struct RequiredFields {
    missing: Vec<&'static str>,
}

impl RequiredFields {
    fn new() -> Self {
        Self {
            missing: Vec::new(),
        }
    }

    fn take(&mut self, field: &'static str, value: Option<String>) -> String {
        match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            Some(value) => value,
            None => {
                self.missing.push(field);
                String::new()
            }
        }
    }

    fn finish(self) -> Result<(), RequestValidationError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(RequestValidationError::MissingFields(self.missing))
        }
    }
}

fn parse_user_id(value: &str) -> Result<Uuid, RequestValidationError> {
    Uuid::parse_str(value).map_err(|_| RequestValidationError::InvalidField {
        field: "userId",
        value: value.to_string(),
    })
}

fn parse_billing_cycle(
    field: &'static str,
    value: &str,
) -> Result<BillingCycle, RequestValidationError> {
    BillingCycle::from_str(value).ok_or_else(|| RequestValidationError::InvalidField {
        field,
        value: value.to_string(),
    })
}

impl TryFrom<SubscribeRequest> for SubscribeCommand {
    type Error = RequestValidationError;

    fn try_from(value: SubscribeRequest) -> Result<Self, Self::Error> {
        let mut fields = RequiredFields::new();
        let user_id = fields.take("userId", value.user_id);
        let plan_code = fields.take("planCode", value.plan_code);
        let billing_cycle = fields.take("billingCycle", value.billing_cycle);
        let payment_method = fields.take("paymentMethod", value.payment_method);
        fields.finish()?;

        Ok(Self {
            user_id: parse_user_id(&user_id)?,
            plan_code,
            billing_cycle: parse_billing_cycle("billingCycle", &billing_cycle)?,
            payment_method: PaymentMethod::from_str(&payment_method).ok_or(
                RequestValidationError::InvalidField {
                    field: "paymentMethod",
                    value: payment_method,
                },
            )?,
        })
    }
}

impl TryFrom<CancelSubscriptionRequest> for CancelCommand {
    type Error = RequestValidationError;

    fn try_from(value: CancelSubscriptionRequest) -> Result<Self, Self::Error> {
        let mut fields = RequiredFields::new();
        let user_id = fields.take("userId", value.user_id);
        fields.finish()?;

        Ok(Self {
            user_id: parse_user_id(&user_id)?,
        })
    }
}

impl TryFrom<UpgradeSubscriptionRequest> for UpgradeCommand {
    type Error = RequestValidationError;

    fn try_from(value: UpgradeSubscriptionRequest) -> Result<Self, Self::Error> {
        let mut fields = RequiredFields::new();
        let user_id = fields.take("userId", value.user_id);
        let new_plan_code = fields.take("newPlanCode", value.new_plan_code);
        let new_billing_cycle = fields.take("newBillingCycle", value.new_billing_cycle);
        fields.finish()?;

        Ok(Self {
            user_id: parse_user_id(&user_id)?,
            new_plan_code,
            new_billing_cycle: parse_billing_cycle("newBillingCycle", &new_billing_cycle)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSubscriptionResponse {
    pub success: bool,
    pub message: String,
    pub subscription_id: Uuid,
    pub period_end: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_balance: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub checkout_url: String,
}

/// Wallet purchases activate immediately; gateway purchases hand back a checkout redirect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubscribeResponse {
    Activated(WalletSubscriptionResponse),
    Checkout(CheckoutSessionResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelSubscriptionResponse {
    pub success: bool,
    pub message: String,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeSubscriptionResponse {
    pub success: bool,
    pub message: String,
    pub subscription_id: Uuid,
    pub plan_code: String,
    pub billing_cycle: BillingCycle,
    pub period_end: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_balance: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_ID: &str = "8d6f1c52-3f57-4c1d-9a8e-2f7b1f0f4a11";

    #[test]
    fn subscribe_request_reports_every_missing_field() {
        let request = SubscribeRequest {
            user_id: Some(USER_ID.to_string()),
            plan_code: Some("   ".to_string()),
            billing_cycle: None,
            payment_method: Some("wallet".to_string()),
        };

        let err = SubscribeCommand::try_from(request).unwrap_err();
        assert_eq!(
            err,
            RequestValidationError::MissingFields(vec!["planCode", "billingCycle"])
        );
        assert_eq!(
            err.to_string(),
            "Missing required fields: planCode, billingCycle"
        );
    }

    #[test]
    fn subscribe_request_rejects_unknown_payment_method() {
        let request = SubscribeRequest {
            user_id: Some(USER_ID.to_string()),
            plan_code: Some("pro".to_string()),
            billing_cycle: Some("monthly".to_string()),
            payment_method: Some("paypal".to_string()),
        };

        let err = SubscribeCommand::try_from(request).unwrap_err();
        assert_eq!(err.to_string(), "Invalid paymentMethod: paypal");
    }

    #[test]
    fn subscribe_request_parses_into_command() {
        let request: SubscribeRequest = serde_json::from_value(serde_json::json!({
            "userId": USER_ID,
            "planCode": "pro",
            "billingCycle": "monthly",
            "paymentMethod": "wallet"
        }))
        .unwrap();

        let command = SubscribeCommand::try_from(request).unwrap();
        assert_eq!(command.user_id, Uuid::parse_str(USER_ID).unwrap());
        assert_eq!(command.plan_code, "pro");
        assert_eq!(command.billing_cycle, BillingCycle::Monthly);
        assert_eq!(command.payment_method, PaymentMethod::Wallet);
    }

    #[test]
    fn cancel_request_requires_valid_user_id() {
        let err = CancelCommand::try_from(CancelSubscriptionRequest { user_id: None }).unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: userId");

        let err = CancelCommand::try_from(CancelSubscriptionRequest {
            user_id: Some("u2".to_string()),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid userId: u2");
    }

    #[test]
    fn checkout_response_serializes_in_camel_case() {
        let response = SubscribeResponse::Checkout(CheckoutSessionResponse {
            session_id: "cs_test_1".to_string(),
            checkout_url: "https://checkout.stripe.com/c/pay/cs_test_1".to_string(),
        });

        assert_eq!(
            serde_json::to_value(response).unwrap(),
            serde_json::json!({
                "sessionId": "cs_test_1",
                "checkoutUrl": "https://checkout.stripe.com/c/pay/cs_test_1"
            })
        );
    }
}
