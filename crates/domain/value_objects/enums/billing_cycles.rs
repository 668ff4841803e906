use std::fmt::Display;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Yearly,
    OneTime,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
            BillingCycle::OneTime => "one_time",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(BillingCycle::Monthly),
            "yearly" => Some(BillingCycle::Yearly),
            "one_time" => Some(BillingCycle::OneTime),
            _ => None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, BillingCycle::OneTime)
    }

    /// Stripe Checkout `mode` for a purchase on this cycle.
    pub fn checkout_mode(&self) -> &'static str {
        if self.is_recurring() {
            "subscription"
        } else {
            "payment"
        }
    }

    /// End of a period that starts at `starts_at`. One-time purchases last `duration_days`.
    pub fn period_end(&self, starts_at: DateTime<Utc>, duration_days: i32) -> Option<DateTime<Utc>> {
        match self {
            BillingCycle::Monthly => starts_at.checked_add_months(Months::new(1)),
            BillingCycle::Yearly => starts_at.checked_add_months(Months::new(12)),
            BillingCycle::OneTime => {
                starts_at.checked_add_signed(Duration::days(duration_days.into()))
            }
        }
    }
}

impl Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
