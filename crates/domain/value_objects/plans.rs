use serde::Serialize;

use crate::domain::value_objects::enums::billing_cycles::BillingCycle;

/// A plan's price on one billing cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPrice {
    pub billing_cycle: BillingCycle,
    pub amount_minor: i32,
    /// Gateway price reference; only needed when paying through Stripe.
    pub stripe_price_id: Option<String>,
}
