use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{enums::billing_cycles::BillingCycle, plans::ResolvedPrice},
    infra::db::postgres::schema::subscription_plans,
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscription_plans)]
pub struct PlanEntity {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub price_monthly: Option<i32>,
    pub price_yearly: Option<i32>,
    pub price_one_time: Option<i32>,
    pub stripe_price_monthly: Option<String>,
    pub stripe_price_yearly: Option<String>,
    pub stripe_price_one_time: Option<String>,
    pub duration_days: i32,
    pub is_active: bool,
}

impl PlanEntity {
    /// Price for the given cycle, or `None` when the plan is not sold on that cycle.
    pub fn price_for(&self, billing_cycle: BillingCycle) -> Option<ResolvedPrice> {
        let (amount, stripe_price_id) = match billing_cycle {
            BillingCycle::Monthly => (self.price_monthly, &self.stripe_price_monthly),
            BillingCycle::Yearly => (self.price_yearly, &self.stripe_price_yearly),
            BillingCycle::OneTime => (self.price_one_time, &self.stripe_price_one_time),
        };

        amount.map(|amount_minor| ResolvedPrice {
            billing_cycle,
            amount_minor,
            stripe_price_id: stripe_price_id.clone(),
        })
    }
}
