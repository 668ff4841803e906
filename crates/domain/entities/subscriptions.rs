use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::subscriptions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_code: String,
    pub billing_cycle: String,
    pub price_minor: i32,
    pub payment_method: String,
    pub status: String,
    pub stripe_subscription_id: Option<String>,
    pub cancel_at_period_end: bool,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub user_id: Uuid,
    pub plan_code: String,
    pub billing_cycle: String,
    pub price_minor: i32,
    pub payment_method: String,
    pub status: String,
    pub stripe_subscription_id: Option<String>,
    pub cancel_at_period_end: bool,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

/// Plan attributes written onto an existing row by an upgrade or downgrade.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = subscriptions)]
pub struct PlanChangeEntity {
    pub plan_code: String,
    pub billing_cycle: String,
    pub price_minor: i32,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
