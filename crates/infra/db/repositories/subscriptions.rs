use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use diesel::{Connection, OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscriptions},
};
use domain::{
    entities::subscriptions::{InsertSubscriptionEntity, PlanChangeEntity, SubscriptionEntity},
    repositories::subscriptions::SubscriptionRepository,
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_latest_active(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .order(subscriptions::created_at.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(subscription)
    }

    async fn replace_active(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let user_id = insert_subscription_entity.user_id;

        conn.transaction::<Uuid, anyhow::Error, _>(|conn| {
            let now = Utc::now();
            update(subscriptions::table)
                .filter(subscriptions::user_id.eq(user_id))
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                .set((
                    subscriptions::status.eq(SubscriptionStatus::Canceled.to_string()),
                    subscriptions::canceled_at.eq(Some(now)),
                    subscriptions::updated_at.eq(now),
                ))
                .execute(conn)?;

            let subscription_id = insert_into(subscriptions::table)
                .values(&insert_subscription_entity)
                .returning(subscriptions::id)
                .get_result::<Uuid>(conn)?;

            Ok(subscription_id)
        })
    }

    async fn mark_cancel_at_period_end(&self, subscription_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(subscriptions::table.find(subscription_id))
            .set((
                subscriptions::cancel_at_period_end.eq(true),
                subscriptions::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        if affected == 0 {
            bail!("subscription {subscription_id} not found");
        }

        Ok(())
    }

    async fn apply_plan_change(
        &self,
        subscription_id: Uuid,
        plan_change: PlanChangeEntity,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(subscriptions::table.find(subscription_id))
            .set(&plan_change)
            .execute(&mut conn)?;

        if affected == 0 {
            bail!("subscription {subscription_id} not found");
        }

        Ok(())
    }
}
