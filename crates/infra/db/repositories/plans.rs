use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;

use crate::domain;
use crate::infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscription_plans};
use domain::{entities::plans::PlanEntity, repositories::plans::PlanRepository};

pub struct PlanPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanRepository for PlanPostgres {
    async fn find_active_by_code(&self, plan_code: &str) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let plan = subscription_plans::table
            .filter(subscription_plans::code.eq(plan_code))
            .filter(subscription_plans::is_active.eq(true))
            .select(PlanEntity::as_select())
            .first::<PlanEntity>(&mut conn)
            .optional()?;

        Ok(plan)
    }
}
