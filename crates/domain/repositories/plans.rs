use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::plans::PlanEntity;

#[automock]
#[async_trait]
pub trait PlanRepository {
    /// Inactive plans are treated the same as missing ones.
    async fn find_active_by_code(&self, plan_code: &str) -> Result<Option<PlanEntity>>;
}
