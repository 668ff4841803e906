use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::{
    InsertSubscriptionEntity, PlanChangeEntity, SubscriptionEntity,
};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    /// Most recently created active subscription for the user.
    async fn find_latest_active(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    /// Cancels every active row of the user and inserts the new one in a single
    /// transaction. Old rows are kept for history.
    async fn replace_active(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<Uuid>;

    async fn mark_cancel_at_period_end(&self, subscription_id: Uuid) -> Result<()>;

    async fn apply_plan_change(
        &self,
        subscription_id: Uuid,
        plan_change: PlanChangeEntity,
    ) -> Result<()>;
}
