use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[automock]
#[async_trait]
pub trait WalletRepository {
    /// Returns the balance after the debit, or `None` when the user cannot cover `amount_minor`.
    async fn debit(&self, user_id: Uuid, amount_minor: i64, reference: &str)
    -> Result<Option<i64>>;

    /// Returns the balance after the credit.
    async fn credit(&self, user_id: Uuid, amount_minor: i64, reference: &str) -> Result<i64>;
}
