use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::wallet_transactions;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = wallet_transactions)]
pub struct InsertWalletTransactionEntity {
    pub user_id: Uuid,
    /// Negative for debits.
    pub amount_minor: i64,
    pub kind: String,
    pub reference: String,
}
