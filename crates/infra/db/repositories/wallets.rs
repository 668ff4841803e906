use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use chrono::Utc;
use diesel::{Connection, OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{wallet_transactions, wallets},
    },
};
use domain::{
    entities::wallets::InsertWalletTransactionEntity, repositories::wallets::WalletRepository,
};

pub struct WalletPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl WalletPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl WalletRepository for WalletPostgres {
    async fn debit(
        &self,
        user_id: Uuid,
        amount_minor: i64,
        reference: &str,
    ) -> Result<Option<i64>> {
        ensure!(amount_minor > 0, "debit amount must be positive");
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<Option<i64>, anyhow::Error, _>(|conn| {
            // The balance guard in the filter keeps the wallet from going negative.
            let balance = update(wallets::table)
                .filter(wallets::user_id.eq(user_id))
                .filter(wallets::balance_minor.ge(amount_minor))
                .set((
                    wallets::balance_minor.eq(wallets::balance_minor - amount_minor),
                    wallets::updated_at.eq(Utc::now()),
                ))
                .returning(wallets::balance_minor)
                .get_result::<i64>(conn)
                .optional()?;

            let Some(balance) = balance else {
                return Ok(None);
            };

            insert_into(wallet_transactions::table)
                .values(&InsertWalletTransactionEntity {
                    user_id,
                    amount_minor: -amount_minor,
                    kind: "debit".to_string(),
                    reference: reference.to_string(),
                })
                .execute(conn)?;

            Ok(Some(balance))
        })
    }

    async fn credit(&self, user_id: Uuid, amount_minor: i64, reference: &str) -> Result<i64> {
        ensure!(amount_minor > 0, "credit amount must be positive");
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<i64, anyhow::Error, _>(|conn| {
            let balance = update(wallets::table)
                .filter(wallets::user_id.eq(user_id))
                .set((
                    wallets::balance_minor.eq(wallets::balance_minor + amount_minor),
                    wallets::updated_at.eq(Utc::now()),
                ))
                .returning(wallets::balance_minor)
                .get_result::<i64>(conn)
                .optional()?
                .with_context(|| format!("wallet for user {user_id} not found"))?;

            insert_into(wallet_transactions::table)
                .values(&InsertWalletTransactionEntity {
                    user_id,
                    amount_minor,
                    kind: "credit".to_string(),
                    reference: reference.to_string(),
                })
                .execute(conn)?;

            Ok(balance)
        })
    }
}
