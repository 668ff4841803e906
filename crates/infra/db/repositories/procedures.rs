use anyhow::{Result, bail};
use async_trait::async_trait;
use diesel::{RunQueryDsl, sql_types::Jsonb};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    domain::repositories::procedures::ProcedureRepository,
    infra::db::postgres::postgres_connection::PgPoolSquad,
};

#[derive(diesel::QueryableByName)]
struct ProcedureResult {
    #[diesel(sql_type = Jsonb)]
    result: Value,
}

pub struct ProcedurePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ProcedurePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// Procedure names are spliced into SQL, so only plain lowercase identifiers pass.
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[async_trait]
impl ProcedureRepository for ProcedurePostgres {
    async fn call_procedure(&self, procedure: &str, payload: Value) -> Result<Value> {
        if !is_plain_identifier(procedure) {
            bail!("invalid procedure name: {procedure}");
        }

        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = diesel::sql_query(format!("SELECT {procedure}($1) AS result"))
            .bind::<Jsonb, _>(payload)
            .get_result::<ProcedureResult>(&mut conn)?;

        Ok(row.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_snake_case_names() {
        assert!(is_plain_identifier("check_rate_limit"));
        assert!(is_plain_identifier("_internal2"));
    }

    #[test]
    fn rejects_names_that_could_alter_the_query() {
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("2fa_check"));
        assert!(!is_plain_identifier("public.check_rate_limit"));
        assert!(!is_plain_identifier("x(); DROP TABLE wallets; --"));
        assert!(!is_plain_identifier("CheckRateLimit"));
    }
}
