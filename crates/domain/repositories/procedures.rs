use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;

/// Named database functions taking and returning a single JSON document.
#[automock]
#[async_trait]
pub trait ProcedureRepository {
    async fn call_procedure(&self, procedure: &str, payload: Value) -> Result<Value>;
}
