use std::sync::Arc;

use crates::domain::repositories::procedures::ProcedureRepository;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::config_model::RateLimit;

const RATE_LIMIT_PROCEDURE: &str = "check_rate_limit";
const FRAUD_PROCEDURE: &str = "detect_fraud_patterns";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FraudAssessment {
    Clear,
    Suspicious(String),
}

#[derive(Debug, Deserialize)]
struct RateLimitResult {
    allowed: bool,
}

#[derive(Debug, Deserialize)]
struct FraudResult {
    suspicious: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Auxiliary checks backed by database procedures.
///
/// Both checks fail open: an unreachable procedure or an unreadable answer yields
/// `Allowed` / `Clear`.
pub struct Safeguards<R>
where
    R: ProcedureRepository + Send + Sync + 'static,
{
    procedure_repo: Arc<R>,
    rate_limit: RateLimit,
}

impl<R> Safeguards<R>
where
    R: ProcedureRepository + Send + Sync + 'static,
{
    pub fn new(procedure_repo: Arc<R>, rate_limit: RateLimit) -> Self {
        Self {
            procedure_repo,
            rate_limit,
        }
    }

    pub async fn check_rate_limit(&self, user_id: Uuid, action: &str) -> RateLimitDecision {
        let payload = json!({
            "p_user_id": user_id,
            "p_action": action,
            "p_max_requests": self.rate_limit.max_requests,
            "p_window_seconds": self.rate_limit.window_seconds,
        });

        let result = self
            .procedure_repo
            .call_procedure(RATE_LIMIT_PROCEDURE, payload)
            .await
            .and_then(|value| Ok(serde_json::from_value::<RateLimitResult>(value)?));

        match result {
            Ok(RateLimitResult { allowed: true }) => RateLimitDecision::Allowed,
            Ok(RateLimitResult { allowed: false }) => {
                info!(%user_id, action, "safeguards: rate limit reached");
                RateLimitDecision::Limited
            }
            Err(err) => {
                warn!(
                    %user_id,
                    action,
                    error = ?err,
                    "safeguards: rate limit check failed, allowing request"
                );
                RateLimitDecision::Allowed
            }
        }
    }

    pub async fn detect_fraud(
        &self,
        user_id: Uuid,
        action: &str,
        amount_minor: i64,
    ) -> FraudAssessment {
        let payload = json!({
            "p_user_id": user_id,
            "p_action": action,
            "p_amount": amount_minor,
        });

        let result = self
            .procedure_repo
            .call_procedure(FRAUD_PROCEDURE, payload)
            .await
            .and_then(|value| Ok(serde_json::from_value::<FraudResult>(value)?));

        match result {
            Ok(FraudResult {
                suspicious: false, ..
            }) => FraudAssessment::Clear,
            Ok(FraudResult {
                suspicious: true,
                reason,
            }) => {
                let reason = reason.unwrap_or_else(|| "unspecified".to_string());
                warn!(%user_id, action, reason = %reason, "safeguards: suspicious activity detected");
                FraudAssessment::Suspicious(reason)
            }
            Err(err) => {
                warn!(
                    %user_id,
                    action,
                    error = ?err,
                    "safeguards: fraud detection failed, treating request as clear"
                );
                FraudAssessment::Clear
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use crates::domain::repositories::procedures::MockProcedureRepository;

    fn safeguards(repo: MockProcedureRepository) -> Safeguards<MockProcedureRepository> {
        Safeguards::new(
            Arc::new(repo),
            RateLimit {
                max_requests: 5,
                window_seconds: 60,
            },
        )
    }

    #[tokio::test]
    async fn rate_limit_passes_limits_to_procedure() {
        let user_id = Uuid::new_v4();
        let mut repo = MockProcedureRepository::new();
        repo.expect_call_procedure()
            .withf(move |name, payload| {
                name == "check_rate_limit"
                    && payload["p_user_id"] == json!(user_id)
                    && payload["p_action"] == "subscribe"
                    && payload["p_max_requests"] == 5
                    && payload["p_window_seconds"] == 60
            })
            .times(1)
            .returning(|_, _| Ok(json!({ "allowed": false })));

        let decision = safeguards(repo).check_rate_limit(user_id, "subscribe").await;
        assert_eq!(decision, RateLimitDecision::Limited);
    }

    #[tokio::test]
    async fn rate_limit_fails_open_on_error() {
        let mut repo = MockProcedureRepository::new();
        repo.expect_call_procedure()
            .returning(|_, _| Err(anyhow!("function check_rate_limit does not exist")));

        let decision = safeguards(repo)
            .check_rate_limit(Uuid::new_v4(), "subscribe")
            .await;
        assert_eq!(decision, RateLimitDecision::Allowed);
    }

    #[tokio::test]
    async fn rate_limit_fails_open_on_unreadable_result() {
        let mut repo = MockProcedureRepository::new();
        repo.expect_call_procedure()
            .returning(|_, _| Ok(json!({ "remaining": 3 })));

        let decision = safeguards(repo)
            .check_rate_limit(Uuid::new_v4(), "upgrade")
            .await;
        assert_eq!(decision, RateLimitDecision::Allowed);
    }

    #[tokio::test]
    async fn fraud_check_reports_reason() {
        let mut repo = MockProcedureRepository::new();
        repo.expect_call_procedure()
            .withf(|name, payload| name == "detect_fraud_patterns" && payload["p_amount"] == 999)
            .returning(|_, _| Ok(json!({ "suspicious": true, "reason": "velocity" })));

        let assessment = safeguards(repo)
            .detect_fraud(Uuid::new_v4(), "subscribe", 999)
            .await;
        assert_eq!(assessment, FraudAssessment::Suspicious("velocity".to_string()));
    }

    #[tokio::test]
    async fn fraud_check_fails_open_on_error() {
        let mut repo = MockProcedureRepository::new();
        repo.expect_call_procedure()
            .returning(|_, _| Err(anyhow!("connection refused")));

        let assessment = safeguards(repo)
            .detect_fraud(Uuid::new_v4(), "subscribe", 999)
            .await;
        assert_eq!(assessment, FraudAssessment::Clear);
    }
}
