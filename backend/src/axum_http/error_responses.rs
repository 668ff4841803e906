use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::usecases::subscriptions::SubscriptionError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            SubscriptionError::Internal(err) => {
                // Don't leak internal error detail to client
                error!(error = ?err, "subscriptions: internal error");
                "Internal server error".to_string()
            }
            SubscriptionError::Gateway { message, source } => {
                error!(error = ?source, "subscriptions: {message}");
                message.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use axum::{body::to_bytes, http::StatusCode};
    use serde_json::{Value, json};

    async fn render(err: SubscriptionError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn internal_errors_hide_their_detail() {
        let (status, body) = render(SubscriptionError::Internal(anyhow!(
            "connection to server at 10.0.0.4 refused"
        )))
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn gateway_errors_render_fixed_message() {
        let (status, body) = render(SubscriptionError::Gateway {
            message: "Failed to cancel Stripe subscription",
            source: anyhow!("stripe cancel subscription failed: 500"),
        })
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "Failed to cancel Stripe subscription" })
        );
    }

    #[tokio::test]
    async fn client_errors_render_their_message() {
        let (status, body) = render(SubscriptionError::NoActiveSubscription).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "No active subscription found" }));
    }
}
