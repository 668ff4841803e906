use crate::{
    axum_http::{default_routers, routers},
    config::config_model::{Cors, DotEnvyConfig},
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        HeaderName, HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::infra::db::postgres::postgres_connection::PgPoolSquad;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let subscriptions = routers::subscriptions::routes(Arc::clone(&db_pool), Arc::clone(&config));
    let app = build_app(&config, subscriptions)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn build_app(config: &DotEnvyConfig, subscriptions: Router) -> Result<Router> {
    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest("/api/v1/subscriptions", subscriptions)
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(cors_layer(&config.cors)?)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

fn cors_layer(cors: &Cors) -> Result<CorsLayer> {
    let allow_origin = match cors {
        Cors::AnyOrigin => AllowOrigin::from(Any),
        Cors::Origins(origins) => AllowOrigin::list(
            origins
                .iter()
                .map(|origin| origin.parse::<HeaderValue>())
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };

    Ok(CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("apikey"),
            HeaderName::from_static("x-client-info"),
        ])
        .allow_origin(allow_origin))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = ?err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = ?err, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_model::{BackendServer, Database, RateLimit, Stripe};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        routing::post,
    };
    use tower::ServiceExt;

    fn config(cors: Cors) -> DotEnvyConfig {
        DotEnvyConfig {
            backend_server: BackendServer {
                port: 8080,
                body_limit: 1,
                timeout: 30,
            },
            database: Database {
                url: "postgres://localhost/billing".to_string(),
                max_connections: 2,
            },
            stripe: Stripe {
                secret_key: "sk_test_123".to_string(),
                success_url: "https://app.example.com/billing/success".to_string(),
                cancel_url: "https://app.example.com/billing/cancel".to_string(),
            },
            cors,
            rate_limit: RateLimit {
                max_requests: 10,
                window_seconds: 3600,
            },
        }
    }

    fn subscriptions_stub() -> Router {
        Router::new().route("/cancel", post(|| async { "stub" }))
    }

    #[tokio::test]
    async fn health_check_answers_ok() {
        let app = build_app(&config(Cors::AnyOrigin), subscriptions_stub()).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health-check")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = build_app(&config(Cors::AnyOrigin), subscriptions_stub()).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preflight_allows_client_headers() {
        let app = build_app(&config(Cors::AnyOrigin), subscriptions_stub()).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/v1/subscriptions/cancel")
                    .header("origin", "https://app.example.com")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "apikey, x-client-info")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        let allowed = headers["access-control-allow-headers"].to_str().unwrap();
        assert!(allowed.contains("apikey"));
        assert!(allowed.contains("x-client-info"));
    }

    #[tokio::test]
    async fn preflight_echoes_listed_origin() {
        let app = build_app(
            &config(Cors::Origins(vec!["https://app.example.com".to_string()])),
            subscriptions_stub(),
        )
        .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/v1/subscriptions/cancel")
                    .header("origin", "https://app.example.com")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://app.example.com"
        );
    }

    #[test]
    fn invalid_origin_fails_app_construction() {
        let result = build_app(
            &config(Cors::Origins(vec!["bad\norigin".to_string()])),
            subscriptions_stub(),
        );
        assert!(result.is_err());
    }
}
