use anyhow::{Context, Result};
use std::str::FromStr;

use super::config_model::{BackendServer, Cors, Database, DotEnvyConfig, RateLimit, Stripe};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<DotEnvyConfig> {
    let required = |key: &str| -> Result<String> {
        lookup(key)
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("{key} is not set"))
    };

    let backend_server = BackendServer {
        port: parse(&required("SERVER_PORT")?, "SERVER_PORT")?,
        body_limit: parse(&required("SERVER_BODY_LIMIT")?, "SERVER_BODY_LIMIT")?,
        timeout: parse(&required("SERVER_TIMEOUT")?, "SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: optional(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let stripe = Stripe {
        secret_key: required("STRIPE_SECRET_KEY")?,
        success_url: required("STRIPE_SUCCESS_URL")?,
        cancel_url: required("STRIPE_CANCEL_URL")?,
    };

    let cors = parse_cors(lookup("CORS_ALLOWED_ORIGINS").as_deref());

    let rate_limit = RateLimit {
        max_requests: optional(&lookup, "RATE_LIMIT_MAX_REQUESTS", 10)?,
        window_seconds: optional(&lookup, "RATE_LIMIT_WINDOW_SECONDS", 3600)?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        stripe,
        cors,
        rate_limit,
    })
}

fn parse<T>(raw: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn optional<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => parse(&raw, key),
        None => Ok(default),
    }
}

fn parse_cors(raw: Option<&str>) -> Cors {
    let origins: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        Cors::AnyOrigin
    } else {
        Cors::Origins(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SERVER_PORT", "8080"),
            ("SERVER_BODY_LIMIT", "10"),
            ("SERVER_TIMEOUT", "30"),
            ("DATABASE_URL", "postgres://localhost:5432/db"),
            ("STRIPE_SECRET_KEY", "sk_test_123"),
            ("STRIPE_SUCCESS_URL", "https://app.example.com/billing/success"),
            ("STRIPE_CANCEL_URL", "https://app.example.com/billing/cancel"),
        ])
    }

    fn load_from(vars: &HashMap<&'static str, &'static str>) -> Result<DotEnvyConfig> {
        from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn loads_required_values_and_defaults() {
        let config = load_from(&base_vars()).unwrap();

        assert_eq!(config.backend_server.port, 8080);
        assert_eq!(config.backend_server.body_limit, 10);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.stripe.secret_key, "sk_test_123");
        assert_eq!(config.cors, Cors::AnyOrigin);
        assert_eq!(
            config.rate_limit,
            RateLimit {
                max_requests: 10,
                window_seconds: 3600
            }
        );
    }

    #[test]
    fn missing_required_value_is_named() {
        let mut vars = base_vars();
        vars.remove("STRIPE_SECRET_KEY");

        let err = load_from(&vars).unwrap_err();
        assert_eq!(err.to_string(), "STRIPE_SECRET_KEY is not set");
    }

    #[test]
    fn invalid_number_is_named() {
        let mut vars = base_vars();
        vars.insert("SERVER_PORT", "eighty");

        let err = load_from(&vars).unwrap_err();
        assert_eq!(err.to_string(), "SERVER_PORT is invalid");
    }

    #[test]
    fn parses_cors_origin_list() {
        let mut vars = base_vars();
        vars.insert(
            "CORS_ALLOWED_ORIGINS",
            "https://app.example.com, https://admin.example.com,",
        );

        let config = load_from(&vars).unwrap();
        assert_eq!(
            config.cors,
            Cors::Origins(vec![
                "https://app.example.com".to_string(),
                "https://admin.example.com".to_string(),
            ])
        );
    }

    #[test]
    fn wildcard_cors_means_any_origin() {
        assert_eq!(parse_cors(Some("*")), Cors::AnyOrigin);
        assert_eq!(parse_cors(Some(" ")), Cors::AnyOrigin);
    }
}
