use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use crates::{
    domain::{
        repositories::{
            plans::PlanRepository, procedures::ProcedureRepository,
            profiles::ProfileRepository, subscriptions::SubscriptionRepository,
            wallets::WalletRepository,
        },
        value_objects::subscriptions::{
            CancelCommand, CancelSubscriptionRequest, CancelSubscriptionResponse,
            RequestValidationError, SubscribeCommand, SubscribeRequest, SubscribeResponse,
            UpgradeCommand, UpgradeSubscriptionRequest, UpgradeSubscriptionResponse,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            plans::PlanPostgres, procedures::ProcedurePostgres, profiles::ProfilePostgres,
            subscriptions::SubscriptionPostgres, wallets::WalletPostgres,
        },
    },
    payments::stripe_client::StripeClient,
};
use tracing::warn;

use crate::{
    config::config_model::DotEnvyConfig,
    usecases::{
        safeguards::Safeguards,
        subscriptions::{PaymentGateway, SubscriptionError, SubscriptionUseCase},
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let plan_repository = PlanPostgres::new(Arc::clone(&db_pool));
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let profile_repository = ProfilePostgres::new(Arc::clone(&db_pool));
    let wallet_repository = WalletPostgres::new(Arc::clone(&db_pool));
    let procedure_repository = ProcedurePostgres::new(Arc::clone(&db_pool));

    let stripe_client = StripeClient::new(
        config.stripe.secret_key.clone(),
        config.stripe.success_url.clone(),
        config.stripe.cancel_url.clone(),
    );
    let safeguards = Safeguards::new(Arc::new(procedure_repository), config.rate_limit);

    let subscriptions_usecase = SubscriptionUseCase::new(
        Arc::new(plan_repository),
        Arc::new(subscription_repository),
        Arc::new(profile_repository),
        Arc::new(wallet_repository),
        Arc::new(stripe_client),
        Arc::new(safeguards),
    );

    router(Arc::new(subscriptions_usecase))
}

pub fn router<P, S, Pr, W, G, R>(
    subscriptions_usecase: Arc<SubscriptionUseCase<P, S, Pr, W, G, R>>,
) -> Router
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pr: ProfileRepository + Send + Sync + 'static,
    W: WalletRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    R: ProcedureRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/subscribe", post(subscribe::<P, S, Pr, W, G, R>))
        .route("/cancel", post(cancel_subscription::<P, S, Pr, W, G, R>))
        .route("/upgrade", post(upgrade_subscription::<P, S, Pr, W, G, R>))
        .with_state(subscriptions_usecase)
}

pub async fn subscribe<P, S, Pr, W, G, R>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<P, S, Pr, W, G, R>>>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<SubscribeResponse>, SubscriptionError>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pr: ProfileRepository + Send + Sync + 'static,
    W: WalletRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    R: ProcedureRepository + Send + Sync + 'static,
{
    let command: SubscribeCommand = parse_command("subscribe", payload)?;
    let response = subscriptions_usecase.subscribe(command).await?;
    Ok(Json(response))
}

pub async fn cancel_subscription<P, S, Pr, W, G, R>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<P, S, Pr, W, G, R>>>,
    payload: Result<Json<CancelSubscriptionRequest>, JsonRejection>,
) -> Result<Json<CancelSubscriptionResponse>, SubscriptionError>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pr: ProfileRepository + Send + Sync + 'static,
    W: WalletRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    R: ProcedureRepository + Send + Sync + 'static,
{
    let command: CancelCommand = parse_command("cancel", payload)?;
    let response = subscriptions_usecase.cancel(command).await?;
    Ok(Json(response))
}

pub async fn upgrade_subscription<P, S, Pr, W, G, R>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<P, S, Pr, W, G, R>>>,
    payload: Result<Json<UpgradeSubscriptionRequest>, JsonRejection>,
) -> Result<Json<UpgradeSubscriptionResponse>, SubscriptionError>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pr: ProfileRepository + Send + Sync + 'static,
    W: WalletRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    R: ProcedureRepository + Send + Sync + 'static,
{
    let command: UpgradeCommand = parse_command("upgrade", payload)?;
    let response = subscriptions_usecase.upgrade(command).await?;
    Ok(Json(response))
}

/// Malformed bodies and missing fields both end up as a 400 before any lookup runs.
fn parse_command<Req, Cmd>(
    action: &str,
    payload: Result<Json<Req>, JsonRejection>,
) -> Result<Cmd, SubscriptionError>
where
    Cmd: TryFrom<Req, Error = RequestValidationError>,
{
    let Json(request) = payload.map_err(|rejection| {
        warn!(
            action,
            status = rejection.status().as_u16(),
            reason = %rejection.body_text(),
            "subscriptions: rejected request body"
        );
        SubscriptionError::InvalidInput("Invalid JSON body".to_string())
    })?;

    Cmd::try_from(request).map_err(|err| {
        warn!(action, reason = %err, "subscriptions: request validation failed");
        SubscriptionError::from(err)
    })
}
