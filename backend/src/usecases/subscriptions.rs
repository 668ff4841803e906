use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result as AnyResult, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use crates::{
    domain::{
        entities::{
            plans::PlanEntity,
            subscriptions::{InsertSubscriptionEntity, PlanChangeEntity, SubscriptionEntity},
        },
        repositories::{
            plans::PlanRepository, procedures::ProcedureRepository,
            profiles::ProfileRepository, subscriptions::SubscriptionRepository,
            wallets::WalletRepository,
        },
        value_objects::{
            enums::{
                billing_cycles::BillingCycle, payment_methods::PaymentMethod,
                subscription_statuses::SubscriptionStatus,
            },
            plans::ResolvedPrice,
            proration::prorate,
            subscriptions::{
                CancelCommand, CancelSubscriptionResponse, CheckoutSessionResponse,
                RequestValidationError, SubscribeCommand, SubscribeResponse, UpgradeCommand,
                UpgradeSubscriptionResponse, WalletSubscriptionResponse,
            },
        },
    },
    payments::stripe_client::{StripeCheckoutSession, StripeClient},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::safeguards::{FraudAssessment, RateLimitDecision, Safeguards};

/// Billing period reported by the gateway after a price change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayPeriod {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Outcome of moving a subscription onto a new price.
struct WalletSettlement {
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    wallet_balance: Option<i64>,
    /// Signed wallet movement: positive was debited, negative was credited.
    settled_minor: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        mode: &str,
        customer_id: Option<String>,
        customer_email: Option<String>,
        metadata: HashMap<String, String>,
    ) -> AnyResult<StripeCheckoutSession>;

    async fn cancel_at_period_end(&self, subscription_id: &str) -> AnyResult<()>;

    async fn change_subscription_price(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> AnyResult<GatewayPeriod>;
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        mode: &str,
        customer_id: Option<String>,
        customer_email: Option<String>,
        metadata: HashMap<String, String>,
    ) -> AnyResult<StripeCheckoutSession> {
        self.create_checkout_session(price_id, mode, customer_id, customer_email, metadata)
            .await
    }

    async fn cancel_at_period_end(&self, subscription_id: &str) -> AnyResult<()> {
        self.cancel_at_period_end(subscription_id).await
    }

    async fn change_subscription_price(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> AnyResult<GatewayPeriod> {
        let subscription = self
            .change_subscription_price(subscription_id, price_id)
            .await?;

        Ok(GatewayPeriod {
            starts_at: subscription.period_start().and_then(ts_to_datetime),
            ends_at: subscription.period_end().and_then(ts_to_datetime),
        })
    }
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Plan not found or inactive")]
    PlanNotFound,
    #[error("Plan is not offered on the {0} billing cycle")]
    MissingPrice(BillingCycle),
    #[error("{0}")]
    InvalidCombination(String),
    #[error("Insufficient wallet balance")]
    InsufficientBalance,
    #[error("No active subscription found")]
    NoActiveSubscription,
    #[error("Too many requests, please try again later")]
    RateLimited,
    #[error("Request blocked by fraud checks")]
    SuspiciousActivity,
    #[error("{message}")]
    Gateway {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RequestValidationError> for SubscriptionError {
    fn from(value: RequestValidationError) -> Self {
        SubscriptionError::InvalidInput(value.to_string())
    }
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::InvalidInput(_)
            | SubscriptionError::PlanNotFound
            | SubscriptionError::MissingPrice(_)
            | SubscriptionError::InvalidCombination(_)
            | SubscriptionError::InsufficientBalance => StatusCode::BAD_REQUEST,
            SubscriptionError::NoActiveSubscription => StatusCode::NOT_FOUND,
            SubscriptionError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            SubscriptionError::SuspiciousActivity => StatusCode::FORBIDDEN,
            SubscriptionError::Gateway { .. } | SubscriptionError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

pub struct SubscriptionUseCase<P, S, Pr, W, G, R>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pr: ProfileRepository + Send + Sync + 'static,
    W: WalletRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    R: ProcedureRepository + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
    subscription_repo: Arc<S>,
    profile_repo: Arc<Pr>,
    wallet_repo: Arc<W>,
    payment_gateway: Arc<G>,
    safeguards: Arc<Safeguards<R>>,
}

impl<P, S, Pr, W, G, R> SubscriptionUseCase<P, S, Pr, W, G, R>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pr: ProfileRepository + Send + Sync + 'static,
    W: WalletRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    R: ProcedureRepository + Send + Sync + 'static,
{
    pub fn new(
        plan_repo: Arc<P>,
        subscription_repo: Arc<S>,
        profile_repo: Arc<Pr>,
        wallet_repo: Arc<W>,
        payment_gateway: Arc<G>,
        safeguards: Arc<Safeguards<R>>,
    ) -> Self {
        Self {
            plan_repo,
            subscription_repo,
            profile_repo,
            wallet_repo,
            payment_gateway,
            safeguards,
        }
    }

    pub async fn subscribe(&self, command: SubscribeCommand) -> UseCaseResult<SubscribeResponse> {
        let user_id = command.user_id;
        info!(
            %user_id,
            plan_code = %command.plan_code,
            billing_cycle = %command.billing_cycle,
            payment_method = %command.payment_method,
            "subscriptions: subscribe requested"
        );

        self.enforce_rate_limit(user_id, "subscribe").await?;

        let plan = self.load_plan(user_id, &command.plan_code).await?;
        let price = Self::resolve_price(&plan, command.billing_cycle)?;

        self.enforce_fraud_check(user_id, "subscribe", price.amount_minor)
            .await?;

        match command.payment_method {
            PaymentMethod::Wallet => self
                .subscribe_with_wallet(user_id, &plan, price)
                .await
                .map(SubscribeResponse::Activated),
            PaymentMethod::Stripe => self
                .start_checkout(user_id, &plan, price)
                .await
                .map(SubscribeResponse::Checkout),
        }
    }

    pub async fn cancel(&self, command: CancelCommand) -> UseCaseResult<CancelSubscriptionResponse> {
        let user_id = command.user_id;
        info!(%user_id, "subscriptions: cancel requested");

        let subscription = self.load_active_subscription(user_id).await?;

        if subscription.cancel_at_period_end {
            info!(
                %user_id,
                subscription_id = %subscription.id,
                "subscriptions: cancellation already scheduled"
            );
            return Ok(CancelSubscriptionResponse {
                success: true,
                message: "Subscription is already set to cancel at the end of the billing period"
                    .to_string(),
                period_end: subscription.current_period_end,
            });
        }

        // The gateway goes first so a failure there leaves the local row untouched.
        if let Some(stripe_subscription_id) = subscription.stripe_subscription_id.as_deref() {
            info!(
                %user_id,
                %stripe_subscription_id,
                "subscriptions: scheduling cancel_at_period_end at Stripe"
            );
            self.payment_gateway
                .cancel_at_period_end(stripe_subscription_id)
                .await
                .map_err(|err| {
                    error!(
                        %user_id,
                        %stripe_subscription_id,
                        error = ?err,
                        "subscriptions: stripe cancel subscription failed"
                    );
                    SubscriptionError::Gateway {
                        message: "Failed to cancel Stripe subscription",
                        source: err,
                    }
                })?;
        }

        self.subscription_repo
            .mark_cancel_at_period_end(subscription.id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    subscription_id = %subscription.id,
                    db_error = ?err,
                    "subscriptions: failed to flag subscription cancel_at_period_end"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(
            %user_id,
            subscription_id = %subscription.id,
            period_end = %subscription.current_period_end,
            "subscriptions: cancellation scheduled"
        );

        Ok(CancelSubscriptionResponse {
            success: true,
            message: "Subscription will be canceled at the end of the billing period".to_string(),
            period_end: subscription.current_period_end,
        })
    }

    pub async fn upgrade(
        &self,
        command: UpgradeCommand,
    ) -> UseCaseResult<UpgradeSubscriptionResponse> {
        let user_id = command.user_id;
        info!(
            %user_id,
            new_plan_code = %command.new_plan_code,
            new_billing_cycle = %command.new_billing_cycle,
            "subscriptions: plan change requested"
        );

        self.enforce_rate_limit(user_id, "upgrade").await?;

        let current = self.load_active_subscription(user_id).await?;
        let plan = self.load_plan(user_id, &command.new_plan_code).await?;
        let price = Self::resolve_price(&plan, command.new_billing_cycle)?;

        if current.plan_code == plan.code && current.billing_cycle == price.billing_cycle.as_str()
        {
            let err = SubscriptionError::InvalidCombination(format!(
                "Subscription is already on plan {} ({})",
                plan.code, price.billing_cycle
            ));
            warn!(
                %user_id,
                plan_code = %plan.code,
                status = err.status_code().as_u16(),
                "subscriptions: plan change to current plan"
            );
            return Err(err);
        }

        self.enforce_fraud_check(user_id, "upgrade", price.amount_minor)
            .await?;

        let reference = format!("upgrade:{}:{}", plan.code, price.billing_cycle);
        let settlement = match current.stripe_subscription_id.as_deref() {
            Some(stripe_subscription_id) => {
                let (starts_at, ends_at) = self
                    .change_gateway_price(user_id, &current, stripe_subscription_id, &price)
                    .await?;
                WalletSettlement {
                    starts_at,
                    ends_at,
                    wallet_balance: None,
                    settled_minor: 0,
                }
            }
            None => {
                self.change_wallet_plan(user_id, &current, &plan, &price, &reference)
                    .await?
            }
        };
        let period_end = settlement.ends_at;

        let plan_change = PlanChangeEntity {
            plan_code: plan.code.clone(),
            billing_cycle: price.billing_cycle.to_string(),
            price_minor: price.amount_minor,
            current_period_start: settlement.starts_at,
            current_period_end: settlement.ends_at,
            updated_at: Utc::now(),
        };

        if let Err(err) = self
            .subscription_repo
            .apply_plan_change(current.id, plan_change)
            .await
        {
            error!(
                %user_id,
                subscription_id = %current.id,
                plan_code = %plan.code,
                db_error = ?err,
                "subscriptions: failed to write plan change"
            );
            self.reverse_wallet_movement(user_id, settlement.settled_minor, &reference)
                .await;
            return Err(SubscriptionError::Internal(err));
        }

        info!(
            %user_id,
            subscription_id = %current.id,
            from_plan = %current.plan_code,
            to_plan = %plan.code,
            billing_cycle = %price.billing_cycle,
            "subscriptions: plan change completed"
        );

        Ok(UpgradeSubscriptionResponse {
            success: true,
            message: "Subscription updated".to_string(),
            subscription_id: current.id,
            plan_code: plan.code,
            billing_cycle: price.billing_cycle,
            period_end,
            wallet_balance: settlement.wallet_balance,
        })
    }

    async fn subscribe_with_wallet(
        &self,
        user_id: Uuid,
        plan: &PlanEntity,
        price: ResolvedPrice,
    ) -> UseCaseResult<WalletSubscriptionResponse> {
        if let Some(current) = self.find_active_subscription(user_id).await? {
            if current.stripe_subscription_id.is_some() {
                let err = SubscriptionError::InvalidCombination(
                    "An active Stripe subscription exists; change plans with upgrade instead"
                        .to_string(),
                );
                warn!(
                    %user_id,
                    subscription_id = %current.id,
                    status = err.status_code().as_u16(),
                    "subscriptions: wallet purchase over a gateway subscription"
                );
                return Err(err);
            }
        }

        let starts_at = Utc::now();
        let ends_at = Self::period_end(price.billing_cycle, starts_at, plan.duration_days)?;

        let reference = format!("subscribe:{}:{}", plan.code, price.billing_cycle);
        let wallet_balance = self
            .debit_wallet(user_id, i64::from(price.amount_minor), &reference)
            .await?;
        let settled_minor = if wallet_balance.is_some() {
            i64::from(price.amount_minor)
        } else {
            0
        };

        let replaced = self
            .subscription_repo
            .replace_active(InsertSubscriptionEntity {
                user_id,
                plan_code: plan.code.clone(),
                billing_cycle: price.billing_cycle.to_string(),
                price_minor: price.amount_minor,
                payment_method: PaymentMethod::Wallet.to_string(),
                status: SubscriptionStatus::Active.to_string(),
                stripe_subscription_id: None,
                // One-time purchases never renew.
                cancel_at_period_end: !price.billing_cycle.is_recurring(),
                current_period_start: starts_at,
                current_period_end: ends_at,
            })
            .await;

        let subscription_id = match replaced {
            Ok(subscription_id) => subscription_id,
            Err(err) => {
                error!(
                    %user_id,
                    plan_code = %plan.code,
                    db_error = ?err,
                    "subscriptions: failed to record subscription after wallet debit"
                );
                self.reverse_wallet_movement(user_id, settled_minor, &reference)
                    .await;
                return Err(SubscriptionError::Internal(err));
            }
        };

        info!(
            %user_id,
            %subscription_id,
            plan_code = %plan.code,
            "subscriptions: wallet subscription activated"
        );

        Ok(WalletSubscriptionResponse {
            success: true,
            message: "Subscription activated".to_string(),
            subscription_id,
            period_end: ends_at,
            wallet_balance,
        })
    }

    async fn start_checkout(
        &self,
        user_id: Uuid,
        plan: &PlanEntity,
        price: ResolvedPrice,
    ) -> UseCaseResult<CheckoutSessionResponse> {
        let price_id = Self::gateway_price_id(plan, &price)?;

        if let Some(current) = self.find_active_subscription(user_id).await? {
            if current.stripe_subscription_id.is_some() {
                let err = SubscriptionError::InvalidCombination(
                    "An active Stripe subscription exists; change plans with upgrade instead"
                        .to_string(),
                );
                warn!(
                    %user_id,
                    subscription_id = %current.id,
                    status = err.status_code().as_u16(),
                    "subscriptions: checkout over an existing gateway subscription"
                );
                return Err(err);
            }
        }

        let profile = self
            .profile_repo
            .find_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "subscriptions: failed to load profile for checkout"
                );
                SubscriptionError::Internal(err)
            })?;

        let (customer_id, customer_email) = match profile {
            Some(profile) => (profile.stripe_customer_id, profile.email),
            None => {
                warn!(%user_id, "subscriptions: no profile found, checkout without customer");
                (None, None)
            }
        };

        let metadata = HashMap::from([
            ("user_id".to_string(), user_id.to_string()),
            ("plan_code".to_string(), plan.code.clone()),
            ("billing_cycle".to_string(), price.billing_cycle.to_string()),
        ]);

        info!(
            %user_id,
            plan_code = %plan.code,
            price_id = %price_id,
            has_customer = customer_id.is_some(),
            "subscriptions: creating checkout session"
        );

        let (session, checkout_url) = self
            .payment_gateway
            .create_checkout_session(
                &price_id,
                price.billing_cycle.checkout_mode(),
                customer_id,
                customer_email,
                metadata,
            )
            .await
            .and_then(|session| match session.url.clone() {
                Some(url) => Ok((session, url)),
                None => Err(anyhow!("checkout session {} has no url", session.id)),
            })
            .map_err(|err| {
                error!(
                    %user_id,
                    plan_code = %plan.code,
                    price_id = %price_id,
                    error = ?err,
                    "subscriptions: stripe checkout session creation failed"
                );
                SubscriptionError::Gateway {
                    message: "Failed to create checkout session",
                    source: err,
                }
            })?;

        info!(
            %user_id,
            plan_code = %plan.code,
            session_id = %session.id,
            "subscriptions: checkout session created"
        );

        Ok(CheckoutSessionResponse {
            session_id: session.id,
            checkout_url,
        })
    }

    async fn change_gateway_price(
        &self,
        user_id: Uuid,
        current: &SubscriptionEntity,
        stripe_subscription_id: &str,
        price: &ResolvedPrice,
    ) -> UseCaseResult<(DateTime<Utc>, DateTime<Utc>)> {
        if !price.billing_cycle.is_recurring() {
            let err = SubscriptionError::InvalidCombination(
                "One-time billing cannot replace a recurring Stripe subscription".to_string(),
            );
            warn!(
                %user_id,
                subscription_id = %current.id,
                status = err.status_code().as_u16(),
                "subscriptions: one-time target for gateway subscription"
            );
            return Err(err);
        }

        let price_id = price.stripe_price_id.clone().ok_or_else(|| {
            let err = SubscriptionError::MissingPrice(price.billing_cycle);
            warn!(
                %user_id,
                billing_cycle = %price.billing_cycle,
                status = err.status_code().as_u16(),
                "subscriptions: target plan has no gateway price"
            );
            err
        })?;

        info!(
            %user_id,
            %stripe_subscription_id,
            price_id = %price_id,
            "subscriptions: changing stripe subscription price"
        );

        let period = self
            .payment_gateway
            .change_subscription_price(stripe_subscription_id, &price_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %stripe_subscription_id,
                    price_id = %price_id,
                    error = ?err,
                    "subscriptions: stripe subscription update failed"
                );
                SubscriptionError::Gateway {
                    message: "Failed to update Stripe subscription",
                    source: err,
                }
            })?;

        Ok((
            period.starts_at.unwrap_or(current.current_period_start),
            period.ends_at.unwrap_or(current.current_period_end),
        ))
    }

    /// Wallet plans switch immediately: unused time on the old price offsets the new one.
    async fn change_wallet_plan(
        &self,
        user_id: Uuid,
        current: &SubscriptionEntity,
        plan: &PlanEntity,
        price: &ResolvedPrice,
        reference: &str,
    ) -> UseCaseResult<WalletSettlement> {
        let now = Utc::now();
        let ends_at = Self::period_end(price.billing_cycle, now, plan.duration_days)?;
        let proration = prorate(
            current.price_minor,
            current.current_period_start,
            current.current_period_end,
            now,
            price.amount_minor,
        );

        info!(
            %user_id,
            subscription_id = %current.id,
            unused_credit_minor = proration.unused_credit_minor,
            net_minor = proration.net_minor,
            "subscriptions: wallet proration computed"
        );

        let wallet_balance = match proration.net_minor {
            net if net > 0 => self.debit_wallet(user_id, net, reference).await?,
            net if net < 0 => Some(
                self.wallet_repo
                    .credit(user_id, -net, reference)
                    .await
                    .map_err(|err| {
                        error!(
                            %user_id,
                            amount_minor = -net,
                            db_error = ?err,
                            "subscriptions: failed to refund wallet for downgrade"
                        );
                        SubscriptionError::Internal(err)
                    })?,
            ),
            _ => None,
        };

        Ok(WalletSettlement {
            starts_at: now,
            ends_at,
            wallet_balance,
            settled_minor: proration.net_minor,
        })
    }

    /// Undoes a settled wallet movement once the row write that should follow it has failed.
    /// Positive amounts were taken from the wallet, negative ones were paid into it.
    async fn reverse_wallet_movement(&self, user_id: Uuid, settled_minor: i64, reference: &str) {
        let reversal = format!("{reference}:reversal");
        let result = match settled_minor {
            0 => return,
            amount if amount > 0 => self
                .wallet_repo
                .credit(user_id, amount, &reversal)
                .await
                .map(|_| ()),
            amount => self
                .wallet_repo
                .debit(user_id, -amount, &reversal)
                .await
                .and_then(|balance| {
                    balance
                        .map(|_| ())
                        .context("wallet no longer covers the refunded amount")
                }),
        };

        match result {
            Ok(()) => warn!(
                %user_id,
                amount_minor = settled_minor,
                reference = %reversal,
                "subscriptions: wallet movement reversed"
            ),
            Err(err) => error!(
                %user_id,
                amount_minor = settled_minor,
                reference = %reversal,
                db_error = ?err,
                "subscriptions: failed to reverse wallet movement"
            ),
        }
    }

    async fn debit_wallet(
        &self,
        user_id: Uuid,
        amount_minor: i64,
        reference: &str,
    ) -> UseCaseResult<Option<i64>> {
        if amount_minor <= 0 {
            return Ok(None);
        }

        let balance = self
            .wallet_repo
            .debit(user_id, amount_minor, reference)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    amount_minor,
                    db_error = ?err,
                    "subscriptions: wallet debit failed"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = SubscriptionError::InsufficientBalance;
                warn!(
                    %user_id,
                    amount_minor,
                    status = err.status_code().as_u16(),
                    "subscriptions: insufficient wallet balance"
                );
                err
            })?;

        Ok(Some(balance))
    }

    async fn enforce_rate_limit(&self, user_id: Uuid, action: &str) -> UseCaseResult<()> {
        match self.safeguards.check_rate_limit(user_id, action).await {
            RateLimitDecision::Allowed => Ok(()),
            RateLimitDecision::Limited => Err(SubscriptionError::RateLimited),
        }
    }

    async fn enforce_fraud_check(
        &self,
        user_id: Uuid,
        action: &str,
        amount_minor: i32,
    ) -> UseCaseResult<()> {
        match self
            .safeguards
            .detect_fraud(user_id, action, i64::from(amount_minor))
            .await
        {
            FraudAssessment::Clear => Ok(()),
            FraudAssessment::Suspicious(_) => Err(SubscriptionError::SuspiciousActivity),
        }
    }

    async fn load_plan(&self, user_id: Uuid, plan_code: &str) -> UseCaseResult<PlanEntity> {
        self.plan_repo
            .find_active_by_code(plan_code)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    plan_code,
                    db_error = ?err,
                    "subscriptions: failed to load plan"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = SubscriptionError::PlanNotFound;
                warn!(
                    %user_id,
                    plan_code,
                    status = err.status_code().as_u16(),
                    "subscriptions: plan missing or inactive"
                );
                err
            })
    }

    async fn find_active_subscription(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<Option<SubscriptionEntity>> {
        self.subscription_repo
            .find_latest_active(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "subscriptions: failed to load current subscription"
                );
                SubscriptionError::Internal(err)
            })
    }

    async fn load_active_subscription(&self, user_id: Uuid) -> UseCaseResult<SubscriptionEntity> {
        self.find_active_subscription(user_id).await?.ok_or_else(|| {
            let err = SubscriptionError::NoActiveSubscription;
            warn!(
                %user_id,
                status = err.status_code().as_u16(),
                "subscriptions: no active subscription"
            );
            err
        })
    }

    fn resolve_price(plan: &PlanEntity, billing_cycle: BillingCycle) -> UseCaseResult<ResolvedPrice> {
        plan.price_for(billing_cycle).ok_or_else(|| {
            let err = SubscriptionError::MissingPrice(billing_cycle);
            warn!(
                plan_code = %plan.code,
                billing_cycle = %billing_cycle,
                status = err.status_code().as_u16(),
                "subscriptions: plan has no price for billing cycle"
            );
            err
        })
    }

    fn gateway_price_id(plan: &PlanEntity, price: &ResolvedPrice) -> UseCaseResult<String> {
        price.stripe_price_id.clone().ok_or_else(|| {
            let err = SubscriptionError::MissingPrice(price.billing_cycle);
            warn!(
                plan_code = %plan.code,
                billing_cycle = %price.billing_cycle,
                status = err.status_code().as_u16(),
                "subscriptions: plan has no stripe price for billing cycle"
            );
            err
        })
    }

    fn period_end(
        billing_cycle: BillingCycle,
        starts_at: DateTime<Utc>,
        duration_days: i32,
    ) -> UseCaseResult<DateTime<Utc>> {
        Ok(billing_cycle
            .period_end(starts_at, duration_days)
            .context("failed to compute subscription period end")?)
    }
}

fn ts_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}
