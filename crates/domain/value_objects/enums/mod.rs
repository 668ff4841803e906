pub mod billing_cycles;
pub mod payment_methods;
pub mod subscription_statuses;
