pub mod safeguards;
pub mod subscriptions;
