pub mod plans;
pub mod profiles;
pub mod subscriptions;
pub mod wallets;
