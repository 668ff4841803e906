pub mod plans;
pub mod procedures;
pub mod profiles;
pub mod subscriptions;
pub mod wallets;
