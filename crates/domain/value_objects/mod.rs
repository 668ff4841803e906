pub mod enums;
pub mod plans;
pub mod proration;
pub mod subscriptions;
