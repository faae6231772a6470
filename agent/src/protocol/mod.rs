pub mod messages;
pub mod methods;
