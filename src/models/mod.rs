pub mod auth;
pub mod notification;
pub mod transaction;
pub mod wallet;
