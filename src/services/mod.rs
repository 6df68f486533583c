pub mod admin_service;
pub mod events;
pub mod notification_service;
pub mod wallet_service;
