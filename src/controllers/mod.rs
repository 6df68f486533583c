pub mod admin_controller;
pub mod notification_controller;
pub mod wallet_controller;
