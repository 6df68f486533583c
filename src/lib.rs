//! Wallet and withdrawal ledger for the book-lending platform.
//!
//! Owners earn a share of each lending fee; the platform keeps a commission.
//! Users request withdrawals of their pending earnings and an admin approves
//! or rejects each request. Every balance change is a ledger entry, and every
//! wallet mutation happens under a row lock together with its entry.
//!
//! The HTTP surface lives in [`routes`]; [`store`] holds the Postgres and
//! in-memory backends.

pub mod config;
pub mod controllers;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;

pub use routes::app;
pub use state::AppState;
