//! Persistence for wallets, the transaction log and notifications.
//!
//! Every method that mutates a wallet is atomic: the wallet is locked, the
//! posting is applied with [`Wallet::apply`], and the ledger row is written
//! before the lock is released. Both backends share that rule so the ledger
//! arithmetic lives in exactly one place.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    notification::Notification,
    transaction::{
        NewTransaction, Transaction, TransactionSource, WithdrawalDecision, WithdrawalStatus,
    },
    wallet::{PlatformSummary, Posting, Wallet},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub user_id: Option<Uuid>,
    pub source: Option<TransactionSource>,
    pub status: Option<WithdrawalStatus>,
}

impl TransactionFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn withdrawals(status: Option<WithdrawalStatus>) -> Self {
        Self {
            source: Some(TransactionSource::Withdrawal),
            status,
            ..Default::default()
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.user_id.map_or(true, |id| tx.user_id == id)
            && self.source.map_or(true, |source| tx.source == source)
            && self
                .status
                .map_or(true, |status| tx.withdrawal_status() == Some(status))
    }
}

/// Result of submitting a withdrawal request.
#[derive(Debug, Clone)]
pub enum WithdrawalSubmission {
    Created(Transaction),
    /// A request with the same idempotency key already exists.
    Existing(Transaction),
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;

    async fn get_or_create_wallet(&self, user_id: Uuid) -> Result<Wallet, AppError>;

    async fn list_wallets(&self, page: PageRequest) -> Result<Page<Wallet>, AppError>;

    /// Newest first.
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<Page<Transaction>, AppError>;

    /// Sum of the user's withdrawal requests still in `pending`.
    async fn reserved_for_withdrawal(&self, user_id: Uuid) -> Result<Decimal, AppError>;

    /// Applies every posting to its wallet and writes the ledger rows, all or
    /// nothing. Returns the updated wallet and written entry for each input,
    /// in order.
    async fn post(
        &self,
        entries: Vec<(NewTransaction, Posting)>,
    ) -> Result<Vec<(Wallet, Transaction)>, AppError>;

    /// Records a pending withdrawal request after checking, under the wallet
    /// lock, that the amount fits in pending earnings minus what other pending
    /// requests already reserve.
    async fn submit_withdrawal(
        &self,
        request: NewTransaction,
    ) -> Result<WithdrawalSubmission, AppError>;

    async fn settle_withdrawal(
        &self,
        request_id: Uuid,
        decision: &WithdrawalDecision,
    ) -> Result<(Transaction, Wallet), AppError>;

    async fn platform_summary(&self, platform_account: Uuid) -> Result<PlatformSummary, AppError>;

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError>;

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> Result<Page<Notification>, AppError>;

    /// Returns `false` when no such notification belongs to the user.
    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;
}
