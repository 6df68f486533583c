use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Page, PageRequest, TransactionFilter, WalletStore, WithdrawalSubmission};
use crate::error::AppError;
use crate::models::{
    notification::Notification,
    transaction::{
        NewTransaction, Transaction, TransactionSource, WithdrawalDecision, WithdrawalStatus,
    },
    wallet::{LedgerError, PlatformSummary, Posting, Wallet},
};

/// Process-local store used by the test suite and `WALLET_STORE=memory`.
/// A single mutex is held for each whole operation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    wallets: HashMap<Uuid, Wallet>,
    // Append order is creation order.
    transactions: Vec<Transaction>,
    notifications: Vec<Notification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn wallet_mut(&mut self, user_id: Uuid) -> &mut Wallet {
        self.wallets
            .entry(user_id)
            .or_insert_with(|| Wallet::empty(user_id))
    }

    fn reserved(&self, user_id: Uuid) -> Decimal {
        self.transactions
            .iter()
            .filter(|tx| {
                tx.user_id == user_id && tx.withdrawal_status() == Some(WithdrawalStatus::Pending)
            })
            .map(|tx| tx.amount)
            .sum()
    }

    fn lending_fee_captured(&self, borrow_request_id: &str) -> bool {
        self.transactions.iter().any(|tx| {
            tx.source == TransactionSource::LendingFee
                && tx.metadata.borrow_request_id.as_deref() == Some(borrow_request_id)
        })
    }
}

fn paginate<T: Clone>(items: Vec<&T>, page: PageRequest) -> Page<T> {
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .cloned()
        .collect();
    Page {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn get_or_create_wallet(&self, user_id: Uuid) -> Result<Wallet, AppError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.wallet_mut(user_id).clone())
    }

    async fn list_wallets(&self, page: PageRequest) -> Result<Page<Wallet>, AppError> {
        let inner = self.inner.lock().await;
        let mut wallets: Vec<&Wallet> = inner.wallets.values().collect();
        wallets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(wallets, page))
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<Page<Transaction>, AppError> {
        let inner = self.inner.lock().await;
        let matching: Vec<&Transaction> = inner
            .transactions
            .iter()
            .rev()
            .filter(|tx| filter.matches(tx))
            .collect();
        Ok(paginate(matching, page))
    }

    async fn reserved_for_withdrawal(&self, user_id: Uuid) -> Result<Decimal, AppError> {
        Ok(self.inner.lock().await.reserved(user_id))
    }

    async fn post(
        &self,
        entries: Vec<(NewTransaction, Posting)>,
    ) -> Result<Vec<(Wallet, Transaction)>, AppError> {
        let mut inner = self.inner.lock().await;

        // Stage on copies so a failure part-way leaves nothing behind.
        let mut staged: HashMap<Uuid, Wallet> = HashMap::new();
        let mut written = Vec::with_capacity(entries.len());

        for (entry, posting) in entries {
            if entry.source == TransactionSource::LendingFee {
                if let Some(borrow_id) = entry.metadata.borrow_request_id.as_deref() {
                    let staged_dup = written.iter().any(|(_, tx): &(Wallet, Transaction)| {
                        tx.metadata.borrow_request_id.as_deref() == Some(borrow_id)
                    });
                    if staged_dup || inner.lending_fee_captured(borrow_id) {
                        return Err(AppError::LendingFeeAlreadyCaptured(borrow_id.to_string()));
                    }
                }
            }

            let user_id = entry.user_id;
            let wallet = staged.entry(user_id).or_insert_with(|| {
                inner
                    .wallets
                    .get(&user_id)
                    .cloned()
                    .unwrap_or_else(|| Wallet::empty(user_id))
            });
            wallet.apply(posting)?;

            let tx = entry.into_transaction(wallet.balance);
            written.push((wallet.clone(), tx));
        }

        inner.wallets.extend(staged);
        inner
            .transactions
            .extend(written.iter().map(|(_, tx)| tx.clone()));

        Ok(written)
    }

    async fn submit_withdrawal(
        &self,
        request: NewTransaction,
    ) -> Result<WithdrawalSubmission, AppError> {
        let mut inner = self.inner.lock().await;

        if let Some(key) = request.metadata.idempotency_key.as_deref() {
            let existing = inner.transactions.iter().find(|tx| {
                tx.user_id == request.user_id
                    && tx.source == TransactionSource::Withdrawal
                    && tx.metadata.idempotency_key.as_deref() == Some(key)
            });
            if let Some(existing) = existing {
                return Ok(WithdrawalSubmission::Existing(existing.clone()));
            }
        }

        let reserved = inner.reserved(request.user_id);
        let wallet = inner.wallet_mut(request.user_id).clone();
        let available = wallet.pending_earnings - reserved;
        if request.amount > available {
            return Err(LedgerError::InsufficientPendingEarnings {
                available: available.max(Decimal::ZERO),
                requested: request.amount,
            }
            .into());
        }

        let tx = request.into_transaction(wallet.balance);
        inner.transactions.push(tx.clone());
        Ok(WithdrawalSubmission::Created(tx))
    }

    async fn settle_withdrawal(
        &self,
        request_id: Uuid,
        decision: &WithdrawalDecision,
    ) -> Result<(Transaction, Wallet), AppError> {
        let mut inner = self.inner.lock().await;

        let index = inner
            .transactions
            .iter()
            .position(|tx| tx.id == request_id && tx.source == TransactionSource::Withdrawal)
            .ok_or(AppError::WithdrawalNotFound)?;

        let mut request = inner.transactions[index].clone();
        let mut wallet = inner.wallet_mut(request.user_id).clone();
        request.settle(decision, &mut wallet)?;

        inner.wallets.insert(wallet.user_id, wallet.clone());
        inner.transactions[index] = request.clone();
        Ok((request, wallet))
    }

    async fn platform_summary(&self, platform_account: Uuid) -> Result<PlatformSummary, AppError> {
        let inner = self.inner.lock().await;
        let mut summary = PlatformSummary::default();

        // Totals saturate instead of panicking; each wallet is already capped.
        for wallet in inner.wallets.values().filter(|w| w.user_id != platform_account) {
            summary.wallet_count += 1;
            summary.total_balance = summary.total_balance.saturating_add(wallet.balance);
            summary.total_earnings = summary
                .total_earnings
                .saturating_add(wallet.total_earnings);
            summary.total_pending_earnings = summary
                .total_pending_earnings
                .saturating_add(wallet.pending_earnings);
            summary.total_withdrawn = summary
                .total_withdrawn
                .saturating_add(wallet.withdrawn_amount);
        }

        for tx in &inner.transactions {
            summary.transaction_count += 1;
            match (tx.source, tx.withdrawal_status()) {
                (TransactionSource::PlatformCommission, _) => {
                    summary.total_platform_commission =
                        summary.total_platform_commission.saturating_add(tx.amount);
                }
                (TransactionSource::Withdrawal, Some(WithdrawalStatus::Pending)) => {
                    summary.pending_withdrawal_count += 1;
                    summary.pending_withdrawal_amount =
                        summary.pending_withdrawal_amount.saturating_add(tx.amount);
                }
                (TransactionSource::Withdrawal, Some(WithdrawalStatus::Approved)) => {
                    summary.approved_withdrawal_amount =
                        summary.approved_withdrawal_amount.saturating_add(tx.amount);
                }
                _ => {}
            }
        }

        Ok(summary)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.inner
            .lock()
            .await
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> Result<Page<Notification>, AppError> {
        let inner = self.inner.lock().await;
        let matching: Vec<&Notification> = inner
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.read))
            .collect();
        Ok(paginate(matching, page))
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        match inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
