use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Largest value a `NUMERIC(14, 2)` wallet or ledger column can hold.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub total_earnings: Decimal,
    pub pending_earnings: Decimal,
    pub withdrawn_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a ledger entry moves the wallet's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posting {
    /// Lending fees, commissions and admin credits: the money is earned and
    /// immediately withdrawable.
    Earn(Decimal),
    /// An approved withdrawal leaving the platform.
    Payout(Decimal),
    /// Admin debit (penalty or correction) that claws back earnings.
    Deduct(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Insufficient pending earnings")]
    InsufficientPendingEarnings { available: Decimal, requested: Decimal },

    #[error("Insufficient balance")]
    InsufficientBalance { available: Decimal, requested: Decimal },

    #[error("Wallet totals cannot exceed {}", MAX_AMOUNT)]
    LimitExceeded,
}

impl Wallet {
    pub fn empty(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            balance: Decimal::ZERO,
            total_earnings: Decimal::ZERO,
            pending_earnings: Decimal::ZERO,
            withdrawn_amount: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a posting in place. Either every counter moves or none does,
    /// and afterwards `balance == total_earnings - withdrawn_amount` and
    /// `0 <= pending_earnings <= balance` still hold.
    pub fn apply(&mut self, posting: Posting) -> Result<(), LedgerError> {
        let (balance, total_earnings, pending_earnings, withdrawn_amount) = match posting {
            Posting::Earn(amount) => {
                ensure_positive(amount)?;
                (
                    add(self.balance, amount)?,
                    add(self.total_earnings, amount)?,
                    add(self.pending_earnings, amount)?,
                    self.withdrawn_amount,
                )
            }
            Posting::Payout(amount) => {
                ensure_positive(amount)?;
                if amount > self.pending_earnings {
                    return Err(LedgerError::InsufficientPendingEarnings {
                        available: self.pending_earnings,
                        requested: amount,
                    });
                }
                (
                    sub(self.balance, amount)?,
                    self.total_earnings,
                    sub(self.pending_earnings, amount)?,
                    add(self.withdrawn_amount, amount)?,
                )
            }
            Posting::Deduct(amount) => {
                ensure_positive(amount)?;
                if amount > self.balance {
                    return Err(LedgerError::InsufficientBalance {
                        available: self.balance,
                        requested: amount,
                    });
                }
                let balance = sub(self.balance, amount)?;
                (
                    balance,
                    sub(self.total_earnings, amount)?,
                    self.pending_earnings.min(balance),
                    self.withdrawn_amount,
                )
            }
        };

        self.balance = balance;
        self.total_earnings = total_earnings;
        self.pending_earnings = pending_earnings;
        self.withdrawn_amount = withdrawn_amount;
        self.updated_at = Utc::now();
        debug_assert!(self.is_consistent());
        Ok(())
    }

    pub fn is_consistent(&self) -> bool {
        self.balance == self.total_earnings - self.withdrawn_amount
            && self.pending_earnings >= Decimal::ZERO
            && self.pending_earnings <= self.balance
            && self.withdrawn_amount >= Decimal::ZERO
    }
}

fn add(current: Decimal, amount: Decimal) -> Result<Decimal, LedgerError> {
    current
        .checked_add(amount)
        .filter(|sum| *sum <= MAX_AMOUNT)
        .ok_or(LedgerError::LimitExceeded)
}

fn sub(current: Decimal, amount: Decimal) -> Result<Decimal, LedgerError> {
    current
        .checked_sub(amount)
        .ok_or(LedgerError::LimitExceeded)
}

fn ensure_positive(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount);
    }
    Ok(())
}

/// What `GET /api/wallet/` returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub total_earnings: Decimal,
    pub pending_earnings: Decimal,
    pub withdrawn_amount: Decimal,
    /// Sum of this user's withdrawal requests still awaiting review.
    pub reserved_for_withdrawal: Decimal,
    pub available_for_withdrawal: Decimal,
    pub minimum_withdrawal: Decimal,
    pub can_withdraw: bool,
}

impl WalletSummary {
    pub fn new(wallet: &Wallet, reserved: Decimal, minimum_withdrawal: Decimal) -> Self {
        let available = (wallet.pending_earnings - reserved).max(Decimal::ZERO);
        Self {
            user_id: wallet.user_id,
            balance: wallet.balance,
            total_earnings: wallet.total_earnings,
            pending_earnings: wallet.pending_earnings,
            withdrawn_amount: wallet.withdrawn_amount,
            reserved_for_withdrawal: reserved,
            available_for_withdrawal: available,
            minimum_withdrawal,
            can_withdraw: available >= minimum_withdrawal,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSummary {
    pub wallet_count: i64,
    pub total_balance: Decimal,
    pub total_earnings: Decimal,
    pub total_pending_earnings: Decimal,
    pub total_withdrawn: Decimal,
    pub total_platform_commission: Decimal,
    pub pending_withdrawal_count: i64,
    pub pending_withdrawal_amount: Decimal,
    pub approved_withdrawal_amount: Decimal,
    pub transaction_count: i64,
}
