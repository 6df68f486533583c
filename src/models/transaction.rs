use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use super::wallet::{LedgerError, Posting, Wallet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    LendingFee,
    Withdrawal,
    PlatformCommission,
    BookSale,
    Refund,
    Penalty,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionSource::LendingFee => "lending_fee",
            TransactionSource::Withdrawal => "withdrawal",
            TransactionSource::PlatformCommission => "platform_commission",
            TransactionSource::BookSale => "book_sale",
            TransactionSource::Refund => "refund",
            TransactionSource::Penalty => "penalty",
        }
    }

    /// Sources an admin may attach to a manual adjustment.
    pub fn is_adjustable(&self) -> bool {
        matches!(
            self,
            TransactionSource::Refund
                | TransactionSource::Penalty
                | TransactionSource::BookSale
                | TransactionSource::LendingFee
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for WithdrawalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(format!("unknown withdrawal status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub account_holder_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
}

impl BankDetails {
    /// Trims every field and uppercases the IFSC, then checks the Indian
    /// account-number and IFSC formats. Returns the cleaned copy.
    pub fn normalized(&self) -> Result<BankDetails, String> {
        let account_holder_name = self.account_holder_name.trim().to_string();
        if account_holder_name.is_empty() {
            return Err("Account holder name is required".into());
        }

        let account_number: String = self
            .account_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if !(9..=18).contains(&account_number.len())
            || !account_number.chars().all(|c| c.is_ascii_digit())
        {
            return Err("Account number must be 9 to 18 digits".into());
        }

        let ifsc_code = self.ifsc_code.trim().to_ascii_uppercase();
        if !is_valid_ifsc(&ifsc_code) {
            return Err("Invalid IFSC code".into());
        }

        let bank_name = self
            .bank_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        Ok(BankDetails {
            account_holder_name,
            account_number,
            ifsc_code,
            bank_name,
        })
    }

    /// Account number with everything but the last four digits hidden, for logs.
    pub fn masked_account(&self) -> String {
        let len = self.account_number.len();
        let visible = &self.account_number[len.saturating_sub(4)..];
        format!("{}{}", "*".repeat(len.saturating_sub(4)), visible)
    }
}

// Four bank letters, a literal zero, then a six character branch code.
fn is_valid_ifsc(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 11
        && bytes[..4].iter().all(u8::is_ascii_uppercase)
        && bytes[4] == b'0'
        && bytes[5..].iter().all(u8::is_ascii_alphanumeric)
}

/// Free-form audit data attached to a ledger entry. Only the fields relevant
/// to the entry's source are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WithdrawalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_details: Option<BankDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrow_request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lending_fee: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_fee: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub source: TransactionSource,
    pub description: String,
    pub balance_after: Decimal,
    #[sqlx(json)]
    pub metadata: TransactionMetadata,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn withdrawal_status(&self) -> Option<WithdrawalStatus> {
        if self.source == TransactionSource::Withdrawal {
            self.metadata.status
        } else {
            None
        }
    }
}

/// A ledger entry about to be written. Stores turn it into a [`Transaction`]
/// once the wallet mutation has been applied and `balance_after` is known.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub source: TransactionSource,
    pub description: String,
    pub metadata: TransactionMetadata,
}

impl NewTransaction {
    pub fn into_transaction(self, balance_after: Decimal) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            entry_type: self.entry_type,
            amount: self.amount,
            source: self.source,
            description: self.description,
            balance_after,
            metadata: self.metadata,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone)]
pub struct WithdrawalDecision {
    pub action: WithdrawalAction,
    pub admin_id: Uuid,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("Withdrawal request not found")]
    NotAWithdrawal,

    #[error("Withdrawal request has already been {}", .0.as_str())]
    AlreadyProcessed(WithdrawalStatus),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl Transaction {
    /// Moves a pending withdrawal request to its final state. `wallet` must be
    /// the owner's wallet, locked by the caller for the duration of the
    /// settlement. On error neither the request nor the wallet is modified.
    pub fn settle(
        &mut self,
        decision: &WithdrawalDecision,
        wallet: &mut Wallet,
    ) -> Result<(), SettlementError> {
        match self.withdrawal_status() {
            Some(WithdrawalStatus::Pending) => {}
            Some(done) => return Err(SettlementError::AlreadyProcessed(done)),
            None => return Err(SettlementError::NotAWithdrawal),
        }

        match decision.action {
            WithdrawalAction::Approve => {
                wallet.apply(Posting::Payout(self.amount))?;
                self.metadata.status = Some(WithdrawalStatus::Approved);
                self.metadata.approved_by = Some(decision.admin_id);
            }
            WithdrawalAction::Reject => {
                self.metadata.status = Some(WithdrawalStatus::Rejected);
                self.metadata.rejected_by = Some(decision.admin_id);
            }
        }

        self.metadata.admin_notes = Some(decision.notes.clone());
        self.metadata.processed_at = Some(Utc::now());
        self.balance_after = wallet.balance;
        Ok(())
    }
}
