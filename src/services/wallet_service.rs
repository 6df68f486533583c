use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        transaction::{
            BankDetails, EntryType, NewTransaction, Transaction, TransactionMetadata,
            TransactionSource, WithdrawalStatus,
        },
        wallet::WalletSummary,
    },
    services::events::WalletEvent,
    state::AppState,
    store::{Page, PageRequest, TransactionFilter, WithdrawalSubmission},
    utils::money::{format_inr, validate_amount},
};

const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalDto {
    pub amount: Decimal,
    pub bank_details: BankDetails,
}

pub async fn get_summary(state: &AppState, user_id: Uuid) -> Result<WalletSummary, AppError> {
    let wallet = state.store.get_or_create_wallet(user_id).await?;
    let reserved = state.store.reserved_for_withdrawal(user_id).await?;
    Ok(WalletSummary::new(
        &wallet,
        reserved,
        state.config.min_withdrawal,
    ))
}

pub async fn list_transactions(
    state: &AppState,
    user_id: Uuid,
    page: PageRequest,
) -> Result<Page<Transaction>, AppError> {
    state
        .store
        .list_transactions(&TransactionFilter::for_user(user_id), page)
        .await
}

pub async fn list_withdrawals(
    state: &AppState,
    user_id: Uuid,
    page: PageRequest,
) -> Result<Page<Transaction>, AppError> {
    let filter = TransactionFilter {
        user_id: Some(user_id),
        source: Some(TransactionSource::Withdrawal),
        status: None,
    };
    state.store.list_transactions(&filter, page).await
}

/// Validates and records a withdrawal request. Nothing is written when any
/// check fails; the wallet itself only changes on approval.
pub async fn request_withdrawal(
    state: &AppState,
    user_id: Uuid,
    payload: WithdrawalDto,
    idempotency_key: Option<String>,
) -> Result<WithdrawalSubmission, AppError> {
    let amount = validate_amount(payload.amount)?;
    if amount < state.config.min_withdrawal {
        return Err(AppError::AmountBelowMinimum(state.config.min_withdrawal));
    }

    let bank_details = payload
        .bank_details
        .normalized()
        .map_err(AppError::Validation)?;

    if let Some(key) = &idempotency_key {
        if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(AppError::Validation("Idempotency key is too long".into()));
        }
    }

    let masked_account = bank_details.masked_account();
    let request = NewTransaction {
        user_id,
        entry_type: EntryType::Debit,
        amount,
        source: TransactionSource::Withdrawal,
        description: format!("Withdrawal request of {}", format_inr(amount)),
        metadata: TransactionMetadata {
            status: Some(WithdrawalStatus::Pending),
            bank_details: Some(bank_details),
            idempotency_key,
            ..Default::default()
        },
    };

    let submission = state.store.submit_withdrawal(request).await?;

    match &submission {
        WithdrawalSubmission::Created(tx) => {
            info!(
                %user_id,
                request_id = %tx.id,
                %amount,
                account = %masked_account,
                "withdrawal requested"
            );
            state.events.publish(WalletEvent::WithdrawalRequested {
                user_id,
                request_id: tx.id,
                amount,
            });
        }
        WithdrawalSubmission::Existing(tx) => {
            info!(%user_id, request_id = %tx.id, "duplicate withdrawal submission ignored");
        }
    }

    Ok(submission)
}
