use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        notification::{Notification, NotificationKind},
        transaction::{
            EntryType, NewTransaction, Transaction, TransactionMetadata, TransactionSource,
            WithdrawalAction, WithdrawalDecision, WithdrawalStatus,
        },
        wallet::{PlatformSummary, Posting, Wallet},
    },
    services::{events::WalletEvent, notification_service::notify},
    state::AppState,
    store::{Page, PageRequest, TransactionFilter},
    utils::money::{format_inr, validate_amount},
};

const MAX_NOTE_LEN: usize = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessWithdrawalDto {
    pub action: WithdrawalAction,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentDto {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub reason: String,
    #[serde(default)]
    pub source: Option<TransactionSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendingFeeDto {
    pub borrow_request_id: String,
    pub owner_id: Uuid,
    pub lending_fee: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LendingFeeCapture {
    pub lending_fee: Decimal,
    pub platform_fee: Decimal,
    pub owner_earnings: Decimal,
    pub owner_wallet: Wallet,
    pub transactions: Vec<Transaction>,
}

/// Platform keeps `round2(fee * rate)`; the owner gets the rest, so the two
/// parts always add back up to the fee.
pub fn split_lending_fee(lending_fee: Decimal, commission_rate: Decimal) -> (Decimal, Decimal) {
    let platform_fee = (lending_fee * commission_rate)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (platform_fee, lending_fee - platform_fee)
}

pub async fn platform_summary(state: &AppState) -> Result<PlatformSummary, AppError> {
    state
        .store
        .platform_summary(state.config.platform_account_id)
        .await
}

pub async fn list_withdrawal_requests(
    state: &AppState,
    status: Option<WithdrawalStatus>,
    page: PageRequest,
) -> Result<Page<Transaction>, AppError> {
    state
        .store
        .list_transactions(&TransactionFilter::withdrawals(status), page)
        .await
}

pub async fn list_transactions(
    state: &AppState,
    filter: TransactionFilter,
    page: PageRequest,
) -> Result<Page<Transaction>, AppError> {
    state.store.list_transactions(&filter, page).await
}

pub async fn list_wallets(state: &AppState, page: PageRequest) -> Result<Page<Wallet>, AppError> {
    state.store.list_wallets(page).await
}

fn clean_notes(notes: Option<String>, action: WithdrawalAction) -> Result<String, AppError> {
    let notes = notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| match action {
            WithdrawalAction::Approve => "Withdrawal approved".to_string(),
            WithdrawalAction::Reject => "Withdrawal rejected".to_string(),
        });

    if notes.chars().count() > MAX_NOTE_LEN {
        return Err(AppError::Validation(format!(
            "Admin notes must be at most {MAX_NOTE_LEN} characters"
        )));
    }
    Ok(notes)
}

pub async fn process_withdrawal(
    state: &AppState,
    admin_id: Uuid,
    request_id: Uuid,
    payload: ProcessWithdrawalDto,
) -> Result<(Transaction, Wallet), AppError> {
    let decision = WithdrawalDecision {
        action: payload.action,
        admin_id,
        notes: clean_notes(payload.admin_notes, payload.action)?,
    };

    let (request, wallet) = state.store.settle_withdrawal(request_id, &decision).await?;
    let amount = format_inr(request.amount);

    let notification = match decision.action {
        WithdrawalAction::Approve => {
            info!(%admin_id, %request_id, user_id = %request.user_id, amount = %request.amount, "withdrawal approved");
            let account = request
                .metadata
                .bank_details
                .as_ref()
                .map(|details| details.masked_account())
                .unwrap_or_default();
            Notification::new(
                request.user_id,
                NotificationKind::WithdrawalApproved,
                "Withdrawal approved",
                format!(
                    "Your withdrawal of {amount} has been approved and will be transferred to account {account}."
                ),
                Some(request.id),
            )
        }
        WithdrawalAction::Reject => {
            info!(%admin_id, %request_id, user_id = %request.user_id, amount = %request.amount, "withdrawal rejected");
            Notification::new(
                request.user_id,
                NotificationKind::WithdrawalRejected,
                "Withdrawal rejected",
                format!(
                    "Your withdrawal request of {amount} was rejected. Reason: {}",
                    decision.notes
                ),
                Some(request.id),
            )
        }
    };
    notify(state, notification).await;

    if let Some(status) = request.withdrawal_status() {
        state.events.publish(WalletEvent::WithdrawalProcessed {
            user_id: request.user_id,
            request_id: request.id,
            status,
            amount: request.amount,
        });
    }
    state.events.publish(WalletEvent::wallet_updated(&wallet));

    Ok((request, wallet))
}

pub async fn adjust_balance(
    state: &AppState,
    admin_id: Uuid,
    payload: AdjustmentDto,
) -> Result<(Wallet, Transaction), AppError> {
    let amount = validate_amount(payload.amount)?;

    let reason = payload.reason.trim().to_string();
    if reason.is_empty() {
        return Err(AppError::Validation("A reason is required for adjustments".into()));
    }
    if reason.chars().count() > MAX_NOTE_LEN {
        return Err(AppError::Validation(format!(
            "Reason must be at most {MAX_NOTE_LEN} characters"
        )));
    }

    let source = match (payload.source, payload.entry_type) {
        (Some(source), _) if source.is_adjustable() => source,
        (Some(source), _) => {
            return Err(AppError::Validation(format!(
                "Source '{}' cannot be used for manual adjustments",
                source.as_str()
            )))
        }
        (None, EntryType::Credit) => TransactionSource::Refund,
        (None, EntryType::Debit) => TransactionSource::Penalty,
    };

    let posting = match payload.entry_type {
        EntryType::Credit => Posting::Earn(amount),
        EntryType::Debit => Posting::Deduct(amount),
    };

    let entry = NewTransaction {
        user_id: payload.user_id,
        entry_type: payload.entry_type,
        amount,
        source,
        description: format!("Admin adjustment: {reason}"),
        metadata: TransactionMetadata {
            reason: Some(reason.clone()),
            adjusted_by: Some(admin_id),
            ..Default::default()
        },
    };

    let (wallet, tx) = state
        .store
        .post(vec![(entry, posting)])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("adjustment produced no ledger entry".into()))?;

    info!(
        %admin_id,
        user_id = %payload.user_id,
        entry_type = ?payload.entry_type,
        %amount,
        "wallet adjusted"
    );

    let verb = match payload.entry_type {
        EntryType::Credit => "credited to",
        EntryType::Debit => "debited from",
    };
    notify(
        state,
        Notification::new(
            payload.user_id,
            NotificationKind::WalletAdjusted,
            "Wallet adjusted",
            format!("{} was {verb} your wallet. Reason: {reason}", format_inr(amount)),
            Some(tx.id),
        ),
    )
    .await;
    state.events.publish(WalletEvent::wallet_updated(&wallet));

    Ok((wallet, tx))
}

/// Credits the owner's share of a completed borrow and the platform's
/// commission in one atomic posting.
pub async fn capture_lending_fee(
    state: &AppState,
    payload: LendingFeeDto,
) -> Result<LendingFeeCapture, AppError> {
    let lending_fee = validate_amount(payload.lending_fee)?;
    let borrow_request_id = payload.borrow_request_id.trim().to_string();
    if borrow_request_id.is_empty() {
        return Err(AppError::Validation("Borrow request id is required".into()));
    }
    if payload.owner_id == state.config.platform_account_id {
        return Err(AppError::Validation(
            "The platform account cannot earn lending fees".into(),
        ));
    }

    let (platform_fee, owner_earnings) =
        split_lending_fee(lending_fee, state.config.commission_rate);
    if owner_earnings <= Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "Lending fee of {} leaves nothing for the owner after the {}% platform commission",
            format_inr(lending_fee),
            (state.config.commission_rate * Decimal::ONE_HUNDRED).normalize()
        )));
    }

    let metadata = TransactionMetadata {
        borrow_request_id: Some(borrow_request_id.clone()),
        lending_fee: Some(lending_fee),
        platform_fee: Some(platform_fee),
        ..Default::default()
    };

    let mut entries = vec![(
        NewTransaction {
            user_id: payload.owner_id,
            entry_type: EntryType::Credit,
            amount: owner_earnings,
            source: TransactionSource::LendingFee,
            description: format!("Lending fee for borrow request {borrow_request_id}"),
            metadata: metadata.clone(),
        },
        Posting::Earn(owner_earnings),
    )];
    if platform_fee > Decimal::ZERO {
        entries.push((
            NewTransaction {
                user_id: state.config.platform_account_id,
                entry_type: EntryType::Credit,
                amount: platform_fee,
                source: TransactionSource::PlatformCommission,
                description: format!("Platform commission for borrow request {borrow_request_id}"),
                metadata,
            },
            Posting::Earn(platform_fee),
        ));
    }

    let mut written = state.store.post(entries).await?.into_iter();
    let (owner_wallet, owner_tx) = written
        .next()
        .ok_or_else(|| AppError::Internal("lending fee produced no ledger entry".into()))?;
    let mut transactions = vec![owner_tx];
    transactions.extend(written.map(|(_, tx)| tx));

    info!(
        owner_id = %payload.owner_id,
        borrow_request_id = %borrow_request_id,
        %lending_fee,
        %platform_fee,
        %owner_earnings,
        "lending fee captured"
    );

    notify(
        state,
        Notification::new(
            payload.owner_id,
            NotificationKind::EarningsCredited,
            "Earnings credited",
            format!(
                "{} from a completed lending has been added to your wallet.",
                format_inr(owner_earnings)
            ),
            Some(transactions[0].id),
        ),
    )
    .await;
    state
        .events
        .publish(WalletEvent::wallet_updated(&owner_wallet));

    Ok(LendingFeeCapture {
        lending_fee,
        platform_fee,
        owner_earnings,
        owner_wallet,
        transactions,
    })
}
