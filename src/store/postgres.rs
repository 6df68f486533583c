use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{
    postgres::PgPoolOptions, types::Json, PgConnection, PgPool, Postgres, QueryBuilder, Row,
};
use tracing::debug;
use uuid::Uuid;

use super::{Page, PageRequest, TransactionFilter, WalletStore, WithdrawalSubmission};
use crate::error::AppError;
use crate::models::{
    notification::Notification,
    transaction::{NewTransaction, Transaction, TransactionSource, WithdrawalDecision},
    wallet::{LedgerError, PlatformSummary, Posting, Wallet},
};

const LENDING_FEE_UNIQUE_INDEX: &str = "transactions_lending_fee_borrow_idx";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

async fn ensure_wallet(conn: &mut PgConnection, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO wallets (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Creates the wallet if needed and takes its row lock for the rest of the
/// enclosing database transaction.
async fn lock_wallet(conn: &mut PgConnection, user_id: Uuid) -> Result<Wallet, sqlx::Error> {
    ensure_wallet(conn, user_id).await?;
    sqlx::query_as::<_, Wallet>(
        r#"
        SELECT id, user_id, balance, total_earnings, pending_earnings, withdrawn_amount,
               created_at, updated_at
        FROM wallets
        WHERE user_id = $1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
}

async fn save_wallet(conn: &mut PgConnection, wallet: &Wallet) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE wallets
        SET balance = $1, total_earnings = $2, pending_earnings = $3, withdrawn_amount = $4,
            updated_at = $5
        WHERE user_id = $6
        "#,
    )
    .bind(wallet.balance)
    .bind(wallet.total_earnings)
    .bind(wallet.pending_earnings)
    .bind(wallet.withdrawn_amount)
    .bind(wallet.updated_at)
    .bind(wallet.user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_transaction(conn: &mut PgConnection, tx: &Transaction) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO transactions
            (id, user_id, type, amount, source, description, balance_after, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(tx.id)
    .bind(tx.user_id)
    .bind(tx.entry_type)
    .bind(tx.amount)
    .bind(tx.source)
    .bind(&tx.description)
    .bind(tx.balance_after)
    .bind(Json(&tx.metadata))
    .bind(tx.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn reserved_for(conn: &mut PgConnection, user_id: Uuid) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM transactions
        WHERE user_id = $1 AND source = 'withdrawal' AND metadata->>'status' = 'pending'
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TransactionFilter) {
    qb.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(source) = filter.source {
        qb.push(" AND source = ").push_bind(source.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND metadata->>'status' = ").push_bind(status.as_str());
    }
}

fn is_lending_fee_duplicate(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.constraint() == Some(LENDING_FEE_UNIQUE_INDEX),
        _ => false,
    }
}

#[async_trait]
impl WalletStore for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn get_or_create_wallet(&self, user_id: Uuid) -> Result<Wallet, AppError> {
        let mut conn = self.pool.acquire().await?;
        ensure_wallet(&mut conn, user_id).await?;

        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, user_id, balance, total_earnings, pending_earnings, withdrawn_amount,
                   created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(wallet)
    }

    async fn list_wallets(&self, page: PageRequest) -> Result<Page<Wallet>, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM wallets")
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, user_id, balance, total_earnings, pending_earnings, withdrawn_amount,
                   created_at, updated_at
            FROM wallets
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<Page<Transaction>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM transactions");
        push_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(
            "SELECT id, user_id, type, amount, source, description, balance_after, metadata, \
             created_at FROM transactions",
        );
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let items = select
            .build_query_as::<Transaction>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn reserved_for_withdrawal(&self, user_id: Uuid) -> Result<Decimal, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(reserved_for(&mut conn, user_id).await?)
    }

    async fn post(
        &self,
        entries: Vec<(NewTransaction, Posting)>,
    ) -> Result<Vec<(Wallet, Transaction)>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock in a fixed order so two batches touching the same wallets
        // cannot deadlock.
        let mut user_ids: Vec<Uuid> = entries.iter().map(|(entry, _)| entry.user_id).collect();
        user_ids.sort();
        user_ids.dedup();

        let mut wallets = HashMap::with_capacity(user_ids.len());
        for user_id in user_ids {
            wallets.insert(user_id, lock_wallet(&mut tx, user_id).await?);
        }

        let mut written = Vec::with_capacity(entries.len());
        for (entry, posting) in entries {
            let borrow_id = (entry.source == TransactionSource::LendingFee)
                .then(|| entry.metadata.borrow_request_id.clone())
                .flatten();

            let wallet = wallets
                .get_mut(&entry.user_id)
                .ok_or_else(|| AppError::Internal("wallet was not locked".into()))?;
            wallet.apply(posting)?;
            save_wallet(&mut tx, wallet).await?;

            let record = entry.into_transaction(wallet.balance);
            if let Err(err) = insert_transaction(&mut tx, &record).await {
                return Err(match borrow_id {
                    Some(id) if is_lending_fee_duplicate(&err) => {
                        AppError::LendingFeeAlreadyCaptured(id)
                    }
                    _ => err.into(),
                });
            }
            written.push((wallet.clone(), record));
        }

        tx.commit().await?;
        debug!(entries = written.len(), "posted ledger batch");
        Ok(written)
    }

    async fn submit_withdrawal(
        &self,
        request: NewTransaction,
    ) -> Result<WithdrawalSubmission, AppError> {
        let mut tx = self.pool.begin().await?;
        let wallet = lock_wallet(&mut tx, request.user_id).await?;

        if let Some(key) = request.metadata.idempotency_key.as_deref() {
            let existing = sqlx::query_as::<_, Transaction>(
                r#"
                SELECT id, user_id, type, amount, source, description, balance_after, metadata,
                       created_at
                FROM transactions
                WHERE user_id = $1 AND source = 'withdrawal'
                  AND metadata->>'idempotencyKey' = $2
                "#,
            )
            .bind(request.user_id)
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(existing) = existing {
                tx.rollback().await?;
                return Ok(WithdrawalSubmission::Existing(existing));
            }
        }

        let reserved = reserved_for(&mut tx, request.user_id).await?;
        let available = wallet.pending_earnings - reserved;
        if request.amount > available {
            return Err(LedgerError::InsufficientPendingEarnings {
                available: available.max(Decimal::ZERO),
                requested: request.amount,
            }
            .into());
        }

        let record = request.into_transaction(wallet.balance);
        insert_transaction(&mut tx, &record).await?;
        tx.commit().await?;

        Ok(WithdrawalSubmission::Created(record))
    }

    async fn settle_withdrawal(
        &self,
        request_id: Uuid,
        decision: &WithdrawalDecision,
    ) -> Result<(Transaction, Wallet), AppError> {
        let mut tx = self.pool.begin().await?;

        // Request row first, then the wallet: concurrent settlements of the
        // same request queue here and the later one sees the final status.
        let mut request = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, type, amount, source, description, balance_after, metadata,
                   created_at
            FROM transactions
            WHERE id = $1 AND source = 'withdrawal'
            FOR UPDATE
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::WithdrawalNotFound)?;

        let mut wallet = lock_wallet(&mut tx, request.user_id).await?;
        let before = wallet.clone();
        request.settle(decision, &mut wallet)?;

        if wallet != before {
            save_wallet(&mut tx, &wallet).await?;
        }

        sqlx::query("UPDATE transactions SET metadata = $1, balance_after = $2 WHERE id = $3")
            .bind(Json(&request.metadata))
            .bind(request.balance_after)
            .bind(request.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((request, wallet))
    }

    async fn platform_summary(&self, platform_account: Uuid) -> Result<PlatformSummary, AppError> {
        let wallets = sqlx::query(
            r#"
            SELECT COUNT(*) AS wallet_count,
                   COALESCE(SUM(balance), 0) AS total_balance,
                   COALESCE(SUM(total_earnings), 0) AS total_earnings,
                   COALESCE(SUM(pending_earnings), 0) AS total_pending_earnings,
                   COALESCE(SUM(withdrawn_amount), 0) AS total_withdrawn
            FROM wallets
            WHERE user_id <> $1
            "#,
        )
        .bind(platform_account)
        .fetch_one(&self.pool)
        .await?;

        let ledger = sqlx::query(
            r#"
            SELECT COUNT(*) AS transaction_count,
                   COALESCE(SUM(amount) FILTER (WHERE source = 'platform_commission'), 0)
                       AS total_platform_commission,
                   COUNT(*) FILTER (
                       WHERE source = 'withdrawal' AND metadata->>'status' = 'pending'
                   ) AS pending_withdrawal_count,
                   COALESCE(SUM(amount) FILTER (
                       WHERE source = 'withdrawal' AND metadata->>'status' = 'pending'
                   ), 0) AS pending_withdrawal_amount,
                   COALESCE(SUM(amount) FILTER (
                       WHERE source = 'withdrawal' AND metadata->>'status' = 'approved'
                   ), 0) AS approved_withdrawal_amount
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformSummary {
            wallet_count: wallets.try_get("wallet_count")?,
            total_balance: wallets.try_get("total_balance")?,
            total_earnings: wallets.try_get("total_earnings")?,
            total_pending_earnings: wallets.try_get("total_pending_earnings")?,
            total_withdrawn: wallets.try_get("total_withdrawn")?,
            total_platform_commission: ledger.try_get("total_platform_commission")?,
            pending_withdrawal_count: ledger.try_get("pending_withdrawal_count")?,
            pending_withdrawal_amount: ledger.try_get("pending_withdrawal_amount")?,
            approved_withdrawal_amount: ledger.try_get("approved_withdrawal_amount")?,
            transaction_count: ledger.try_get("transaction_count")?,
        })
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, user_id, kind, title, message, transaction_id, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.transaction_id)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> Result<Page<Notification>, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR NOT read)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, kind, title, message, transaction_id, read, created_at
            FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR NOT read)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
