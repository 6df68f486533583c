use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{transaction::WithdrawalStatus, wallet::Wallet};

/// Pushed to in-process subscribers whenever the ledger changes. The web
/// client refreshes its wallet views on these.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WalletEvent {
    #[serde(rename_all = "camelCase")]
    WalletUpdated {
        user_id: Uuid,
        balance: Decimal,
        pending_earnings: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    WithdrawalRequested {
        user_id: Uuid,
        request_id: Uuid,
        amount: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    WithdrawalProcessed {
        user_id: Uuid,
        request_id: Uuid,
        status: WithdrawalStatus,
        amount: Decimal,
    },
}

impl WalletEvent {
    pub fn wallet_updated(wallet: &Wallet) -> Self {
        WalletEvent::WalletUpdated {
            user_id: wallet.user_id,
            balance: wallet.balance,
            pending_earnings: wallet.pending_earnings,
        }
    }
}

#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<WalletEvent>,
}

impl EventHub {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.sender.subscribe()
    }

    /// Fire and forget; having no subscribers is not an error.
    pub fn publish(&self, event: WalletEvent) {
        let _ = self.sender.send(event);
    }
}

/// Logs every event until the hub is dropped.
pub fn spawn_event_logger(mut receiver: broadcast::Receiver<WalletEvent>) {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => info!(?event, "wallet event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event logger lagged behind")
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
