use std::sync::Arc;

use crate::{config::Config, services::events::EventHub, store::WalletStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WalletStore>,
    pub config: Arc<Config>,
    pub events: EventHub,
}

impl AppState {
    pub fn new(store: Arc<dyn WalletStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
            events: EventHub::new(EventHub::DEFAULT_CAPACITY),
        }
    }
}
