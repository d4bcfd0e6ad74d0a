use derive_builder::Builder;

use std::sync::Arc;

use sim_time::ClockHandle;
use tally_types::amount::AssetScales;

use crate::{
    balance::BalanceStore,
    notify::{BalanceChangeNotifier, NoopNotifier},
    transaction::TransactionStore,
};

#[derive(Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct TallyLedgerConfig {
    #[builder(setter(custom))]
    pub(super) balance_store: Arc<dyn BalanceStore>,
    #[builder(setter(custom))]
    pub(super) transaction_store: Arc<dyn TransactionStore>,
    #[builder(default)]
    pub(super) asset_scales: AssetScales,
    #[builder(default)]
    pub(super) clock: ClockHandle,
    #[builder(setter(custom), default = "noop_notifier()")]
    pub(super) notifier: Arc<dyn BalanceChangeNotifier>,
}

impl TallyLedgerConfig {
    pub fn builder() -> TallyLedgerConfigBuilder {
        TallyLedgerConfigBuilder::default()
    }
}

impl TallyLedgerConfigBuilder {
    pub fn balance_store(&mut self, store: impl BalanceStore + 'static) -> &mut Self {
        self.balance_store = Some(Arc::new(store));
        self
    }

    pub fn transaction_store(&mut self, store: impl TransactionStore + 'static) -> &mut Self {
        self.transaction_store = Some(Arc::new(store));
        self
    }

    pub fn notifier(&mut self, notifier: impl BalanceChangeNotifier + 'static) -> &mut Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    fn validate(&self) -> Result<(), String> {
        match (self.balance_store.as_ref(), self.transaction_store.as_ref()) {
            (None, _) => Err("balance_store must be set".to_string()),
            (_, None) => Err("transaction_store must be set".to_string()),
            _ => Ok(()),
        }
    }
}

fn noop_notifier() -> Arc<dyn BalanceChangeNotifier> {
    Arc::new(NoopNotifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{balance::MemoryBalanceStore, transaction::MemoryTransactionStore};

    #[test]
    fn stores_are_required() {
        let err = TallyLedgerConfig::builder()
            .balance_store(MemoryBalanceStore::new())
            .build()
            .err()
            .map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("transaction_store must be set"));

        assert!(TallyLedgerConfig::builder()
            .balance_store(MemoryBalanceStore::new())
            .transaction_store(MemoryTransactionStore::new())
            .build()
            .is_ok());
    }
}
