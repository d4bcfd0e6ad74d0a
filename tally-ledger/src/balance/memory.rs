use async_trait::async_trait;
use tokio::sync::RwLock;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use sim_time::ClockHandle;
use tally_types::{balance::BalanceValues, primitives::*};

use super::{entity::NewBalance, error::BalanceError, snapshot::BalanceUpdate, store::BalanceStore};

#[derive(Default)]
struct Inner {
    balances: HashMap<BalanceId, BalanceValues>,
    by_account: HashMap<(AccountRef, BalanceKey), BalanceId>,
}

impl Inner {
    fn insert(&mut self, balance: BalanceValues) {
        self.by_account
            .insert((balance.account.clone(), balance.key.clone()), balance.id);
        self.balances.insert(balance.id, balance);
    }

    fn check(&self, update: &BalanceUpdate) -> Result<(), BalanceError> {
        match self.balances.get(&update.balance_id) {
            None => Err(BalanceError::NotFoundById(update.balance_id)),
            Some(current) if current.version != update.expected_version() => {
                Err(BalanceError::VersionConflict {
                    balance_id: update.balance_id,
                    expected: update.expected_version(),
                })
            }
            Some(_) => Ok(()),
        }
    }

    fn write(&mut self, update: &BalanceUpdate) -> u64 {
        match self.balances.get_mut(&update.balance_id) {
            Some(balance) => {
                balance.available = update.after.available;
                balance.on_hold = update.after.on_hold;
                balance.version = update.expected_version() + 1;
                balance.updated_at = update.updated_at;
                balance.version
            }
            None => update.expected_version(),
        }
    }
}

/// Balances held in process memory.
///
/// Batches are written under a single lock, so a batch is atomic. External
/// accounts exist for every asset and are opened on first lookup.
#[derive(Clone, Default)]
pub struct MemoryBalanceStore {
    inner: Arc<RwLock<Inner>>,
    clock: ClockHandle,
}

impl MemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: ClockHandle) -> Self {
        Self {
            inner: Arc::default(),
            clock,
        }
    }

    pub async fn create(&self, new_balance: NewBalance) -> Result<BalanceValues, BalanceError> {
        let mut inner = self.inner.write().await;
        let index = (new_balance.account.clone(), new_balance.key.clone());
        if inner.by_account.contains_key(&index) {
            return Err(BalanceError::AlreadyExists(index.0, index.1));
        }
        let now = self.clock.now();
        let balance = BalanceValues {
            id: BalanceId::new(),
            account_id: new_balance.account_id,
            account_type: new_balance.account_type(),
            account: new_balance.account,
            key: new_balance.key,
            asset: new_balance.asset,
            available: new_balance.available,
            on_hold: new_balance.on_hold,
            version: 1,
            allow_sending: new_balance.allow_sending,
            allow_receiving: new_balance.allow_receiving,
            created_at: now,
            updated_at: now,
        };
        inner.insert(balance.clone());
        Ok(balance)
    }

    pub async fn list(&self) -> Vec<BalanceValues> {
        let inner = self.inner.read().await;
        let mut balances: Vec<_> = inner.balances.values().cloned().collect();
        balances.sort_by(|a, b| a.id.cmp(&b.id));
        balances
    }

    fn open_external(&self, asset: &AssetCode, key: &BalanceKey) -> BalanceValues {
        let now = self.clock.now();
        BalanceValues {
            id: BalanceId::new(),
            account_id: AccountId::new(),
            account: AccountRef::external(asset),
            key: key.clone(),
            asset: asset.clone(),
            available: Default::default(),
            on_hold: Default::default(),
            version: 1,
            allow_sending: true,
            allow_receiving: true,
            account_type: AccountType::External,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl BalanceStore for MemoryBalanceStore {
    async fn find(
        &self,
        account: &AccountRef,
        key: &BalanceKey,
    ) -> Result<BalanceValues, BalanceError> {
        {
            let inner = self.inner.read().await;
            if let Some(balance) = inner
                .by_account
                .get(&(account.clone(), key.clone()))
                .and_then(|id| inner.balances.get(id))
            {
                return Ok(balance.clone());
            }
        }
        let AccountRef::External(asset) = account else {
            return Err(BalanceError::NotFound(account.clone(), key.clone()));
        };

        let mut inner = self.inner.write().await;
        // another task may have opened it while the lock was released
        if let Some(id) = inner.by_account.get(&(account.clone(), key.clone())) {
            if let Some(balance) = inner.balances.get(id) {
                return Ok(balance.clone());
            }
        }
        let balance = self.open_external(asset, key);
        inner.insert(balance.clone());
        Ok(balance)
    }

    async fn find_by_id(&self, id: BalanceId) -> Result<BalanceValues, BalanceError> {
        self.inner
            .read()
            .await
            .balances
            .get(&id)
            .cloned()
            .ok_or(BalanceError::NotFoundById(id))
    }

    async fn compare_and_swap(&self, update: &BalanceUpdate) -> Result<u64, BalanceError> {
        let mut inner = self.inner.write().await;
        inner.check(update)?;
        Ok(inner.write(update))
    }

    async fn compare_and_swap_all(
        &self,
        updates: &[BalanceUpdate],
    ) -> Result<Vec<u64>, BalanceError> {
        let mut inner = self.inner.write().await;
        let mut seen = HashSet::new();
        for update in updates {
            if !seen.insert(update.balance_id) {
                return Err(BalanceError::VersionConflict {
                    balance_id: update.balance_id,
                    expected: update.expected_version(),
                });
            }
            inner.check(update)?;
        }
        Ok(updates.iter().map(|update| inner.write(update)).collect())
    }
}
