mod entity;
pub mod error;
mod memory;
mod snapshot;
mod store;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use std::sync::Arc;

use sim_time::ClockHandle;
pub use tally_types::balance::*;
use tally_types::primitives::*;

use crate::{
    dsl::{PreparedLeg, PreparedLegs},
    notify::{BalanceChangeNotifier, BalanceChanged},
};

pub use entity::*;
use error::BalanceError;
pub use memory::MemoryBalanceStore;
pub use snapshot::BalanceUpdate;
use snapshot::*;
pub use store::BalanceStore;

/// Which phase of a transaction the legs are applied for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Sources are debited and destinations credited in one go.
    Settle,
    /// Sources move the amount to on-hold. Destinations are untouched.
    Hold,
    /// Held amounts leave the sources and destinations are credited.
    Commit,
    /// Held amounts return to available at the sources.
    Release,
}

/// A leg as it was written: the balance it touched and the state on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedLeg {
    pub leg: PreparedLeg,
    pub operation_type: OperationType,
    pub balance: BalanceValues,
    pub before: BalanceSnapshot,
    pub after: BalanceSnapshot,
}

#[derive(Clone)]
pub struct Balances {
    store: Arc<dyn BalanceStore>,
    notifier: Arc<dyn BalanceChangeNotifier>,
    clock: ClockHandle,
}

impl Balances {
    pub(crate) fn new(
        store: Arc<dyn BalanceStore>,
        notifier: Arc<dyn BalanceChangeNotifier>,
        clock: ClockHandle,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    #[instrument(name = "tally_ledger.balance.find", skip(self), err)]
    pub async fn find(
        &self,
        account: &AccountRef,
        key: &BalanceKey,
    ) -> Result<BalanceValues, BalanceError> {
        self.store.find(account, key).await
    }

    #[instrument(name = "tally_ledger.balance.find_by_id", skip(self), err)]
    pub async fn find_by_id(&self, id: BalanceId) -> Result<BalanceValues, BalanceError> {
        self.store.find_by_id(id).await
    }

    /// Applies `legs` to their balances, all of them or none.
    ///
    /// Every balance is read fresh and checked before anything is written. A version
    /// moved by a concurrent writer surfaces as `VersionConflict` and is not retried.
    #[instrument(
        name = "tally_ledger.balance.apply",
        skip(self, legs, cancel),
        fields(asset = %legs.asset, legs = legs.sources.len() + legs.destinations.len()),
        err
    )]
    pub async fn apply(
        &self,
        legs: &PreparedLegs,
        mode: ApplyMode,
        cancel: &CancellationToken,
    ) -> Result<Vec<AppliedLeg>, BalanceError> {
        if cancel.is_cancelled() {
            return Err(BalanceError::Canceled);
        }

        let mut applied = Vec::new();
        for leg in legs.legs() {
            let Some(movement) = Movement::for_leg(mode, leg.is_from) else {
                continue;
            };
            let balance = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BalanceError::Canceled),
                balance = self.store.find(&leg.account, &leg.balance_key) => balance?,
            };
            if balance.asset != legs.asset {
                return Err(BalanceError::AssetMismatch {
                    account: leg.account.clone(),
                    key: leg.balance_key.clone(),
                    expected: legs.asset.clone(),
                    actual: balance.asset,
                });
            }
            let after = next_snapshot(&balance, movement, leg.amount)?;
            applied.push(AppliedLeg {
                leg: leg.clone(),
                operation_type: movement.operation_type(),
                before: balance.snapshot(),
                after,
                balance,
            });
        }

        if cancel.is_cancelled() {
            return Err(BalanceError::Canceled);
        }

        let now = self.clock.now();
        let updates: Vec<_> = applied
            .iter()
            .map(|leg| BalanceUpdate {
                balance_id: leg.balance.id,
                before: leg.before,
                after: leg.after,
                updated_at: now,
            })
            .collect();
        let versions = self.store.compare_and_swap_all(&updates).await?;
        self.notify(&applied, &versions);
        Ok(applied)
    }

    /// Puts back the amounts an [`apply`](Self::apply) wrote, one more version per
    /// balance. Fails with `VersionConflict` when a balance moved in the meantime.
    #[instrument(
        name = "tally_ledger.balance.revert_applied",
        skip(self, applied),
        fields(legs = applied.len()),
        err
    )]
    pub(crate) async fn revert_applied(
        &self,
        applied: &[AppliedLeg],
    ) -> Result<(), BalanceError> {
        let now = self.clock.now();
        let updates: Vec<_> = applied
            .iter()
            .map(|leg| {
                BalanceUpdate {
                    balance_id: leg.balance.id,
                    before: leg.before,
                    after: leg.after,
                    updated_at: now,
                }
                .compensation(leg.after.version)
            })
            .collect();
        let versions = self.store.compare_and_swap_all(&updates).await?;
        self.notify(applied, &versions);
        Ok(())
    }

    fn notify(&self, applied: &[AppliedLeg], versions: &[u64]) {
        for (leg, version) in applied.iter().zip(versions) {
            self.notifier.balance_changed(BalanceChanged {
                balance_id: leg.balance.id,
                account: leg.balance.account.clone(),
                key: leg.balance.key.clone(),
                asset: leg.balance.asset.clone(),
                version: *version,
            });
        }
    }
}
