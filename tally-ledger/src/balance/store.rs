use async_trait::async_trait;

use tally_types::{balance::BalanceValues, primitives::*};

use super::{error::BalanceError, snapshot::BalanceUpdate};

/// Where balances live. Implementations must be safe to share between tasks.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn find(
        &self,
        account: &AccountRef,
        key: &BalanceKey,
    ) -> Result<BalanceValues, BalanceError>;

    async fn find_by_id(&self, id: BalanceId) -> Result<BalanceValues, BalanceError>;

    /// Writes `update.after` if the balance is still at `update.before.version` and
    /// returns the new version. Anything else is a `VersionConflict`.
    async fn compare_and_swap(&self, update: &BalanceUpdate) -> Result<u64, BalanceError>;

    /// Writes every update or none of them.
    ///
    /// The provided implementation writes one by one and, on the first failure, puts
    /// the amounts of the already written balances back with further conditional
    /// writes. If one of those writes fails too the batch is left partially applied
    /// and `CompensationFailed` is returned instead of the original error. Stores that
    /// can write a batch atomically should override it.
    async fn compare_and_swap_all(
        &self,
        updates: &[BalanceUpdate],
    ) -> Result<Vec<u64>, BalanceError> {
        let mut versions = Vec::with_capacity(updates.len());
        for update in updates {
            match self.compare_and_swap(update).await {
                Ok(version) => versions.push(version),
                Err(e) => {
                    let mut stuck = None;
                    for (written, version) in updates.iter().zip(versions) {
                        if let Err(undo) = self
                            .compare_and_swap(&written.compensation(version))
                            .await
                        {
                            tracing::error!(
                                balance_id = %written.balance_id,
                                error = %undo,
                                "could not restore balance after a failed batch"
                            );
                            stuck.get_or_insert(written.balance_id);
                        }
                    }
                    return Err(match stuck {
                        Some(balance_id) => BalanceError::CompensationFailed { balance_id },
                        None => e,
                    });
                }
            }
        }
        Ok(versions)
    }
}
