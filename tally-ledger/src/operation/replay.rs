use chrono::{DateTime, Utc};

use std::collections::HashMap;

use tally_types::{balance::BalanceSnapshot, operation::OperationValues, primitives::BalanceId};

use super::error::OperationError;

/// The state of a balance right after the last operation recorded up to `at`.
pub fn balance_at(
    operations: &[OperationValues],
    balance_id: BalanceId,
    at: DateTime<Utc>,
) -> Option<BalanceSnapshot> {
    operations
        .iter()
        .filter(|op| op.balance_id == balance_id && op.deleted_at.is_none())
        .filter(|op| op.created_at <= at)
        .max_by_key(|op| op.after.version)
        .map(|op| op.after)
}

/// Checks that each operation accounts for its amount and that the history of every
/// balance is unbroken: each operation starts from the amounts the previous one left.
///
/// Versions may skip ahead while the amounts stay put. That is the trace of writes
/// that were taken back again without being recorded.
pub fn verify_history(operations: &[OperationValues]) -> Result<(), OperationError> {
    let mut per_balance: HashMap<BalanceId, Vec<&OperationValues>> = HashMap::new();
    for op in operations.iter().filter(|op| op.deleted_at.is_none()) {
        if !op.is_consistent() {
            return Err(OperationError::Inconsistent(op.id));
        }
        per_balance.entry(op.balance_id).or_default().push(op);
    }

    for (balance_id, mut history) in per_balance {
        history.sort_by_key(|op| op.before.version);
        for pair in history.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            let same_amounts = next.before.available == prev.after.available
                && next.before.on_hold == prev.after.on_hold;
            if !same_amounts || next.before.version < prev.after.version {
                return Err(OperationError::BrokenChain {
                    balance_id,
                    expected: prev.after.version,
                    actual: next.before.version,
                });
            }
        }
    }
    Ok(())
}
