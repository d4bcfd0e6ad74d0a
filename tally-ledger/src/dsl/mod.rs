//! Validation and derivation of transfer requests.
//!
//! A [`Transfer`] is turned into [`PreparedLegs`]: every allocation resolved to an
//! amount, every leg tagged with its side, and both sides proven to add up to the
//! transfer value. Nothing is corrected, any inconsistency is reported as a
//! [`DslError`].

pub mod error;
mod remaining;

use rust_decimal::Decimal;
use std::collections::HashSet;

use tally_types::{
    amount::AssetScales, metadata::Metadata, operation::OperationValues, primitives::*,
    transaction::TransactionValues,
};

pub use error::*;
pub use remaining::*;
pub use tally_types::dsl::*;

/// A leg ready to be applied to a balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedLeg {
    pub account: AccountRef,
    pub balance_key: BalanceKey,
    pub amount: Decimal,
    pub is_from: bool,
    pub chart_of_accounts: Option<String>,
    pub description: Option<String>,
    pub metadata: Metadata,
    pub route: Option<String>,
}

impl PreparedLeg {
    fn from_resolved(resolved: ResolvedLeg<'_>, side: LegSide) -> Self {
        let leg = resolved.leg;
        Self {
            account: leg.account.clone(),
            balance_key: leg.balance_key(),
            amount: resolved.amount,
            is_from: side.is_from(),
            chart_of_accounts: leg.chart_of_accounts.clone(),
            description: leg.description.clone(),
            metadata: leg.metadata.clone(),
            route: leg.route.clone(),
        }
    }

    pub fn side(&self) -> LegSide {
        if self.is_from {
            LegSide::Source
        } else {
            LegSide::Destination
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedLegs {
    pub asset: AssetCode,
    pub value: Decimal,
    pub sources: Vec<PreparedLeg>,
    pub destinations: Vec<PreparedLeg>,
}

impl PreparedLegs {
    /// Sources then destinations, each in the order the caller gave them.
    pub fn legs(&self) -> impl Iterator<Item = &PreparedLeg> {
        self.sources.iter().chain(self.destinations.iter())
    }

    pub fn source_total(&self) -> Decimal {
        self.sources.iter().map(|leg| leg.amount).sum()
    }

    pub fn destination_total(&self) -> Decimal {
        self.destinations.iter().map(|leg| leg.amount).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dsl {
    scales: AssetScales,
}

impl Dsl {
    pub fn new(scales: AssetScales) -> Self {
        Self { scales }
    }

    pub fn scales(&self) -> &AssetScales {
        &self.scales
    }

    pub fn build_full_transfer(&self, transfer: &Transfer) -> Result<PreparedLegs, DslError> {
        let asset = &transfer.asset;
        let value = transfer.value;
        if value <= Decimal::ZERO {
            return Err(DslError::InvalidValue(asset.clone()));
        }
        if let Some(scale) = self.scales.scale_for(asset) {
            if !self.scales.fits(asset, value) {
                return Err(DslError::ValueScaleExceeded {
                    asset: asset.clone(),
                    scale,
                });
            }
        }

        let sources = self.prepare_side(LegSide::Source, asset, &transfer.source.from, value)?;
        let destinations =
            self.prepare_side(LegSide::Destination, asset, &transfer.distribute.to, value)?;

        let mut seen = HashSet::new();
        for leg in sources.iter().chain(destinations.iter()) {
            if !seen.insert((&leg.account, &leg.balance_key)) {
                return Err(DslError::AmbiguousAccount {
                    account: leg.account.clone(),
                    key: leg.balance_key.clone(),
                });
            }
        }

        Ok(PreparedLegs {
            asset: asset.clone(),
            value,
            sources,
            destinations,
        })
    }

    /// Value entering the ledger is drawn from the asset's external account.
    pub fn build_inflow(&self, inflow: &InflowTransfer) -> Result<PreparedLegs, DslError> {
        self.build_full_transfer(&expand_inflow(inflow))
    }

    /// Value leaving the ledger is credited to the asset's external account.
    pub fn build_outflow(&self, outflow: &OutflowTransfer) -> Result<PreparedLegs, DslError> {
        self.build_full_transfer(&expand_outflow(outflow))
    }

    /// Builds the transfer that undoes `transaction`.
    ///
    /// Only settled movements count: what was credited is debited back and what was
    /// debited is credited back, leg by leg with the original balance keys. Holds and
    /// releases cancel each other out or were never settled, so they are skipped.
    pub fn build_reversal(
        transaction: &TransactionValues,
        operations: &[OperationValues],
    ) -> Result<Transfer, DslError> {
        let mut reversal = Transfer::new(transaction.asset.clone(), Decimal::ZERO);
        let mut debited = Decimal::ZERO;

        let overflow = |side, index| DslError::AmountOverflow {
            side,
            index,
            asset: transaction.asset.clone(),
        };
        for (index, op) in operations
            .iter()
            .filter(|op| op.transaction_id == transaction.id && op.deleted_at.is_none())
            .enumerate()
        {
            let leg = FromTo::amount(op.account.clone(), op.amount)
                .with_balance_key(op.balance_key.clone());
            let leg = FromTo {
                chart_of_accounts: op.chart_of_accounts.clone(),
                route: op.route.clone(),
                description: op.description.clone(),
                ..leg
            };
            match op.operation_type {
                OperationType::Credit => {
                    reversal.value = reversal
                        .value
                        .checked_add(op.amount)
                        .ok_or_else(|| overflow(LegSide::Source, index))?;
                    reversal = reversal.with_source(leg);
                }
                OperationType::Debit => {
                    debited = debited
                        .checked_add(op.amount)
                        .ok_or_else(|| overflow(LegSide::Destination, index))?;
                    reversal = reversal.with_destination(leg);
                }
                OperationType::OnHold | OperationType::Release => (),
            }
        }

        if reversal.value.is_zero() {
            return Err(DslError::NothingToReverse(transaction.id));
        }
        if reversal.value != debited {
            return Err(DslError::UnbalancedReversal(transaction.id));
        }
        Ok(reversal)
    }

    fn prepare_side(
        &self,
        side: LegSide,
        asset: &AssetCode,
        legs: &[FromTo],
        value: Decimal,
    ) -> Result<Vec<PreparedLeg>, DslError> {
        if legs.is_empty() {
            return Err(DslError::EmptyLegs {
                side,
                asset: asset.clone(),
            });
        }
        let scale = self.scales.scale_for(asset);
        let resolved = resolve_remaining(side, asset, legs, value, scale)?;

        let mut prepared = Vec::with_capacity(resolved.len());
        let mut total = Decimal::ZERO;
        for (index, leg) in resolved.into_iter().enumerate() {
            if let Some(scale) = scale {
                if !self.scales.fits(asset, leg.amount) {
                    return Err(DslError::ScaleExceeded {
                        side,
                        index,
                        asset: asset.clone(),
                        scale,
                    });
                }
            }
            leg.leg.metadata.validate()?;
            total = total
                .checked_add(leg.amount)
                .ok_or_else(|| DslError::AmountOverflow {
                    side,
                    index,
                    asset: asset.clone(),
                })?;
            prepared.push(PreparedLeg::from_resolved(leg, side));
        }

        if total != value {
            return Err(DslError::SumMismatch {
                side,
                asset: asset.clone(),
                expected: value,
                actual: total,
            });
        }
        Ok(prepared)
    }
}

pub fn expand_inflow(inflow: &InflowTransfer) -> Transfer {
    Transfer {
        asset: inflow.asset.clone(),
        value: inflow.value,
        source: Source {
            from: vec![FromTo::amount(
                AccountRef::external(&inflow.asset),
                inflow.value,
            )],
        },
        distribute: inflow.distribute.clone(),
    }
}

pub fn expand_outflow(outflow: &OutflowTransfer) -> Transfer {
    Transfer {
        asset: outflow.asset.clone(),
        value: outflow.value,
        source: outflow.source.clone(),
        distribute: Distribute {
            to: vec![FromTo::amount(
                AccountRef::external(&outflow.asset),
                outflow.value,
            )],
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tally_types::{balance::BalanceSnapshot, status::TransactionStatus};

    use super::*;

    fn usd() -> AssetCode {
        "USD".parse().unwrap()
    }

    fn account(alias: &str) -> AccountRef {
        AccountRef::named(alias).unwrap()
    }

    fn dsl() -> Dsl {
        Dsl::new(AssetScales::new().with_scale(usd(), 2))
    }

    #[test]
    fn split_with_remaining() {
        let transfer = Transfer::new(usd(), dec!(300.00))
            .with_source(FromTo::amount(account("@A"), dec!(300.00)))
            .with_destination(FromTo::amount(account("@B"), dec!(100.00)))
            .with_destination(FromTo::remaining(account("@C")));

        let prepared = dsl().build_full_transfer(&transfer).unwrap();

        assert_eq!(prepared.sources.len(), 1);
        assert!(prepared.sources[0].is_from);
        assert_eq!(prepared.destinations[1].account, account("@C"));
        assert_eq!(prepared.destinations[1].amount, dec!(200.00));
        assert!(prepared.destinations.iter().all(|leg| !leg.is_from));
        assert_eq!(prepared.source_total(), prepared.destination_total());
    }

    #[test]
    fn inflow_draws_from_external() {
        let eur: AssetCode = "EUR".parse().unwrap();
        let inflow = InflowTransfer {
            asset: eur.clone(),
            value: dec!(50.00),
            distribute: Distribute {
                to: vec![FromTo::amount(account("@A"), dec!(50.00))],
            },
        };
        let prepared = dsl().build_inflow(&inflow).unwrap();
        assert_eq!(prepared.sources.len(), 1);
        assert_eq!(prepared.sources[0].account, AccountRef::external(&eur));
        assert_eq!(prepared.sources[0].amount, dec!(50.00));
        assert_eq!(prepared.legs().count(), 2);
    }

    #[test]
    fn outflow_credits_external() {
        let outflow = OutflowTransfer {
            asset: usd(),
            value: dec!(20),
            source: Source {
                from: vec![FromTo::remaining(account("@A"))],
            },
        };
        let prepared = dsl().build_outflow(&outflow).unwrap();
        assert_eq!(prepared.sources[0].amount, dec!(20));
        assert_eq!(
            prepared.destinations[0].account,
            AccountRef::external(&usd())
        );
    }

    #[test]
    fn sum_mismatch_names_the_side() {
        let transfer = Transfer::new(usd(), dec!(100))
            .with_source(FromTo::amount(account("@A"), dec!(100)))
            .with_destination(FromTo::amount(account("@B"), dec!(90)));
        let err = dsl().build_full_transfer(&transfer).unwrap_err();
        assert_eq!(
            err,
            DslError::SumMismatch {
                side: LegSide::Destination,
                asset: usd(),
                expected: dec!(100),
                actual: dec!(90),
            }
        );
    }

    #[test]
    fn oversized_legs_are_rejected() {
        let transfer = Transfer::new(usd(), Decimal::MAX)
            .with_source(FromTo::remaining(account("@A")))
            .with_destination(FromTo::amount(account("@B"), Decimal::MAX))
            .with_destination(FromTo::amount(account("@C"), Decimal::MAX));
        assert_eq!(
            dsl().build_full_transfer(&transfer),
            Err(DslError::AmountOverflow {
                side: LegSide::Destination,
                index: 1,
                asset: usd(),
            })
        );
    }

    #[test]
    fn rejects_invalid_values() {
        for value in [dec!(0), dec!(-10)] {
            let transfer = Transfer::new(usd(), value)
                .with_source(FromTo::remaining(account("@A")))
                .with_destination(FromTo::remaining(account("@B")));
            assert_eq!(
                dsl().build_full_transfer(&transfer),
                Err(DslError::InvalidValue(usd()))
            );
        }
    }

    #[test]
    fn rejects_excess_precision() {
        let transfer = Transfer::new(usd(), dec!(10.001))
            .with_source(FromTo::remaining(account("@A")))
            .with_destination(FromTo::remaining(account("@B")));
        assert!(matches!(
            dsl().build_full_transfer(&transfer),
            Err(DslError::ValueScaleExceeded { scale: 2, .. })
        ));

        let transfer = Transfer::new(usd(), dec!(10))
            .with_source(FromTo::remaining(account("@A")))
            .with_destination(FromTo::amount(account("@B"), dec!(0.005)))
            .with_destination(FromTo::remaining(account("@C")));
        assert!(matches!(
            dsl().build_full_transfer(&transfer),
            Err(DslError::ScaleExceeded {
                side: LegSide::Destination,
                index: 0,
                ..
            })
        ));
    }

    #[test]
    fn empty_lists_are_rejected() {
        let transfer =
            Transfer::new(usd(), dec!(10)).with_destination(FromTo::remaining(account("@B")));
        assert!(matches!(
            dsl().build_full_transfer(&transfer),
            Err(DslError::EmptyLegs {
                side: LegSide::Source,
                ..
            })
        ));
    }

    #[test]
    fn one_balance_per_transfer() {
        let transfer = Transfer::new(usd(), dec!(10))
            .with_source(FromTo::amount(account("@A"), dec!(10)))
            .with_destination(FromTo::amount(account("@A"), dec!(10)));
        assert!(matches!(
            dsl().build_full_transfer(&transfer),
            Err(DslError::AmbiguousAccount { .. })
        ));

        let bonus: BalanceKey = "bonus".parse().unwrap();
        let transfer = Transfer::new(usd(), dec!(10))
            .with_source(FromTo::amount(account("@A"), dec!(10)))
            .with_destination(FromTo::amount(account("@A"), dec!(10)).with_balance_key(bonus));
        assert!(dsl().build_full_transfer(&transfer).is_ok());
    }

    #[test]
    fn leg_metadata_is_bounded() {
        let metadata: Metadata = [("note", "x".repeat(3000))].into_iter().collect();
        let transfer = Transfer::new(usd(), dec!(10))
            .with_source(FromTo::amount(account("@A"), dec!(10)).with_metadata(metadata))
            .with_destination(FromTo::amount(account("@B"), dec!(10)));
        assert!(matches!(
            dsl().build_full_transfer(&transfer),
            Err(DslError::Metadata(_))
        ));
    }

    fn executed(
        transaction: &TransactionValues,
        alias: &str,
        operation_type: OperationType,
        amount: Decimal,
    ) -> OperationValues {
        let snapshot = BalanceSnapshot {
            available: Decimal::ZERO,
            on_hold: Decimal::ZERO,
            version: 1,
        };
        OperationValues {
            id: OperationId::new(),
            transaction_id: transaction.id,
            account: account(alias),
            account_id: AccountId::new(),
            balance_id: BalanceId::new(),
            balance_key: BalanceKey::default(),
            asset: usd(),
            operation_type,
            amount,
            before: snapshot,
            after: snapshot,
            status: TransactionStatus::Approved,
            chart_of_accounts: Some("1000".to_string()),
            description: None,
            metadata: Metadata::default(),
            route: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn approved(value: Decimal) -> TransactionValues {
        let now = Utc::now();
        let id = TransactionId::new();
        TransactionValues {
            id,
            parent_transaction_id: None,
            idempotency_key: id.to_string(),
            description: None,
            status: TransactionStatus::Approved,
            asset: usd(),
            amount: value,
            chart_of_accounts_group_name: None,
            body: None,
            metadata: Metadata::default(),
            balance_status: None,
            balance_persisted_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn reversal_swaps_executed_legs() {
        let tx = approved(dec!(300));
        let ops = vec![
            executed(&tx, "@A", OperationType::Debit, dec!(300)),
            executed(&tx, "@B", OperationType::Credit, dec!(100)),
            executed(&tx, "@C", OperationType::Credit, dec!(200)),
        ];
        let reversal = Dsl::build_reversal(&tx, &ops).unwrap();
        assert_eq!(reversal.value, dec!(300));
        assert_eq!(reversal.source.from.len(), 2);
        assert_eq!(reversal.source.from[0].account, account("@B"));
        assert_eq!(reversal.distribute.to[0].account, account("@A"));
        assert_eq!(
            reversal.distribute.to[0].chart_of_accounts.as_deref(),
            Some("1000")
        );
        assert!(dsl().build_full_transfer(&reversal).is_ok());
    }

    #[test]
    fn holds_are_not_reversed() {
        let tx = approved(dec!(10));
        let ops = vec![
            executed(&tx, "@A", OperationType::OnHold, dec!(10)),
            executed(&tx, "@A", OperationType::Release, dec!(10)),
        ];
        assert_eq!(
            Dsl::build_reversal(&tx, &ops),
            Err(DslError::NothingToReverse(tx.id))
        );
    }

    #[test]
    fn unbalanced_history_is_reported() {
        let tx = approved(dec!(10));
        let ops = vec![
            executed(&tx, "@A", OperationType::Debit, dec!(10)),
            executed(&tx, "@B", OperationType::Credit, dec!(9)),
        ];
        assert_eq!(
            Dsl::build_reversal(&tx, &ops),
            Err(DslError::UnbalancedReversal(tx.id))
        );
    }

    #[test]
    fn corrupted_history_cannot_overflow_a_reversal() {
        let tx = approved(dec!(10));
        let ops = vec![
            executed(&tx, "@A", OperationType::Debit, dec!(10)),
            executed(&tx, "@B", OperationType::Credit, Decimal::MAX),
            executed(&tx, "@C", OperationType::Credit, Decimal::MAX),
        ];
        assert_eq!(
            Dsl::build_reversal(&tx, &ops),
            Err(DslError::AmountOverflow {
                side: LegSide::Source,
                index: 2,
                asset: usd(),
            })
        );
    }
}
