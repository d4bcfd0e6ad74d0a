use rust_decimal::{Decimal, RoundingStrategy};

use tally_types::{
    dsl::{Allocation, FromTo},
    primitives::AssetCode,
};

use super::error::{DslError, LegSide};

/// A leg whose allocation has been turned into a concrete amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLeg<'a> {
    pub leg: &'a FromTo,
    pub amount: Decimal,
}

/// Turns the allocations of one list into amounts.
///
/// Shares are rounded towards zero to `scale` decimal places when a scale is known.
/// The single `Remaining` leg, if any, takes `total` minus everything else, so any
/// rounding residue lands there. Does not check that the list adds up to `total`.
pub fn resolve_remaining<'a>(
    side: LegSide,
    asset: &AssetCode,
    legs: &'a [FromTo],
    total: Decimal,
    scale: Option<u32>,
) -> Result<Vec<ResolvedLeg<'a>>, DslError> {
    let mut remaining_idx = None;
    let mut explicit = Decimal::ZERO;
    let mut amounts = Vec::with_capacity(legs.len());

    for (index, leg) in legs.iter().enumerate() {
        let amount = match &leg.allocation {
            Allocation::Amount(amount) => {
                if *amount < Decimal::ZERO {
                    return Err(DslError::InvalidAmount {
                        side,
                        index,
                        asset: asset.clone(),
                    });
                }
                *amount
            }
            Allocation::Share {
                percentage,
                of_percentage,
            } => share_of(total, *percentage, *of_percentage, scale).ok_or_else(|| {
                DslError::InvalidShare {
                    side,
                    index,
                    asset: asset.clone(),
                }
            })?,
            Allocation::Remaining => {
                if remaining_idx.is_some() {
                    return Err(DslError::MultipleRemaining {
                        side,
                        asset: asset.clone(),
                    });
                }
                remaining_idx = Some(index);
                Decimal::ZERO
            }
        };
        explicit = explicit
            .checked_add(amount)
            .ok_or_else(|| DslError::AmountOverflow {
                side,
                index,
                asset: asset.clone(),
            })?;
        amounts.push(amount);
    }

    if let Some(index) = remaining_idx {
        let remaining = total - explicit;
        if remaining < Decimal::ZERO {
            return Err(DslError::NegativeRemaining {
                side,
                index,
                asset: asset.clone(),
            });
        }
        amounts[index] = remaining;
    }

    Ok(legs
        .iter()
        .zip(amounts)
        .map(|(leg, amount)| ResolvedLeg { leg, amount })
        .collect())
}

fn share_of(
    total: Decimal,
    percentage: Decimal,
    of_percentage: Option<Decimal>,
    scale: Option<u32>,
) -> Option<Decimal> {
    let hundred = Decimal::ONE_HUNDRED;
    let in_range = |p: Decimal| p > Decimal::ZERO && p <= hundred;
    if !in_range(percentage) || !of_percentage.map(in_range).unwrap_or(true) {
        return None;
    }
    let mut amount = total.checked_mul(percentage)? / hundred;
    if let Some(of) = of_percentage {
        amount = amount.checked_mul(of)? / hundred;
    }
    Some(match scale {
        Some(scale) => amount.round_dp_with_strategy(scale, RoundingStrategy::ToZero),
        None => amount,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use tally_types::primitives::AccountRef;

    use super::*;

    fn usd() -> AssetCode {
        "USD".parse().unwrap()
    }

    fn leg(alias: &str, allocation: Allocation) -> FromTo {
        FromTo::new(AccountRef::named(alias).unwrap(), allocation)
    }

    #[test]
    fn remaining_takes_the_rest() {
        let legs = vec![
            leg("@b", Allocation::Amount(dec!(100.00))),
            leg("@c", Allocation::Remaining),
        ];
        let resolved =
            resolve_remaining(LegSide::Destination, &usd(), &legs, dec!(300.00), Some(2)).unwrap();
        assert_eq!(resolved[0].amount, dec!(100.00));
        assert_eq!(resolved[1].amount, dec!(200.00));
        assert_eq!(resolved[1].leg.account, AccountRef::named("@c").unwrap());
    }

    #[test]
    fn remaining_may_be_zero() {
        let legs = vec![
            leg("@b", Allocation::Amount(dec!(300))),
            leg("@c", Allocation::Remaining),
        ];
        let resolved =
            resolve_remaining(LegSide::Destination, &usd(), &legs, dec!(300), None).unwrap();
        assert_eq!(resolved[1].amount, Decimal::ZERO);
    }

    #[test]
    fn over_allocation_is_negative_remaining() {
        let legs = vec![
            leg("@b", Allocation::Amount(dec!(400))),
            leg("@c", Allocation::Remaining),
        ];
        let err =
            resolve_remaining(LegSide::Destination, &usd(), &legs, dec!(300), None).unwrap_err();
        assert_eq!(
            err,
            DslError::NegativeRemaining {
                side: LegSide::Destination,
                index: 1,
                asset: usd()
            }
        );
    }

    #[test]
    fn only_one_remaining_leg_per_list() {
        let legs = vec![
            leg("@b", Allocation::Remaining),
            leg("@c", Allocation::Remaining),
        ];
        let err = resolve_remaining(LegSide::Source, &usd(), &legs, dec!(1), None).unwrap_err();
        assert!(matches!(err, DslError::MultipleRemaining { .. }));
    }

    #[test]
    fn shares_round_down_and_remaining_absorbs_residue() {
        let legs = vec![
            leg(
                "@b",
                Allocation::Share {
                    percentage: dec!(33.333),
                    of_percentage: None,
                },
            ),
            leg("@c", Allocation::Remaining),
        ];
        let resolved =
            resolve_remaining(LegSide::Destination, &usd(), &legs, dec!(100.00), Some(2))
                .unwrap();
        assert_eq!(resolved[0].amount, dec!(33.33));
        assert_eq!(resolved[1].amount, dec!(66.67));
    }

    #[test]
    fn nested_share() {
        let legs = vec![leg(
            "@b",
            Allocation::Share {
                percentage: dec!(50),
                of_percentage: Some(dec!(10)),
            },
        )];
        let resolved =
            resolve_remaining(LegSide::Destination, &usd(), &legs, dec!(200), Some(2)).unwrap();
        assert_eq!(resolved[0].amount, dec!(10));
    }

    #[test]
    fn share_out_of_range() {
        for percentage in [dec!(0), dec!(-5), dec!(100.01)] {
            let legs = vec![leg(
                "@b",
                Allocation::Share {
                    percentage,
                    of_percentage: None,
                },
            )];
            let err = resolve_remaining(LegSide::Source, &usd(), &legs, dec!(10), None)
                .unwrap_err();
            assert!(matches!(err, DslError::InvalidShare { index: 0, .. }));
        }
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let legs = vec![leg("@b", Allocation::Amount(dec!(-1)))];
        let err = resolve_remaining(LegSide::Source, &usd(), &legs, dec!(10), None).unwrap_err();
        assert!(matches!(
            err,
            DslError::InvalidAmount {
                side: LegSide::Source,
                index: 0,
                ..
            }
        ));
    }
}
