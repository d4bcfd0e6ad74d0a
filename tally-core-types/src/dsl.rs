//! The request language: a [`Transfer`] moves one asset from a list of source legs to
//! a list of distribution legs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{metadata::Metadata, primitives::*};

/// How much of the transfer value a leg carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allocation {
    Amount(Decimal),
    /// `percentage`% of the total, optionally narrowed to `of_percentage`% of that.
    Share {
        percentage: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        of_percentage: Option<Decimal>,
    },
    /// Whatever is left of the total once every other leg in the list is accounted for.
    Remaining,
}

/// One leg of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromTo {
    pub account: AccountRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_key: Option<BalanceKey>,
    pub allocation: Allocation,
    /// Overwritten by validation according to the list the leg sits in.
    #[serde(default)]
    pub is_from: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_of_accounts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

impl FromTo {
    pub fn new(account: AccountRef, allocation: Allocation) -> Self {
        Self {
            account,
            balance_key: None,
            allocation,
            is_from: false,
            chart_of_accounts: None,
            description: None,
            metadata: Metadata::default(),
            route: None,
        }
    }

    /// Parses `@alias` or `@alias#key` into a leg.
    pub fn parse(account: &str, allocation: Allocation) -> Result<Self, ParsePrimitiveError> {
        let (account, key) = AccountRef::parse_with_key(account)?;
        let mut leg = Self::new(account, allocation);
        if !key.is_default() {
            leg.balance_key = Some(key);
        }
        Ok(leg)
    }

    pub fn amount(account: AccountRef, value: Decimal) -> Self {
        Self::new(account, Allocation::Amount(value))
    }

    pub fn share(account: AccountRef, percentage: Decimal) -> Self {
        Self::new(
            account,
            Allocation::Share {
                percentage,
                of_percentage: None,
            },
        )
    }

    pub fn remaining(account: AccountRef) -> Self {
        Self::new(account, Allocation::Remaining)
    }

    pub fn with_balance_key(mut self, key: BalanceKey) -> Self {
        self.balance_key = Some(key);
        self
    }

    pub fn with_chart_of_accounts(mut self, code: impl Into<String>) -> Self {
        self.chart_of_accounts = Some(code.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn balance_key(&self) -> BalanceKey {
        self.balance_key.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub from: Vec<FromTo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribute {
    pub to: Vec<FromTo>,
}

/// The `send` block of a request: `value` of `asset` leaves `source` and lands in
/// `distribute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub asset: AssetCode,
    pub value: Decimal,
    pub source: Source,
    pub distribute: Distribute,
}

impl Transfer {
    pub fn new(asset: AssetCode, value: Decimal) -> Self {
        Self {
            asset,
            value,
            source: Source::default(),
            distribute: Distribute::default(),
        }
    }

    pub fn with_source(mut self, leg: FromTo) -> Self {
        self.source.from.push(leg);
        self
    }

    pub fn with_destination(mut self, leg: FromTo) -> Self {
        self.distribute.to.push(leg);
        self
    }
}

/// Money entering the ledger: only the distribution side is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InflowTransfer {
    pub asset: AssetCode,
    pub value: Decimal,
    pub distribute: Distribute,
}

/// Money leaving the ledger: only the source side is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutflowTransfer {
    pub asset: AssetCode,
    pub value: Decimal,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_of_accounts_group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    pub send: Transfer,
}

impl TransactionInput {
    pub fn new(send: Transfer) -> Self {
        Self {
            description: None,
            chart_of_accounts_group_name: None,
            idempotency_key: None,
            pending: false,
            metadata: Metadata::default(),
            send,
        }
    }

    pub fn pending(mut self) -> Self {
        self.pending = true;
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InflowInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_of_accounts_group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    pub send: InflowTransfer,
}

impl InflowInput {
    pub fn new(send: InflowTransfer) -> Self {
        Self {
            description: None,
            chart_of_accounts_group_name: None,
            idempotency_key: None,
            metadata: Metadata::default(),
            send,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutflowInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_of_accounts_group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    pub send: OutflowTransfer,
}

impl OutflowInput {
    pub fn new(send: OutflowTransfer) -> Self {
        Self {
            description: None,
            chart_of_accounts_group_name: None,
            idempotency_key: None,
            pending: false,
            metadata: Metadata::default(),
            send,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn deserializes_a_request() {
        let input: TransactionInput = serde_json::from_str(
            r#"{
                "description": "split",
                "send": {
                    "asset": "USD",
                    "value": "300.00",
                    "source": { "from": [
                        { "account": "@A", "allocation": { "amount": "300.00" } }
                    ] },
                    "distribute": { "to": [
                        { "account": "@B", "allocation": { "amount": "100.00" } },
                        { "account": "@C", "allocation": "remaining" },
                        {
                            "account": "@external/USD",
                            "allocation": { "share": { "percentage": "0" } }
                        }
                    ] }
                }
            }"#,
        )
        .unwrap();

        assert!(!input.pending);
        assert_eq!(input.send.value, dec!(300.00));
        assert_eq!(input.send.distribute.to[1].allocation, Allocation::Remaining);
        assert!(input.send.distribute.to[2].account.is_external());
    }

    #[test]
    fn parse_keeps_named_balance_keys() {
        let leg = FromTo::parse("@alice#bonus", Allocation::Remaining).unwrap();
        assert_eq!(leg.balance_key().as_str(), "bonus");
        let leg = FromTo::parse("@alice", Allocation::Remaining).unwrap();
        assert!(leg.balance_key.is_none());
        assert!(leg.balance_key().is_default());
    }
}
