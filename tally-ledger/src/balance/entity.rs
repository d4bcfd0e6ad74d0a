use derive_builder::Builder;
use rust_decimal::Decimal;

use tally_types::primitives::*;

/// A balance to be opened in a store.
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct NewBalance {
    #[builder(setter(into), default = "AccountId::new()")]
    pub account_id: AccountId,
    pub account: AccountRef,
    #[builder(default)]
    pub key: BalanceKey,
    pub asset: AssetCode,
    #[builder(default)]
    pub available: Decimal,
    #[builder(default)]
    pub on_hold: Decimal,
    #[builder(default = "true")]
    pub allow_sending: bool,
    #[builder(default = "true")]
    pub allow_receiving: bool,
}

impl NewBalance {
    pub fn builder() -> NewBalanceBuilder {
        NewBalanceBuilder::default()
    }

    pub fn account_type(&self) -> AccountType {
        if self.account.is_external() {
            AccountType::External
        } else {
            AccountType::Internal
        }
    }
}

impl NewBalanceBuilder {
    fn validate(&self) -> Result<(), String> {
        if let (Some(AccountRef::External(account_asset)), Some(asset)) =
            (self.account.as_ref(), self.asset.as_ref())
        {
            if account_asset != asset {
                return Err(format!(
                    "external account for {account_asset} cannot hold {asset}"
                ));
            }
        }
        if self.available.unwrap_or_default() < Decimal::ZERO
            && !matches!(self.account, Some(AccountRef::External(_)))
        {
            return Err("available must not be negative".to_string());
        }
        if self.on_hold.unwrap_or_default() < Decimal::ZERO {
            return Err("on_hold must not be negative".to_string());
        }
        Ok(())
    }
}
