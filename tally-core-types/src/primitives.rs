use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

crate::entity_id! { AccountId }
crate::entity_id! { BalanceId }
crate::entity_id! { TransactionId }
crate::entity_id! { OperationId }

/// Display prefix of the per-asset external account, eg. `@external/USD`.
pub const EXTERNAL_ACCOUNT_PREFIX: &str = "@external/";
pub const DEFAULT_BALANCE_KEY: &str = "default";
const BALANCE_KEY_SEPARATOR: char = '#';

lazy_static! {
    static ref ASSET_CODE: Regex = Regex::new(r"^[A-Z0-9]{1,10}$").expect("valid regex");
    static ref ACCOUNT_NAME: Regex =
        Regex::new(r"^@?[A-Za-z0-9:_\-.]{1,100}$").expect("valid regex");
    static ref BALANCE_KEY: Regex = Regex::new(r"^[a-z0-9_\-]{1,100}$").expect("valid regex");
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsePrimitiveError {
    #[error("ParsePrimitiveError - InvalidAssetCode: '{0}' must be 1-10 upper case alphanumerics")]
    InvalidAssetCode(String),
    #[error("ParsePrimitiveError - InvalidAccountName: '{0}' is not a valid account alias")]
    InvalidAccountName(String),
    #[error("ParsePrimitiveError - InvalidBalanceKey: '{0}' is not a valid balance key")]
    InvalidBalanceKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetCode(String);

impl AssetCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for AssetCode {
    type Err = ParsePrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if ASSET_CODE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ParsePrimitiveError::InvalidAssetCode(s.to_string()))
        }
    }
}

impl TryFrom<String> for AssetCode {
    type Error = ParsePrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssetCode> for String {
    fn from(code: AssetCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for AssetCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DebitOrCredit {
    Debit,
    Credit,
}

/// What an operation did to the balance it touched.
#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Funds leave the balance (from available, or from on-hold when settling a hold).
    Debit,
    /// Funds arrive in available.
    Credit,
    /// Funds move from available to on-hold for a pending transaction.
    OnHold,
    /// Held funds return to available when a pending transaction is canceled.
    Release,
}

impl OperationType {
    pub fn direction(&self) -> DebitOrCredit {
        match self {
            Self::Debit | Self::OnHold => DebitOrCredit::Debit,
            Self::Credit | Self::Release => DebitOrCredit::Credit,
        }
    }
}

#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccountType {
    #[default]
    Internal,
    /// Unlimited account standing for value entering or leaving the ledger.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BalanceKey(String);

impl BalanceKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_BALANCE_KEY
    }
}

impl Default for BalanceKey {
    fn default() -> Self {
        Self(DEFAULT_BALANCE_KEY.to_string())
    }
}

impl std::str::FromStr for BalanceKey {
    type Err = ParsePrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if BALANCE_KEY.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ParsePrimitiveError::InvalidBalanceKey(s.to_string()))
        }
    }
}

impl TryFrom<String> for BalanceKey {
    type Error = ParsePrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BalanceKey> for String {
    fn from(key: BalanceKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Alias (eg. `@alice`) or id string of an internal account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountName(String);

impl AccountName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for AccountName {
    type Err = ParsePrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if ACCOUNT_NAME.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ParsePrimitiveError::InvalidAccountName(s.to_string()))
        }
    }
}

impl TryFrom<String> for AccountName {
    type Error = ParsePrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountName> for String {
    fn from(name: AccountName) -> Self {
        name.0
    }
}

impl std::fmt::Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The account a leg points at.
///
/// External accounts are addressed by asset rather than by a magic alias, so a
/// named account can never be mistaken for one. The string form `@external/USD`
/// is kept for display and for parsing requests.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AccountRef {
    Named(AccountName),
    External(AssetCode),
}

impl AccountRef {
    pub fn named(name: impl AsRef<str>) -> Result<Self, ParsePrimitiveError> {
        Ok(Self::Named(name.as_ref().parse()?))
    }

    pub fn external(asset: &AssetCode) -> Self {
        Self::External(asset.clone())
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }

    /// Splits an optional `#key` suffix off an account string: `@alice#bonus`
    /// addresses the `bonus` balance of `@alice`.
    pub fn parse_with_key(s: &str) -> Result<(Self, BalanceKey), ParsePrimitiveError> {
        match s.split_once(BALANCE_KEY_SEPARATOR) {
            Some((account, key)) => Ok((account.parse()?, key.parse()?)),
            None => Ok((s.parse()?, BalanceKey::default())),
        }
    }
}

impl std::str::FromStr for AccountRef {
    type Err = ParsePrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(EXTERNAL_ACCOUNT_PREFIX) {
            Some(asset) => Ok(Self::External(asset.parse()?)),
            None => Ok(Self::Named(s.parse()?)),
        }
    }
}

impl TryFrom<String> for AccountRef {
    type Error = ParsePrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountRef> for String {
    fn from(account: AccountRef) -> Self {
        account.to_string()
    }
}

impl std::fmt::Display for AccountRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::External(asset) => write!(f, "{EXTERNAL_ACCOUNT_PREFIX}{asset}"),
        }
    }
}
