use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

use super::primitives::AssetCode;

/// Maximum number of decimal places accepted per asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetScales {
    #[serde(default)]
    scales: HashMap<AssetCode, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_scale: Option<u32>,
}

impl AssetScales {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale(mut self, asset: AssetCode, scale: u32) -> Self {
        self.scales.insert(asset, scale);
        self
    }

    pub fn with_default_scale(mut self, scale: u32) -> Self {
        self.default_scale = Some(scale);
        self
    }

    pub fn scale_for(&self, asset: &AssetCode) -> Option<u32> {
        self.scales.get(asset).copied().or(self.default_scale)
    }

    /// `true` when `value` has no more significant decimal places than the asset allows.
    /// Trailing zeros do not count: `10.500` fits a scale of 2.
    pub fn fits(&self, asset: &AssetCode, value: Decimal) -> bool {
        match self.scale_for(asset) {
            Some(max) => value.normalize().scale() <= max,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn scale_check_ignores_trailing_zeros() {
        let usd: AssetCode = "USD".parse().unwrap();
        let scales = AssetScales::new().with_scale(usd.clone(), 2);
        assert!(scales.fits(&usd, dec!(10.500)));
        assert!(scales.fits(&usd, dec!(10.55)));
        assert!(!scales.fits(&usd, dec!(10.555)));
    }

    #[test]
    fn unknown_assets_fall_back_to_default() {
        let btc: AssetCode = "BTC".parse().unwrap();
        assert!(AssetScales::new().fits(&btc, dec!(0.123456789)));
        let scales = AssetScales::new().with_default_scale(8);
        assert!(scales.fits(&btc, dec!(0.12345678)));
        assert!(!scales.fits(&btc, dec!(0.123456789)));
    }
}
