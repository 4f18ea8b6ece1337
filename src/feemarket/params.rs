/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Fee market parameters, set at genesis and updated by governance.

use serde::{Deserialize, Serialize};

use crate::decimal::Dec;

use super::FeeMarketError;

pub const DEFAULT_BASE_FEE: u64 = 1_000_000_000;
pub const DEFAULT_BASE_FEE_CHANGE_DENOMINATOR: u32 = 8;
pub const DEFAULT_ELASTICITY_MULTIPLIER: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// fixed price mode: the base fee is neither applied nor updated
    pub no_base_fee: bool,
    /// bounds the amount the base fee can change between blocks
    pub base_fee_change_denominator: u32,
    /// bounds the maximum gas limit an EIP-1559 block may have
    pub elasticity_multiplier: u32,
    /// height at which the base fee calculation is enabled
    pub enable_height: u64,
    /// base fee of the current block
    pub base_fee: Dec,
    /// floor of the base fee and of the gas price of every transaction
    pub min_gas_price: Dec,
    /// fraction of the gas limit charged at minimum, in [0, 1]
    pub min_gas_multiplier: Dec,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            no_base_fee: false,
            base_fee_change_denominator: DEFAULT_BASE_FEE_CHANGE_DENOMINATOR,
            elasticity_multiplier: DEFAULT_ELASTICITY_MULTIPLIER,
            enable_height: 0,
            base_fee: Dec::from_u64(DEFAULT_BASE_FEE),
            min_gas_price: Dec::ZERO,
            // 0.5
            min_gas_multiplier: Dec::from_ratio(1, 2).unwrap_or(Dec::ZERO),
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), FeeMarketError> {
        if self.base_fee_change_denominator == 0 {
            return Err(FeeMarketError::InvalidParams(
                "base fee change denominator cannot be 0".to_string(),
            ));
        }
        if self.elasticity_multiplier == 0 {
            return Err(FeeMarketError::InvalidParams(
                "elasticity multiplier cannot be 0".to_string(),
            ));
        }
        if self.min_gas_multiplier > Dec::one() {
            return Err(FeeMarketError::InvalidParams(format!(
                "min gas multiplier cannot be greater than 1, got {}",
                self.min_gas_multiplier
            )));
        }
        Ok(())
    }

    /// Dynamic pricing applies at `height`.
    pub fn is_base_fee_enabled(&self, height: u64) -> bool {
        !self.no_base_fee && height >= self.enable_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = Params::default();
        params.validate().unwrap();
        assert_eq!(params.min_gas_multiplier.to_string(), "0.500000000000000000");
        assert_eq!(params.base_fee.truncate_u64(), Some(DEFAULT_BASE_FEE));
    }

    #[test]
    fn rejects_zero_divisors_and_large_multiplier() {
        let params = Params { elasticity_multiplier: 0, ..Default::default() };
        assert!(matches!(params.validate(), Err(FeeMarketError::InvalidParams(_))));

        let params = Params { base_fee_change_denominator: 0, ..Default::default() };
        assert!(params.validate().is_err());

        let params = Params { min_gas_multiplier: Dec::from_u64(2), ..Default::default() };
        assert!(params.validate().is_err());
    }

    #[test]
    fn enabled_from_height() {
        let params = Params { enable_height: 10, ..Default::default() };
        assert!(!params.is_base_fee_enabled(9));
        assert!(params.is_base_fee_enabled(10));

        let params = Params { no_base_fee: true, ..Default::default() };
        assert!(!params.is_base_fee_enabled(100));
    }

    #[test]
    fn json_round_trip_keeps_decimals() {
        let params = Params::default();
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"min_gas_multiplier\":\"0.500000000000000000\""));
        assert_eq!(serde_json::from_str::<Params>(&json).unwrap(), params);
    }
}
