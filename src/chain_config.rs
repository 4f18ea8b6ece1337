/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Chain-wide configuration: the Ethereum fork schedule and the coin used for gas.
//!
//! A [ChainConfig] is built once at process start and passed down explicitly. It is never
//! mutated afterwards.

use serde::{Deserialize, Serialize};

/// Fork activation schedule. Block-based forks activate at a height, time-based forks at a
/// block timestamp. `None` means the fork never activates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub homestead_block: Option<u64>,
    pub istanbul_block: Option<u64>,
    pub berlin_block: Option<u64>,
    pub london_block: Option<u64>,
    pub shanghai_time: Option<u64>,
    pub cancun_time: Option<u64>,
    pub coin_info: EvmCoinInfo,
}

/// Denomination of the gas token and its number of decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmCoinInfo {
    pub denom: String,
    pub decimals: u8,
}

impl Default for EvmCoinInfo {
    fn default() -> Self {
        Self {
            denom: "aatom".to_string(),
            decimals: 18,
        }
    }
}

impl Default for ChainConfig {
    /// Every fork active from genesis.
    fn default() -> Self {
        Self {
            chain_id: 262144,
            homestead_block: Some(0),
            istanbul_block: Some(0),
            berlin_block: Some(0),
            london_block: Some(0),
            shanghai_time: Some(0),
            cancun_time: Some(0),
            coin_info: EvmCoinInfo::default(),
        }
    }
}

/// Which forks are active for one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rules {
    pub is_homestead: bool,
    pub is_istanbul: bool,
    pub is_berlin: bool,
    pub is_london: bool,
    pub is_shanghai: bool,
    pub is_cancun: bool,
}

#[inline]
fn activated(fork: Option<u64>, at: u64) -> bool {
    fork.is_some_and(|fork| fork <= at)
}

impl ChainConfig {
    pub fn is_homestead(&self, height: u64) -> bool {
        activated(self.homestead_block, height)
    }

    pub fn is_istanbul(&self, height: u64) -> bool {
        activated(self.istanbul_block, height)
    }

    pub fn is_berlin(&self, height: u64) -> bool {
        activated(self.berlin_block, height)
    }

    pub fn is_london(&self, height: u64) -> bool {
        activated(self.london_block, height)
    }

    /// Time based forks additionally require London.
    pub fn is_shanghai(&self, height: u64, time: u64) -> bool {
        self.is_london(height) && activated(self.shanghai_time, time)
    }

    pub fn is_cancun(&self, height: u64, time: u64) -> bool {
        self.is_london(height) && activated(self.cancun_time, time)
    }

    pub fn rules(&self, height: u64, time: u64) -> Rules {
        Rules {
            is_homestead: self.is_homestead(height),
            is_istanbul: self.is_istanbul(height),
            is_berlin: self.is_berlin(height),
            is_london: self.is_london(height),
            is_shanghai: self.is_shanghai(height, time),
            is_cancun: self.is_cancun(height, time),
        }
    }

    pub fn denom(&self) -> &str {
        &self.coin_info.denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_schedule() {
        let config = ChainConfig {
            homestead_block: Some(2),
            istanbul_block: Some(3),
            london_block: Some(5),
            shanghai_time: Some(100),
            cancun_time: None,
            ..Default::default()
        };
        let rules = config.rules(1, 0);
        assert!(!rules.is_homestead && !rules.is_istanbul && !rules.is_london);

        let rules = config.rules(3, 0);
        assert!(rules.is_homestead && rules.is_istanbul && !rules.is_london);

        // shanghai time reached but london not active yet
        assert!(!config.is_shanghai(4, 200));
        assert!(config.is_shanghai(5, 200));
        assert!(!config.is_cancun(5, u64::MAX));
    }
}
