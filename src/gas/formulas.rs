/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Gas formulas applied by the state transition before and after the execution engine runs.

use crate::chain_config::Rules;
use crate::error::{FatalError, TransitionError};
use crate::types::AccessList;

use super::constants::*;

/// Intrinsic gas of a message: the base cost, plus the data cost priced per zero and non-zero
/// byte, plus the init code cost of creations from Shanghai on, plus the access list cost.
///
/// Every step is checked, a sum which does not fit in u64 is a [TransitionError::GasOverflow].
pub fn intrinsic_gas(
    data: &[u8],
    access_list: &AccessList,
    is_contract_creation: bool,
    rules: &Rules,
) -> Result<u64, TransitionError> {
    let overflow = || TransitionError::GasOverflow("intrinsic gas".to_string());

    let mut gas = if is_contract_creation && rules.is_homestead {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };

    if !data.is_empty() {
        let non_zero = data.iter().filter(|b| **b != 0).count() as u64;
        let zero = data.len() as u64 - non_zero;

        let non_zero_gas = if rules.is_istanbul {
            TX_DATA_NON_ZERO_GAS_EIP2028
        } else {
            TX_DATA_NON_ZERO_GAS_FRONTIER
        };

        let non_zero_cost = non_zero.checked_mul(non_zero_gas).ok_or_else(overflow)?;
        gas = gas.checked_add(non_zero_cost).ok_or_else(overflow)?;

        let zero_cost = zero.checked_mul(TX_DATA_ZERO_GAS).ok_or_else(overflow)?;
        gas = gas.checked_add(zero_cost).ok_or_else(overflow)?;

        if is_contract_creation && rules.is_shanghai {
            let words = (data.len() as u64).div_ceil(32);
            let init_code_cost = words.checked_mul(INIT_CODE_WORD_GAS).ok_or_else(overflow)?;
            gas = gas.checked_add(init_code_cost).ok_or_else(overflow)?;
        }
    }

    if !access_list.is_empty() {
        let addresses = (access_list.len() as u64)
            .checked_mul(TX_ACCESS_LIST_ADDRESS_GAS)
            .ok_or_else(overflow)?;
        gas = gas.checked_add(addresses).ok_or_else(overflow)?;

        let keys = (access_list.storage_keys() as u64)
            .checked_mul(TX_ACCESS_LIST_STORAGE_KEY_GAS)
            .ok_or_else(overflow)?;
        gas = gas.checked_add(keys).ok_or_else(overflow)?;
    }

    Ok(gas)
}

/// Gas returned to the sender on top of the leftover gas: `min(available_refund, gas_used / quotient)`.
pub fn gas_to_refund(available_refund: u64, gas_used: u64, refund_quotient: u64) -> Result<u64, FatalError> {
    if refund_quotient == 0 {
        return Err(FatalError::ZeroRefundQuotient);
    }
    let refund = gas_used / refund_quotient;
    Ok(std::cmp::min(refund, available_refund))
}

/// Refund quotient of the active fork.
pub const fn refund_quotient(rules: &Rules) -> u64 {
    if rules.is_london {
        REFUND_QUOTIENT_EIP3529
    } else {
        REFUND_QUOTIENT
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, B256};

    use super::*;
    use crate::types::AccessTuple;

    fn all_forks() -> Rules {
        Rules {
            is_homestead: true,
            is_istanbul: true,
            is_berlin: true,
            is_london: true,
            is_shanghai: true,
            is_cancun: true,
        }
    }

    #[test]
    fn refund_is_capped_by_counter() {
        assert_eq!(gas_to_refund(10, 11, 1).unwrap(), 10);
        assert_eq!(gas_to_refund(10, 5, 1).unwrap(), 5);
        assert_eq!(gas_to_refund(100, 50, 5).unwrap(), 10);
        assert!(matches!(gas_to_refund(10, 5, 0), Err(FatalError::ZeroRefundQuotient)));
    }

    #[test]
    fn plain_transfer_and_creation() {
        let rules = all_forks();
        assert_eq!(intrinsic_gas(&[], &AccessList::default(), false, &rules).unwrap(), TX_GAS);
        assert_eq!(
            intrinsic_gas(&[], &AccessList::default(), true, &rules).unwrap(),
            TX_GAS_CONTRACT_CREATION
        );

        // creation before homestead is priced as a call
        let frontier = Rules::default();
        assert_eq!(intrinsic_gas(&[], &AccessList::default(), true, &frontier).unwrap(), TX_GAS);
    }

    #[test]
    fn data_is_priced_per_byte_and_fork() {
        let data = [0u8, 1, 0, 2];
        let istanbul = all_forks();
        assert_eq!(
            intrinsic_gas(&data, &AccessList::default(), false, &istanbul).unwrap(),
            TX_GAS + 2 * 4 + 2 * 16
        );

        let frontier = Rules::default();
        assert_eq!(
            intrinsic_gas(&data, &AccessList::default(), false, &frontier).unwrap(),
            TX_GAS + 2 * 4 + 2 * 68
        );

        // 33 bytes of init code are two words
        let init_code = [1u8; 33];
        assert_eq!(
            intrinsic_gas(&init_code, &AccessList::default(), true, &istanbul).unwrap(),
            TX_GAS_CONTRACT_CREATION + 33 * 16 + 2 * INIT_CODE_WORD_GAS
        );
    }

    #[test]
    fn access_list_cost() {
        let access_list = AccessList(vec![
            AccessTuple { address: Address::ZERO, storage_keys: vec![B256::ZERO, B256::ZERO] },
            AccessTuple { address: Address::repeat_byte(1), storage_keys: vec![] },
        ]);
        assert_eq!(
            intrinsic_gas(&[], &access_list, false, &all_forks()).unwrap(),
            TX_GAS + 2 * TX_ACCESS_LIST_ADDRESS_GAS + 2 * TX_ACCESS_LIST_STORAGE_KEY_GAS
        );
    }

    #[test]
    fn quotient_follows_london() {
        assert_eq!(refund_quotient(&Rules::default()), REFUND_QUOTIENT);
        assert_eq!(refund_quotient(&all_forks()), REFUND_QUOTIENT_EIP3529);
    }
}
