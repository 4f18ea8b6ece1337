/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Parameters of the EVM module. The coin used for gas is not a parameter: it comes from the
//! [ChainConfig](crate::chain_config::ChainConfig).

use std::collections::BTreeSet;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use super::ParamsError;

/// Number of recent header hashes kept for BLOCKHASH (EIP-2935).
pub const DEFAULT_HISTORY_SERVE_WINDOW: u64 = 8192;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// EIPs activated on top of the fork schedule
    pub extra_eips: Vec<i64>,
    pub access_control: AccessControl,
    pub history_serve_window: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            extra_eips: Vec::new(),
            access_control: AccessControl::default(),
            history_serve_window: DEFAULT_HISTORY_SERVE_WINDOW,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), ParamsError> {
        let mut seen = BTreeSet::new();
        for eip in &self.extra_eips {
            if *eip <= 0 {
                return Err(ParamsError::Invalid(format!("invalid EIP number {eip}")));
            }
            if !seen.insert(*eip) {
                return Err(ParamsError::Invalid(format!("duplicate EIP {eip}")));
            }
        }
        if self.history_serve_window == 0 {
            return Err(ParamsError::Invalid("history serve window cannot be 0".to_string()));
        }
        self.access_control.create.validate()?;
        self.access_control.call.validate()
    }
}

/// Who may deploy contracts and who may call them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    pub create: AccessControlType,
    pub call: AccessControlType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessType {
    /// anyone except the listed addresses
    #[default]
    Permissionless,
    /// nobody
    Restricted,
    /// only the listed addresses
    Permissioned,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlType {
    pub access_type: AccessType,
    pub access_control_list: Vec<Address>,
}

impl AccessControlType {
    pub fn permissioned(allowed: Vec<Address>) -> Self {
        Self { access_type: AccessType::Permissioned, access_control_list: allowed }
    }

    pub fn restricted() -> Self {
        Self { access_type: AccessType::Restricted, access_control_list: Vec::new() }
    }

    pub fn is_allowed(&self, address: &Address) -> bool {
        let listed = self.access_control_list.contains(address);
        match self.access_type {
            AccessType::Permissionless => !listed,
            AccessType::Restricted => false,
            AccessType::Permissioned => listed,
        }
    }

    fn validate(&self) -> Result<(), ParamsError> {
        let unique: BTreeSet<_> = self.access_control_list.iter().collect();
        if unique.len() != self.access_control_list.len() {
            return Err(ParamsError::Invalid("duplicate address in access control list".to_string()));
        }
        Ok(())
    }
}
