/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! In-memory view of one account during a transaction.

use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, B256};

use crate::types::Account;

/// Account fields plus its cached code and storage.
///
/// - `origin_storage` caches committed slot values read from the keeper.
/// - `dirty_storage` holds the slots written in this transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateObject {
    pub address: Address,
    pub account: Account,

    /// None until loaded or set
    pub(crate) code: Option<Bytes>,
    pub(crate) dirty_code: bool,

    pub(crate) origin_storage: BTreeMap<B256, B256>,
    pub(crate) dirty_storage: BTreeMap<B256, B256>,

    pub(crate) self_destructed: bool,
    /// created within the current transaction (EIP-6780)
    pub(crate) created: bool,
}

impl StateObject {
    pub fn new(address: Address, account: Account) -> Self {
        Self {
            address,
            account,
            code: None,
            dirty_code: false,
            origin_storage: BTreeMap::new(),
            dirty_storage: BTreeMap::new(),
            self_destructed: false,
            created: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.account.is_empty()
    }

    pub fn is_self_destructed(&self) -> bool {
        self.self_destructed
    }

    pub fn code_hash(&self) -> B256 {
        self.account.code_hash
    }

    /// Storage slots written in this transaction, in ascending key order.
    pub fn dirty_storage(&self) -> impl Iterator<Item = (&B256, &B256)> {
        self.dirty_storage.iter()
    }
}
