/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the Context of a single block or transaction execution, which is passed to every
//! keeper operation. It gives access to the persistent and the transient store, the block header,
//! the consensus parameters and the gas meters.
//!
//! A Context can be [branched](Context::branch): the closure runs against a [CacheStore] layered
//! on top of both stores and its writes reach the parent only when the closure succeeds. Gas
//! consumed inside a branch is always kept.

use crate::gas::GasMeter;
use crate::store::{CacheStore, KvStore, PrefixStore, PrefixStoreMut, StoreError};
use crate::types::{BlockHeader, ConsensusParams, DecCoin};

pub struct Context<'a> {
    store: &'a mut dyn KvStore,
    transient_store: &'a mut dyn KvStore,

    pub header: BlockHeader,

    pub consensus_params: ConsensusParams,

    /// gas meter of the transaction being processed
    pub gas_meter: GasMeter,

    /// limit of the block gas meter, None if the block is not metered
    pub block_gas_meter: Option<GasMeter>,

    /// node-local minimum gas prices, only enforced in check mode
    pub min_gas_prices: Vec<DecCoin>,

    /// true when the transaction is checked for mempool admission rather than executed in a block
    pub is_check_tx: bool,

    /// mempool priority assigned during admission
    pub priority: i64,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn KvStore, transient_store: &'a mut dyn KvStore, header: BlockHeader) -> Self {
        Self {
            store,
            transient_store,
            header,
            consensus_params: ConsensusParams::default(),
            gas_meter: GasMeter::infinite(),
            block_gas_meter: None,
            min_gas_prices: Vec::new(),
            is_check_tx: false,
            priority: 0,
        }
    }

    pub fn with_consensus_params(mut self, consensus_params: ConsensusParams) -> Self {
        self.consensus_params = consensus_params;
        self
    }

    pub fn with_gas_meter(mut self, gas_meter: GasMeter) -> Self {
        self.gas_meter = gas_meter;
        self
    }

    pub fn with_block_gas_meter(mut self, block_gas_meter: GasMeter) -> Self {
        self.block_gas_meter = Some(block_gas_meter);
        self
    }

    pub fn with_min_gas_prices(mut self, min_gas_prices: Vec<DecCoin>) -> Self {
        self.min_gas_prices = min_gas_prices;
        self
    }

    pub fn with_check_tx(mut self, is_check_tx: bool) -> Self {
        self.is_check_tx = is_check_tx;
        self
    }

    pub fn block_height(&self) -> u64 {
        self.header.height
    }

    pub fn block_time(&self) -> u64 {
        self.header.time
    }

    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    pub fn transient_store(&self) -> &dyn KvStore {
        &*self.transient_store
    }

    pub fn transient_store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.transient_store
    }

    /// Read view over the persistent keys of one module.
    pub fn kv(&self, namespace: &[u8]) -> PrefixStore<'_> {
        PrefixStore::new(&*self.store, namespace)
    }

    pub fn kv_mut(&mut self, namespace: &[u8]) -> PrefixStoreMut<'_> {
        PrefixStoreMut::new(&mut *self.store, namespace)
    }

    /// Read view over the per-block keys of one module.
    pub fn transient_kv(&self, namespace: &[u8]) -> PrefixStore<'_> {
        PrefixStore::new(&*self.transient_store, namespace)
    }

    pub fn transient_kv_mut(&mut self, namespace: &[u8]) -> PrefixStoreMut<'_> {
        PrefixStoreMut::new(&mut *self.transient_store, namespace)
    }

    /// Run `f` on a branch of this context and flush its writes only when it returns Ok.
    pub fn branch<T, E>(&mut self, f: impl FnOnce(&mut Context<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        self.branch_if(f, |result| result.is_ok())?
    }

    /// Run `f` on a branch of this context and flush its writes when `commit` accepts the output.
    pub fn branch_if<T>(
        &mut self,
        f: impl FnOnce(&mut Context<'_>) -> T,
        commit: impl FnOnce(&T) -> bool,
    ) -> Result<T, StoreError> {
        let (output, writes, transient_writes, gas_meter, block_gas_meter, priority) = {
            let mut store = CacheStore::new(&*self.store);
            let mut transient_store = CacheStore::new(&*self.transient_store);
            let mut branch = Context {
                store: &mut store,
                transient_store: &mut transient_store,
                header: self.header.clone(),
                consensus_params: self.consensus_params,
                gas_meter: self.gas_meter.clone(),
                block_gas_meter: self.block_gas_meter.clone(),
                min_gas_prices: self.min_gas_prices.clone(),
                is_check_tx: self.is_check_tx,
                priority: self.priority,
            };
            let output = f(&mut branch);
            let Context { gas_meter, block_gas_meter, priority, .. } = branch;
            (output, store.into_writes(), transient_store.into_writes(), gas_meter, block_gas_meter, priority)
        };

        self.gas_meter = gas_meter;
        self.block_gas_meter = block_gas_meter;

        if commit(&output) {
            self.priority = priority;
            writes.apply(&mut *self.store)?;
            transient_writes.apply(&mut *self.transient_store)?;
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn branch_flushes_only_on_success() {
        let mut store = MemoryStore::new();
        let mut transient = MemoryStore::new();
        let mut ctx = Context::new(&mut store, &mut transient, BlockHeader::default());

        let failed: Result<(), StoreError> = ctx.branch(|ctx| {
            ctx.kv_mut(b"m/").set(b"k", vec![1])?;
            ctx.gas_meter.consume_gas(10, "branch").ok();
            Err(StoreError::Write { key: "k".into(), reason: "test".into() })
        });
        assert!(failed.is_err());
        assert!(ctx.kv(b"m/").get(b"k").is_none());
        // gas consumed in the failed branch is kept
        assert_eq!(ctx.gas_meter.gas_consumed(), 10);

        ctx.branch(|ctx| -> Result<(), StoreError> {
            ctx.kv_mut(b"m/").set(b"k", vec![2])?;
            ctx.transient_kv_mut(b"m/").set(b"t", vec![3])
        })
        .unwrap();
        assert_eq!(ctx.kv(b"m/").get(b"k"), Some(vec![2]));
        assert_eq!(ctx.transient_kv(b"m/").get(b"t"), Some(vec![3]));
    }
}
