/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Block boundaries of the EVM module.

use alloy_primitives::Bloom;

use crate::context::Context;
use crate::error::FatalError;
use crate::statedb::StateError;

use super::Keeper;

impl Keeper {
    /// Store the hash of the current header for BLOCKHASH and forget the one which left the
    /// history serve window.
    pub fn begin_block(&self, ctx: &mut Context) -> Result<(), FatalError> {
        let height = ctx.block_height();
        let window = self.get_params(ctx)?.history_serve_window;

        let hash = ctx.header.header_hash;
        self.set_header_hash(ctx, height, hash).map_err(StateError::from)?;

        if let Some(expired) = height.checked_sub(window) {
            self.delete_header_hash(ctx, expired).map_err(StateError::from)?;
        }
        Ok(())
    }

    /// Bloom of every log emitted in the block.
    pub fn end_block(&self, ctx: &Context) -> Bloom {
        let bloom = self.get_block_bloom_transient(ctx);
        tracing::debug!(
            target: "evm",
            height = ctx.block_height(),
            txs = self.get_tx_index_transient(ctx),
            logs = self.get_log_size_transient(ctx),
            "end block"
        );
        bloom
    }
}
