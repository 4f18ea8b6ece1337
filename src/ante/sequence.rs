/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::sync::Arc;

use crate::collaborators::AccountKeeper;
use crate::context::Context;

use super::{AnteDecorator, AnteError, Tx};

/// Increments the sequence of every signer and records the public key of accounts which had none.
pub struct IncrementSequence {
    account_keeper: Arc<dyn AccountKeeper>,
}

impl IncrementSequence {
    pub fn new(account_keeper: Arc<dyn AccountKeeper>) -> Self {
        Self { account_keeper }
    }
}

impl AnteDecorator for IncrementSequence {
    fn ante_handle(&self, ctx: &mut Context, tx: &Tx, _simulate: bool) -> Result<(), AnteError> {
        for (i, signer) in tx.signers().iter().enumerate() {
            let mut account = self
                .account_keeper
                .get_account(ctx, signer)
                .ok_or(AnteError::UnknownAddress(*signer))?;
            if account.pub_key.is_none() {
                account.pub_key = tx.signer_infos.get(i).and_then(|info| info.pub_key.clone());
            }
            account.sequence = account
                .sequence
                .checked_add(1)
                .ok_or_else(|| AnteError::InvalidTx(format!("sequence of {signer} overflows")))?;
            self.account_keeper
                .set_account(ctx, account)
                .map_err(AnteError::Collaborator)?;
        }
        Ok(())
    }
}
