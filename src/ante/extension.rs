/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::sync::Arc;

use crate::context::Context;

use super::{AnteDecorator, AnteError, ExtensionOption, Tx};

/// Predicate accepting the extension options this chain understands.
pub type ExtensionOptionChecker = Arc<dyn Fn(&ExtensionOption) -> bool + Send + Sync>;

/// Default checker: only the dynamic fee option is accepted.
pub fn has_dynamic_fee_extension_option(option: &ExtensionOption) -> bool {
    matches!(option, ExtensionOption::DynamicFee { .. })
}

/// Rejects transactions with more than one extension option or with an option the checker
/// does not accept.
pub struct RejectExtensionOptions {
    checker: ExtensionOptionChecker,
}

impl RejectExtensionOptions {
    pub fn new(checker: ExtensionOptionChecker) -> Self {
        Self { checker }
    }
}

impl AnteDecorator for RejectExtensionOptions {
    fn ante_handle(&self, _ctx: &mut Context, tx: &Tx, _simulate: bool) -> Result<(), AnteError> {
        match tx.extension_options.as_slice() {
            [] => Ok(()),
            [option] if (self.checker)(option) => Ok(()),
            [option] => Err(AnteError::UnknownExtensionOptions(format!("{option:?}"))),
            options => Err(AnteError::UnknownExtensionOptions(format!(
                "expected at most one extension option, got {}",
                options.len()
            ))),
        }
    }
}
