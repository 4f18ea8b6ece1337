/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines all components related to execution gas cost and metering.
//!
//! Gas charged by the execution engine for individual opcodes is out of scope. This module covers
//! what is charged around it: the [intrinsic gas](intrinsic_gas) of a message, the
//! [refund](gas_to_refund) of unused gas, and the [GasMeter] of the host chain.

pub mod constants;
pub use constants::*;

pub mod formulas;
pub use formulas::*;

pub mod gas_meter;
pub use gas_meter::*;
