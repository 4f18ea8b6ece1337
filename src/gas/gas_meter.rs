/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! GasMeter of the host chain. It is scoped to one transaction and tallies the gas consumed
//! outside of the execution engine, e.g. signature verification during admission, plus the total
//! gas charged by the state transition at its end.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GasError {
    #[error("out of gas in location {descriptor}: gas wanted {limit}, gas used {consumed}")]
    OutOfGas {
        descriptor: String,
        limit: u64,
        consumed: u64,
    },

    #[error("gas overflow in location {0}")]
    Overflow(String),

    #[error("negative gas consumed in location {descriptor}: refund {refund} > consumed {consumed}")]
    NegativeGasConsumed {
        descriptor: String,
        refund: u64,
        consumed: u64,
    },
}

/// Consumed and limit counters. Consuming beyond the limit is an error for the whole transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    consumed: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }

    /// Meter without a limit, used outside of transaction processing.
    pub fn infinite() -> Self {
        Self::new(u64::MAX)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn gas_consumed(&self) -> u64 {
        self.consumed
    }

    pub fn gas_remaining(&self) -> u64 {
        self.limit.saturating_sub(self.consumed)
    }

    pub fn is_out_of_gas(&self) -> bool {
        self.consumed >= self.limit
    }

    pub fn consume_gas(&mut self, amount: u64, descriptor: &str) -> Result<(), GasError> {
        let consumed = self
            .consumed
            .checked_add(amount)
            .ok_or_else(|| GasError::Overflow(descriptor.to_string()))?;
        if consumed > self.limit {
            // the counter still moves so the caller can report how much was wanted
            self.consumed = consumed;
            return Err(GasError::OutOfGas {
                descriptor: descriptor.to_string(),
                limit: self.limit,
                consumed,
            });
        }
        self.consumed = consumed;
        Ok(())
    }

    pub fn refund_gas(&mut self, amount: u64, descriptor: &str) -> Result<(), GasError> {
        if amount > self.consumed {
            return Err(GasError::NegativeGasConsumed {
                descriptor: descriptor.to_string(),
                refund: amount,
                consumed: self.consumed,
            });
        }
        self.consumed -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_and_refund() {
        let mut meter = GasMeter::new(100);
        meter.consume_gas(60, "a").unwrap();
        assert_eq!(meter.gas_remaining(), 40);

        assert!(matches!(meter.consume_gas(41, "b"), Err(GasError::OutOfGas { consumed: 101, .. })));
        assert!(meter.is_out_of_gas());

        assert!(matches!(meter.refund_gas(200, "c"), Err(GasError::NegativeGasConsumed { .. })));
        meter.refund_gas(101, "reset").unwrap();
        assert_eq!(meter.gas_consumed(), 0);

        let mut infinite = GasMeter::infinite();
        infinite.consume_gas(u64::MAX, "max").unwrap();
        assert!(matches!(infinite.consume_gas(1, "over"), Err(GasError::Overflow(_))));
    }
}
