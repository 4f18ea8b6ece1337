#[allow(dead_code)]
pub mod mock_evm;
pub use mock_evm::*;

#[allow(dead_code)]
pub mod simulate_keepers;
pub use simulate_keepers::*;

#[allow(dead_code)]
pub mod test_data;
pub use test_data::*;
