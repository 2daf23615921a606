pub mod bit_representation;
pub mod comparison;
mod is_zero;
mod one_hot;
pub mod poseidon;
pub mod trade_history_trimming;
pub mod trade_history_update;
