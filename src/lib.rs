//! Trade history circuits: authenticated updates of an order's fill state in a
//! sparse poseidon tree, with trimming of stale state when a slot is reused by
//! a different order.

#![deny(unsafe_code)]

mod circuit;
mod constants;
pub mod constraint_builder;
mod error;
pub mod gadgets;
pub mod serde;
mod types;
mod util;

pub use circuit::{TradeHistoryCircuit, TradeHistoryCircuitConfig};
pub use constants::{
    TradeHistoryParams, LEAF_TAG, MAX_NUM_BITS_AMOUNT, MAX_NUM_BITS_ORDER_ID, MAX_TREE_DEPTH,
    NUM_BITS_AMOUNT, NUM_BITS_ORDER_ID, TREE_DEPTH_TRADING_HISTORY,
};
pub use error::TradeHistoryError;
pub use types::{
    MerkleProof, OrderFill, TradeHistory, TradeHistoryTree, TradeHistoryTrimming,
    TradeHistoryUpdate, TrimmedTradeHistory,
};
pub use util::hash;
