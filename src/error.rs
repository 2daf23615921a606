use thiserror::Error;

#[derive(Debug, Error)]
pub enum TradeHistoryError {
    #[error("tree depth {depth} is not in 1..={max}")]
    InvalidTreeDepth { depth: usize, max: usize },
    #[error("{name} bit width {bits} is not in 1..={max}")]
    InvalidBitWidth {
        name: &'static str,
        bits: usize,
        max: usize,
    },
    #[error("authentication path has {actual} siblings, tree depth is {expected}")]
    ProofLength { expected: usize, actual: usize },
    #[error("address {address} does not fit a tree of depth {depth}")]
    AddressOutOfRange { address: u64, depth: usize },
    #[error("filled amount {filled} + {fill} overflows")]
    AmountOverflow { filled: u128, fill: u128 },
    #[error("cancelled flag must be 0 or 1, got {0}")]
    InvalidFlag(u64),
    #[error("cannot parse number {0:?}")]
    InvalidNumber(String),
    #[error("{0} is not a canonical field element")]
    NonCanonicalField(String),
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
