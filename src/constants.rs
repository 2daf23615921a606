use crate::error::TradeHistoryError;

/// Depth of the trade history tree, i.e. the number of address bits.
pub const TREE_DEPTH_TRADING_HISTORY: usize = 14;
/// Bit width of `filled` amounts and fill deltas.
pub const NUM_BITS_AMOUNT: usize = 96;
/// Bit width of order identifiers.
pub const NUM_BITS_ORDER_ID: usize = 20;

/// Domain separation tag hashed into every leaf.
pub const LEAF_TAG: u64 = 1;

pub const MAX_TREE_DEPTH: usize = 32;
pub const MAX_NUM_BITS_AMOUNT: usize = 128;
// 2^n has to fit a u64 and the difference of two ids must not wrap in the field.
pub const MAX_NUM_BITS_ORDER_ID: usize = 62;

/// Shape of a trade history tree and the widths of its record fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TradeHistoryParams {
    tree_depth: usize,
    num_bits_amount: usize,
    num_bits_order_id: usize,
}

impl TradeHistoryParams {
    pub fn new(
        tree_depth: usize,
        num_bits_amount: usize,
        num_bits_order_id: usize,
    ) -> Result<Self, TradeHistoryError> {
        if !(1..=MAX_TREE_DEPTH).contains(&tree_depth) {
            return Err(TradeHistoryError::InvalidTreeDepth {
                depth: tree_depth,
                max: MAX_TREE_DEPTH,
            });
        }
        for (name, bits, max) in [
            ("amount", num_bits_amount, MAX_NUM_BITS_AMOUNT),
            ("order id", num_bits_order_id, MAX_NUM_BITS_ORDER_ID),
        ] {
            if !(1..=max).contains(&bits) {
                return Err(TradeHistoryError::InvalidBitWidth { name, bits, max });
            }
        }
        Ok(Self {
            tree_depth,
            num_bits_amount,
            num_bits_order_id,
        })
    }

    /// Protocol parameters with a custom tree depth.
    pub fn with_tree_depth(tree_depth: usize) -> Result<Self, TradeHistoryError> {
        Self::new(tree_depth, NUM_BITS_AMOUNT, NUM_BITS_ORDER_ID)
    }

    pub fn tree_depth(&self) -> usize {
        self.tree_depth
    }

    pub fn num_bits_amount(&self) -> usize {
        self.num_bits_amount
    }

    pub fn num_bits_order_id(&self) -> usize {
        self.num_bits_order_id
    }

    pub fn check_address(&self, address: u64) -> Result<(), TradeHistoryError> {
        if address >> self.tree_depth != 0 {
            return Err(TradeHistoryError::AddressOutOfRange {
                address,
                depth: self.tree_depth,
            });
        }
        Ok(())
    }
}

impl Default for TradeHistoryParams {
    fn default() -> Self {
        Self {
            tree_depth: TREE_DEPTH_TRADING_HISTORY,
            num_bits_amount: NUM_BITS_AMOUNT,
            num_bits_order_id: NUM_BITS_ORDER_ID,
        }
    }
}
