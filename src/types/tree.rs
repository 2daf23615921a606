use super::{MerkleProof, OrderFill, TradeHistory, TradeHistoryUpdate};
use crate::{constants::TradeHistoryParams, error::TradeHistoryError, util::hash};
use halo2_proofs::halo2curves::bn256::Fr;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref EMPTY_LEAF_HASH: Fr = TradeHistory::default().leaf_hash();
}

/// Sparse native trade history tree. Only nodes above non-empty slots are
/// stored; everything else is the empty subtree hash of its level.
#[derive(Clone, Debug)]
pub struct TradeHistoryTree {
    params: TradeHistoryParams,
    leaves: HashMap<u64, TradeHistory>,
    // (level, index), level 0 being the leaves
    nodes: HashMap<(usize, u64), Fr>,
    empty_hashes: Vec<Fr>,
}

impl TradeHistoryTree {
    pub fn new(params: TradeHistoryParams) -> Self {
        let mut empty_hashes = vec![*EMPTY_LEAF_HASH];
        for level in 0..params.tree_depth() {
            let empty = empty_hashes[level];
            empty_hashes.push(hash(empty, empty));
        }
        Self {
            params,
            leaves: HashMap::new(),
            nodes: HashMap::new(),
            empty_hashes,
        }
    }

    pub fn params(&self) -> &TradeHistoryParams {
        &self.params
    }

    pub fn root(&self) -> Fr {
        self.node(self.params.tree_depth(), 0)
    }

    pub fn get(&self, address: u64) -> Result<TradeHistory, TradeHistoryError> {
        self.params.check_address(address)?;
        Ok(self.leaves.get(&address).copied().unwrap_or_default())
    }

    pub fn proof(&self, address: u64) -> Result<MerkleProof, TradeHistoryError> {
        self.params.check_address(address)?;
        Ok(MerkleProof(
            (0..self.params.tree_depth())
                .map(|level| self.node(level, (address >> level) ^ 1))
                .collect(),
        ))
    }

    pub fn set(&mut self, address: u64, record: TradeHistory) -> Result<(), TradeHistoryError> {
        self.params.check_address(address)?;
        self.leaves.insert(address, record);

        let mut node = record.leaf_hash();
        self.nodes.insert((0, address), node);
        for level in 0..self.params.tree_depth() {
            let index = address >> level;
            let sibling = self.node(level, index ^ 1);
            node = if index & 1 == 1 {
                hash(sibling, node)
            } else {
                hash(node, sibling)
            };
            self.nodes.insert((level + 1, index >> 1), node);
        }
        Ok(())
    }

    /// Writes `after` into the slot and returns the witness of that write.
    pub fn update(
        &mut self,
        address: u64,
        after: TradeHistory,
        fill: u128,
    ) -> Result<TradeHistoryUpdate, TradeHistoryError> {
        let update = TradeHistoryUpdate::new(
            &self.params,
            self.root(),
            address,
            self.get(address)?,
            after,
            self.proof(address)?,
            fill,
        )?;
        self.set(address, after)?;
        Ok(update)
    }

    /// Fills `order_id` by `fill` in the given slot, trimming whatever a
    /// different order left there.
    pub fn fill_order(
        &mut self,
        address: u64,
        order_id: u64,
        fill: u128,
    ) -> Result<OrderFill, TradeHistoryError> {
        let before = self.get(address)?;
        let mut order_fill = OrderFill {
            order_id,
            update: TradeHistoryUpdate::new(
                &self.params,
                self.root(),
                address,
                before,
                before,
                self.proof(address)?,
                fill,
            )?,
        };
        order_fill.update.after = order_fill.expected_after()?;
        self.set(address, order_fill.update.after)?;
        log::debug!(
            "filled order {} by {} at slot {}, stored order is now {}",
            order_id,
            fill,
            address,
            order_fill.update.after.order_id
        );
        Ok(order_fill)
    }

    fn node(&self, level: usize, index: u64) -> Fr {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.empty_hashes[level])
    }
}
