use crate::{
    constants::{TradeHistoryParams, LEAF_TAG},
    error::TradeHistoryError,
    gadgets::comparison::difference,
    util::{hash, Bit},
};
use halo2_proofs::{arithmetic::FieldExt, halo2curves::bn256::Fr};

mod tree;

pub use tree::TradeHistoryTree;

/// The record stored in one trade history slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TradeHistory {
    pub filled: u128,
    pub cancelled: bool,
    pub order_id: u64,
}

impl TradeHistory {
    /// `H(H(1, filled), H(cancelled, order_id))`
    pub fn leaf_hash(&self) -> Fr {
        let [_, _, (_, _, leaf)] = self.hash_traces();
        leaf
    }

    pub(crate) fn hash_traces(&self) -> [(Fr, Fr, Fr); 3] {
        let tag = Fr::from(LEAF_TAG);
        let filled = Fr::from_u128(self.filled);
        let tagged_filled = hash(tag, filled);

        let cancelled = Fr::from(self.cancelled);
        let order_id = Fr::from(self.order_id);
        let flags = hash(cancelled, order_id);

        [
            (tag, filled, tagged_filled),
            (cancelled, order_id, flags),
            (tagged_filled, flags, hash(tagged_filled, flags)),
        ]
    }
}

/// Siblings from the leaf level up to just below the root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleProof(pub Vec<Fr>);

impl MerkleProof {
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn siblings(&self) -> &[Fr] {
        &self.0
    }

    /// Node hashes from `leaf` up to the root, `depth() + 1` of them. Bit `i`
    /// of `address` set means the node at level `i` is a right child.
    pub fn path(&self, leaf: Fr, address: u64) -> Vec<Fr> {
        let mut path = Vec::with_capacity(self.depth() + 1);
        path.push(leaf);
        for (level, sibling) in self.0.iter().enumerate() {
            let node = path[level];
            path.push(if address.bit(level) {
                hash(*sibling, node)
            } else {
                hash(node, *sibling)
            });
        }
        path
    }

    pub fn root(&self, leaf: Fr, address: u64) -> Fr {
        self.path(leaf, address)[self.depth()]
    }

    fn hash_traces(&self, leaf: Fr, address: u64) -> Vec<(Fr, Fr, Fr)> {
        let path = self.path(leaf, address);
        self.0
            .iter()
            .enumerate()
            .map(|(level, sibling)| {
                let node = path[level];
                let (left, right) = if address.bit(level) {
                    (*sibling, node)
                } else {
                    (node, *sibling)
                };
                (left, right, path[level + 1])
            })
            .collect()
    }
}

/// Witness for one authenticated update of a trade history slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradeHistoryUpdate {
    pub merkle_root_before: Fr,
    pub address: u64,
    pub before: TradeHistory,
    pub after: TradeHistory,
    pub proof: MerkleProof,
    pub fill: u128,
}

impl TradeHistoryUpdate {
    pub fn new(
        params: &TradeHistoryParams,
        merkle_root_before: Fr,
        address: u64,
        before: TradeHistory,
        after: TradeHistory,
        proof: MerkleProof,
        fill: u128,
    ) -> Result<Self, TradeHistoryError> {
        let update = Self {
            merkle_root_before,
            address,
            before,
            after,
            proof,
            fill,
        };
        update.check(params)?;
        Ok(update)
    }

    /// Shape checks only. Whether the proof authenticates `before` is left to
    /// the circuit.
    pub fn check(&self, params: &TradeHistoryParams) -> Result<(), TradeHistoryError> {
        if self.proof.depth() != params.tree_depth() {
            return Err(TradeHistoryError::ProofLength {
                expected: params.tree_depth(),
                actual: self.proof.depth(),
            });
        }
        params.check_address(self.address)
    }

    pub fn authenticates_before(&self) -> bool {
        self.proof.root(self.before.leaf_hash(), self.address) == self.merkle_root_before
    }

    pub fn new_root(&self) -> Fr {
        self.proof.root(self.after.leaf_hash(), self.address)
    }

    pub(crate) fn hash_traces(&self) -> Vec<(Fr, Fr, Fr)> {
        let mut traces = vec![];
        for record in [self.before, self.after] {
            traces.extend(record.hash_traces());
            traces.extend(self.proof.hash_traces(record.leaf_hash(), self.address));
        }
        traces
    }

    pub(crate) fn bit_width_checks(&self, params: &TradeHistoryParams) -> Vec<(Fr, usize)> {
        [self.before.filled, self.after.filled, self.fill]
            .into_iter()
            .map(|amount| (Fr::from_u128(amount), params.num_bits_amount()))
            .collect()
    }
}

/// A stored record revisited by `order_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TradeHistoryTrimming {
    pub stored: TradeHistory,
    pub order_id: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrimmedTradeHistory {
    pub filled: u128,
    pub cancelled: bool,
    pub cancelled_to_store: bool,
    pub order_id_to_store: u64,
}

impl TradeHistoryTrimming {
    pub fn is_newer_order(&self) -> bool {
        self.stored.order_id < self.order_id
    }

    /// The stored record belongs to a later order, so `order_id` has been
    /// superseded in this slot.
    pub fn is_force_cancelled(&self) -> bool {
        self.stored.order_id > self.order_id
    }

    pub fn trim(&self) -> TrimmedTradeHistory {
        let is_newer_order = self.is_newer_order();
        let cancelled_to_store = !is_newer_order && self.stored.cancelled;
        TrimmedTradeHistory {
            filled: if is_newer_order { 0 } else { self.stored.filled },
            cancelled: self.is_force_cancelled() || cancelled_to_store,
            cancelled_to_store,
            order_id_to_store: if is_newer_order {
                self.order_id
            } else {
                self.stored.order_id
            },
        }
    }

    pub(crate) fn order_id_difference(&self, n_bits: usize) -> Fr {
        difference(self.stored.order_id, self.order_id, n_bits).1
    }

    pub(crate) fn bit_width_checks(&self, params: &TradeHistoryParams) -> Vec<(Fr, usize)> {
        let n_bits = params.num_bits_order_id();
        vec![
            (Fr::from(self.stored.order_id), n_bits),
            (Fr::from(self.order_id), n_bits),
            (self.order_id_difference(n_bits), n_bits),
        ]
    }
}

/// One order filling into a slot: the slot is trimmed against `order_id` and
/// `fill` is added on top of what remains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderFill {
    pub order_id: u64,
    pub update: TradeHistoryUpdate,
}

impl OrderFill {
    pub fn trimming(&self) -> TradeHistoryTrimming {
        TradeHistoryTrimming {
            stored: self.update.before,
            order_id: self.order_id,
        }
    }

    /// The record a correct fill must write.
    pub fn expected_after(&self) -> Result<TradeHistory, TradeHistoryError> {
        let trimmed = self.trimming().trim();
        let filled = trimmed.filled.checked_add(self.update.fill).ok_or(
            TradeHistoryError::AmountOverflow {
                filled: trimmed.filled,
                fill: self.update.fill,
            },
        )?;
        Ok(TradeHistory {
            filled,
            cancelled: trimmed.cancelled_to_store,
            order_id: trimmed.order_id_to_store,
        })
    }

    pub(crate) fn bit_width_checks(&self, params: &TradeHistoryParams) -> Vec<(Fr, usize)> {
        let mut checks = self.update.bit_width_checks(params);
        checks.extend(self.trimming().bit_width_checks(params));
        checks
    }
}
