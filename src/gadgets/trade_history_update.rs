mod segment;

use super::{bit_representation::BitsLookup, one_hot::OneHot, poseidon::PoseidonLookup};
use crate::{
    constants::{TradeHistoryParams, LEAF_TAG},
    constraint_builder::{
        AdviceColumn, BinaryColumn, BinaryQuery, ConstraintBuilder, Query, SelectorColumn,
    },
    types::{TradeHistory, TradeHistoryUpdate},
    util::Bit,
};
use halo2_proofs::{
    arithmetic::{Field, FieldExt},
    circuit::{AssignedCell, Region},
    halo2curves::bn256::Fr,
    plonk::{ConstraintSystem, Error},
};
use segment::{previous_segments, SegmentType};
use strum::IntoEnumIterator;

/// A trade history record and the two hashes its leaf is folded from.
#[derive(Clone, Copy)]
pub struct TradeHistoryColumns {
    filled: AdviceColumn,
    cancelled: BinaryColumn,
    order_id: AdviceColumn,

    tagged_filled: AdviceColumn, // H(1, filled)
    flags: AdviceColumn,         // H(cancelled, order_id)
}

impl TradeHistoryColumns {
    fn configure<F: FieldExt>(cs: &mut ConstraintSystem<F>, cb: &mut ConstraintBuilder<F>) -> Self {
        let [filled, order_id, tagged_filled, flags] = cb.advice_columns(cs);
        let [cancelled] = cb.binary_columns(cs);
        Self {
            filled,
            cancelled,
            order_id,
            tagged_filled,
            flags,
        }
    }

    /// `[filled, cancelled, order_id]`
    pub fn current<F: FieldExt>(&self) -> [Query<F>; 3] {
        [
            self.filled.current(),
            self.cancelled.current().into(),
            self.order_id.current(),
        ]
    }

    fn configure_leaf_hash<F: FieldExt>(
        &self,
        cb: &mut ConstraintBuilder<F>,
        leaf_hash: Query<F>,
        poseidon: &impl PoseidonLookup,
    ) {
        cb.poseidon_lookup(
            "tagged_filled = h(1, filled)",
            [
                Query::from(LEAF_TAG),
                self.filled.current(),
                self.tagged_filled.current(),
            ],
            poseidon,
        );
        cb.poseidon_lookup(
            "flags = h(cancelled, order_id)",
            [
                self.cancelled.current().into(),
                self.order_id.current(),
                self.flags.current(),
            ],
            poseidon,
        );
        cb.poseidon_lookup(
            "leaf hash = h(tagged_filled, flags)",
            [self.tagged_filled.current(), self.flags.current(), leaf_hash],
            poseidon,
        );
    }

    fn assign(
        &self,
        region: &mut Region<'_, Fr>,
        offset: usize,
        record: &TradeHistory,
    ) -> Result<(), Error> {
        let [(_, _, tagged_filled), (_, _, flags), _] = record.hash_traces();
        self.filled
            .assign(region, offset, Fr::from_u128(record.filled))?;
        self.cancelled.assign(region, offset, record.cancelled)?;
        self.order_id.assign(region, offset, Fr::from(record.order_id))?;
        self.tagged_filled.assign(region, offset, tagged_filled)?;
        self.flags.assign(region, offset, flags)
    }
}

/// Exposes `(old_root, new_root, address)` of each update on its start row,
/// so that an enclosing circuit can look up the updates it relies on.
pub trait TradeHistoryUpdateLookup {
    fn lookup<F: FieldExt>(&self) -> [Query<F>; 3];
}

/// Cells holding the roots of one assigned update.
pub struct AssignedRoots {
    pub old_root: AssignedCell<Fr, Fr>,
    pub new_root: AssignedCell<Fr, Fr>,
}

/// Authenticated update of one trade history slot. The same siblings prove the
/// before leaf against `old_root` and derive `new_root` from the after leaf.
#[derive(Clone)]
pub struct TradeHistoryUpdateConfig {
    segment_type: OneHot<SegmentType>,
    depth: AdviceColumn,

    old_root: AdviceColumn,
    new_root: AdviceColumn,
    address: AdviceColumn,
    address_prefix: AdviceColumn, // address bits above the current level

    direction: BinaryColumn, // 1 if the node at this level is a right child
    sibling: AdviceColumn,
    old_hash: AdviceColumn,
    new_hash: AdviceColumn,

    before: TradeHistoryColumns,
    after: TradeHistoryColumns,
    fill: AdviceColumn,

    tree_depth: usize,
}

impl TradeHistoryUpdateConfig {
    pub fn configure<F: FieldExt>(
        cs: &mut ConstraintSystem<F>,
        cb: &mut ConstraintBuilder<F>,
        params: &TradeHistoryParams,
        poseidon: &impl PoseidonLookup,
        bits: &impl BitsLookup,
    ) -> Self {
        let segment_type = OneHot::configure(cs, cb);
        let [depth, old_root, new_root, address, address_prefix, sibling, old_hash, new_hash, fill] =
            cb.advice_columns(cs);
        let [direction] = cb.binary_columns(cs);
        let before = TradeHistoryColumns::configure(cs, cb);
        let after = TradeHistoryColumns::configure(cs, cb);
        cs.enable_equality(old_root.0);
        cs.enable_equality(new_root.0);

        let config = Self {
            segment_type,
            depth,
            old_root,
            new_root,
            address,
            address_prefix,
            direction,
            sibling,
            old_hash,
            new_hash,
            before,
            after,
            fill,
            tree_depth: params.tree_depth(),
        };

        for variant in SegmentType::iter() {
            let segment_type = &config.segment_type;
            cb.condition(segment_type.current_matches(&[variant]), |cb| {
                cb.assert(
                    "segment transition is allowed",
                    segment_type.previous_matches(previous_segments(variant)),
                );
            });
        }

        cb.condition(
            config.segment_type.current_matches(&[SegmentType::Start]),
            |cb| {
                cb.assert_zero("depth is 0 on start row", depth.current());
                cb.assert_zero("address prefix is 0 on start row", address_prefix.current());
                cb.assert_equal(
                    "old hash is old root on start row",
                    old_hash.current(),
                    old_root.current(),
                );
                cb.assert_equal(
                    "new hash is new root on start row",
                    new_hash.current(),
                    new_root.current(),
                );
            },
        );
        cb.condition(
            config
                .segment_type
                .current_matches(&[SegmentType::Trie, SegmentType::Leaf]),
            |cb| {
                for (name, column) in [
                    ("old root does not change within an update", old_root),
                    ("new root does not change within an update", new_root),
                    ("address does not change within an update", address),
                ] {
                    cb.assert_zero(name, column.delta());
                }
            },
        );
        cb.condition(
            config.segment_type.current_matches(&[SegmentType::Trie]),
            |cb| config.configure_trie(cb, poseidon),
        );
        cb.condition(
            config.segment_type.current_matches(&[SegmentType::Leaf]),
            |cb| config.configure_leaf(cb, params, poseidon, bits),
        );

        config
    }

    fn configure_trie<F: FieldExt>(
        &self,
        cb: &mut ConstraintBuilder<F>,
        poseidon: &impl PoseidonLookup,
    ) {
        cb.assert_equal(
            "depth increases by 1 on trie rows",
            self.depth.delta(),
            Query::one(),
        );
        cb.assert_equal(
            "address prefix = 2 * previous address prefix + direction",
            self.address_prefix.current(),
            self.address_prefix.previous() * 2 + self.direction.current(),
        );

        let direction = self.direction.current();
        let sibling = self.sibling.current();
        for (name, hash) in [
            ("previous old hash = h(old left, old right)", self.old_hash),
            ("previous new hash = h(new left, new right)", self.new_hash),
        ] {
            let left = direction.select(sibling.clone(), hash.current());
            let right = direction.select(hash.current(), sibling.clone());
            cb.poseidon_lookup(name, [left, right, hash.previous()], poseidon);
        }
    }

    fn configure_leaf<F: FieldExt>(
        &self,
        cb: &mut ConstraintBuilder<F>,
        params: &TradeHistoryParams,
        poseidon: &impl PoseidonLookup,
        bits: &impl BitsLookup,
    ) {
        cb.assert_equal(
            "leaf row follows TREE_DEPTH trie rows",
            self.depth.previous(),
            Query::from(self.tree_depth as u64),
        );
        cb.assert_equal(
            "address is the address prefix of the deepest trie row",
            self.address.current(),
            self.address_prefix.previous(),
        );
        for (name, hash) in [
            ("old leaf hash is the deepest old hash", self.old_hash),
            ("new leaf hash is the deepest new hash", self.new_hash),
        ] {
            cb.assert_zero(name, hash.delta());
        }

        self.before
            .configure_leaf_hash(cb, self.old_hash.current(), poseidon);
        self.after
            .configure_leaf_hash(cb, self.new_hash.current(), poseidon);

        let n_bits = params.num_bits_amount();
        cb.bit_width_lookup(
            "fill fits into NUM_BITS_AMOUNT",
            self.fill.current(),
            n_bits,
            bits,
        );
        cb.bit_width_lookup(
            "before filled fits into NUM_BITS_AMOUNT",
            self.before.filled.current(),
            n_bits,
            bits,
        );
        cb.bit_width_lookup(
            "after filled fits into NUM_BITS_AMOUNT",
            self.after.filled.current(),
            n_bits,
            bits,
        );
    }

    /// Every update after the first one starts from the root the previous
    /// update ended with.
    pub fn chain_roots<F: FieldExt>(&self, cb: &mut ConstraintBuilder<F>, every_row: SelectorColumn) {
        let is_start = self.segment_type.current_matches(&[SegmentType::Start]);
        cb.condition(is_start.and(every_row.rotation(-1)), |cb| {
            cb.assert(
                "update directly follows the previous update",
                self.segment_type.previous_matches(&[SegmentType::Leaf]),
            );
            cb.assert_equal(
                "old root is the new root of the previous update",
                self.old_root.current(),
                self.new_root.previous(),
            );
        });
    }

    pub fn is_leaf<F: FieldExt>(&self) -> BinaryQuery<F> {
        self.segment_type.current_matches(&[SegmentType::Leaf])
    }

    /// Record read from the slot, valid on the leaf row.
    pub fn before<F: FieldExt>(&self) -> [Query<F>; 3] {
        self.before.current()
    }

    /// Record written to the slot, valid on the leaf row.
    pub fn after<F: FieldExt>(&self) -> [Query<F>; 3] {
        self.after.current()
    }

    pub fn fill<F: FieldExt>(&self) -> Query<F> {
        self.fill.current()
    }

    pub fn new_root<F: FieldExt>(&self) -> Query<F> {
        self.new_root.current()
    }

    pub fn n_rows(&self) -> usize {
        self.tree_depth + 2
    }

    /// Assigns one update into the `n_rows` rows starting at `offset`, the
    /// last of which is the leaf row. A proof that doesn't authenticate
    /// `before` is still assigned; the circuit won't be satisfied.
    pub fn assign(
        &self,
        region: &mut Region<'_, Fr>,
        offset: usize,
        update: &TradeHistoryUpdate,
    ) -> Result<AssignedRoots, Error> {
        let tree_depth = self.tree_depth;
        if update.proof.depth() != tree_depth {
            log::error!(
                "proof for slot {} has {} siblings, tree depth is {}",
                update.address,
                update.proof.depth(),
                tree_depth
            );
            return Err(Error::Synthesis);
        }
        let old_path = update.proof.path(update.before.leaf_hash(), update.address);
        let new_path = update.proof.path(update.after.leaf_hash(), update.address);
        let old_root = update.merkle_root_before;
        let new_root = new_path[tree_depth];
        if old_path[tree_depth] != old_root {
            log::warn!(
                "proof for slot {} does not authenticate the stored record against {:?}",
                update.address,
                old_root
            );
        }

        let address = Fr::from(update.address);
        let roots = AssignedRoots {
            old_root: self.old_root.assign_cell(region, offset, old_root)?,
            new_root: self.new_root.assign_cell(region, offset, new_root)?,
        };
        self.address.assign(region, offset, address)?;
        for i in 1..self.n_rows() {
            self.old_root.assign(region, offset + i, old_root)?;
            self.new_root.assign(region, offset + i, new_root)?;
            self.address.assign(region, offset + i, address)?;
        }

        self.segment_type
            .assign(region, offset, SegmentType::Start)?;
        self.depth.assign(region, offset, Fr::zero())?;
        self.address_prefix.assign(region, offset, Fr::zero())?;
        self.old_hash.assign(region, offset, old_root)?;
        self.new_hash.assign(region, offset, new_root)?;

        for depth in 1..=tree_depth {
            let level = tree_depth - depth;
            let offset = offset + depth;
            self.segment_type.assign(region, offset, SegmentType::Trie)?;
            self.depth.assign(region, offset, Fr::from(depth as u64))?;
            self.address_prefix
                .assign(region, offset, Fr::from(update.address >> level))?;
            self.direction
                .assign(region, offset, update.address.bit(level))?;
            self.sibling.assign(region, offset, update.proof.0[level])?;
            self.old_hash.assign(region, offset, old_path[level])?;
            self.new_hash.assign(region, offset, new_path[level])?;
        }

        let offset = offset + tree_depth + 1;
        self.segment_type.assign(region, offset, SegmentType::Leaf)?;
        self.old_hash.assign(region, offset, old_path[0])?;
        self.new_hash.assign(region, offset, new_path[0])?;
        self.before.assign(region, offset, &update.before)?;
        self.after.assign(region, offset, &update.after)?;
        self.fill.assign(region, offset, Fr::from_u128(update.fill))?;

        Ok(roots)
    }
}

impl TradeHistoryUpdateLookup for TradeHistoryUpdateConfig {
    fn lookup<F: FieldExt>(&self) -> [Query<F>; 3] {
        let is_start = || self.segment_type.current_matches(&[SegmentType::Start]);
        [
            self.old_root.current() * is_start(),
            self.new_root.current() * is_start(),
            self.address.current() * is_start(),
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        gadgets::{bit_representation::BitRepresentationConfig, poseidon::PoseidonTable},
        types::TradeHistoryTree,
    };
    use halo2_proofs::{
        circuit::{Layouter, SimpleFloorPlanner},
        dev::MockProver,
        plonk::Circuit,
    };
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const TEST_TREE_DEPTH: usize = 4;

    fn params() -> TradeHistoryParams {
        TradeHistoryParams::with_tree_depth(TEST_TREE_DEPTH).unwrap()
    }

    #[derive(Clone, Default)]
    struct TestCircuit {
        updates: Vec<TradeHistoryUpdate>,
        // (old root, new root, address) an enclosing circuit relies on
        claims: Vec<(Fr, Fr, u64)>,
    }

    impl Circuit<Fr> for TestCircuit {
        type Config = (
            SelectorColumn,
            PoseidonTable,
            BitRepresentationConfig,
            TradeHistoryUpdateConfig,
            BinaryColumn,
            [AdviceColumn; 3],
        );
        type FloorPlanner = SimpleFloorPlanner;

        fn without_witnesses(&self) -> Self {
            Self::default()
        }

        fn configure(cs: &mut ConstraintSystem<Fr>) -> Self::Config {
            let selector = SelectorColumn(cs.fixed_column());
            let mut cb = ConstraintBuilder::new(selector);
            let poseidon = PoseidonTable::configure(cs, &mut cb);
            let bits = BitRepresentationConfig::configure(cs, &mut cb);
            let update =
                TradeHistoryUpdateConfig::configure(cs, &mut cb, &params(), &poseidon, &bits);
            update.chain_roots(&mut cb, selector);

            let [is_claim] = cb.binary_columns(cs);
            let claim = cb.advice_columns(cs);
            cb.condition(is_claim.current(), |cb| {
                cb.add_lookup(
                    "claimed update is proven",
                    claim.map(|column| column.current()),
                    update.lookup(),
                );
            });
            cb.build(cs);
            (selector, poseidon, bits, update, is_claim, claim)
        }

        fn synthesize(
            &self,
            config: Self::Config,
            mut layouter: impl Layouter<Fr>,
        ) -> Result<(), Error> {
            let (selector, poseidon, bits, update_config, is_claim, claim) = config;
            let hash_traces: Vec<_> = self
                .updates
                .iter()
                .flat_map(|update| update.hash_traces())
                .collect();
            let checks: Vec<_> = self
                .updates
                .iter()
                .flat_map(|update| update.bit_width_checks(&params()))
                .collect();
            let n_rows = [
                1 + self.updates.len() * update_config.n_rows(),
                1 + self.claims.len(),
                PoseidonTable::n_rows_required(&hash_traces),
                BitRepresentationConfig::n_rows_required(&checks),
            ]
            .into_iter()
            .max()
            .unwrap();

            layouter.assign_region(
                || "",
                |mut region| {
                    for offset in 1..n_rows {
                        selector.enable(&mut region, offset)?;
                    }
                    let mut offset = 1;
                    for update in &self.updates {
                        update_config.assign(&mut region, offset, update)?;
                        offset += update_config.n_rows();
                    }
                    for (i, (old_root, new_root, address)) in self.claims.iter().enumerate() {
                        let offset = i + 1;
                        is_claim.assign(&mut region, offset, true)?;
                        claim[0].assign(&mut region, offset, *old_root)?;
                        claim[1].assign(&mut region, offset, *new_root)?;
                        claim[2].assign(&mut region, offset, Fr::from(*address))?;
                    }
                    poseidon.dev_load(&mut region, &hash_traces)?;
                    bits.assign(&mut region, &checks)
                },
            )
        }
    }

    fn random_updates(n: usize) -> Vec<TradeHistoryUpdate> {
        let mut rng = ChaCha8Rng::seed_from_u64(n as u64);
        let mut tree = TradeHistoryTree::new(params());
        (0..n)
            .map(|_| {
                let address = rng.gen_range(0..1 << TEST_TREE_DEPTH);
                let after = TradeHistory {
                    filled: rng.gen::<u64>().into(),
                    cancelled: rng.gen(),
                    order_id: rng.gen_range(1..1 << 20),
                };
                tree.update(address, after, rng.gen::<u64>().into()).unwrap()
            })
            .collect()
    }

    fn verify(updates: Vec<TradeHistoryUpdate>) -> bool {
        verify_claims(updates, vec![])
    }

    fn verify_claims(updates: Vec<TradeHistoryUpdate>, claims: Vec<(Fr, Fr, u64)>) -> bool {
        let circuit = TestCircuit { updates, claims };
        let prover = MockProver::<Fr>::run(12, &circuit, vec![]).unwrap();
        prover.verify().is_ok()
    }

    fn claim(update: &TradeHistoryUpdate) -> (Fr, Fr, u64) {
        (update.merkle_root_before, update.new_root(), update.address)
    }

    #[test]
    fn test_no_updates() {
        assert!(verify(vec![]));
    }

    #[test]
    fn test_updates() {
        assert!(verify(random_updates(4)));
    }

    #[test]
    fn test_repeated_slot() {
        let mut tree = TradeHistoryTree::new(params());
        let record = |filled| TradeHistory {
            filled,
            cancelled: false,
            order_id: 7,
        };
        let updates = vec![
            tree.update(5, record(10), 10).unwrap(),
            tree.update(5, record(30), 20).unwrap(),
            tree.update(5, TradeHistory::default(), 0).unwrap(),
        ];
        assert_eq!(updates[2].new_root(), TradeHistoryTree::new(params()).root());
        assert!(verify(updates));
    }

    #[test]
    fn test_claimed_updates() {
        let updates = random_updates(3);
        let claims = updates.iter().rev().map(claim).collect();
        assert!(verify_claims(updates, claims));
    }

    #[test]
    fn test_claim_with_other_address() {
        let updates = random_updates(2);
        let (old_root, new_root, address) = claim(&updates[0]);
        let claims = vec![(old_root, new_root, address ^ 1)];
        assert!(!verify_claims(updates, claims));
    }

    #[test]
    fn test_claim_with_other_root_before() {
        let updates = random_updates(2);
        let (_, new_root, address) = claim(&updates[1]);
        let claims = vec![(Fr::from(1234), new_root, address)];
        assert!(!verify_claims(updates, claims));
    }

    #[test]
    fn test_forged_sibling() {
        let mut updates = random_updates(2);
        updates[1].proof.0[2] += Fr::one();
        assert!(!verify(updates));
    }

    #[test]
    fn test_forged_root() {
        let mut updates = random_updates(2);
        updates[0].merkle_root_before = Fr::from(1234);
        assert!(!verify(updates));
    }

    #[test]
    fn test_wrong_address() {
        let mut tree = TradeHistoryTree::new(params());
        let record = |order_id| TradeHistory {
            filled: 1,
            cancelled: false,
            order_id,
        };
        let mut updates = vec![
            tree.update(5, record(1), 1).unwrap(),
            tree.update(6, record(2), 1).unwrap(),
        ];
        assert!(verify(updates.clone()));

        // slot 5 sits under the level 1 sibling of slot 6, so moving to the
        // other side of it changes the hash order.
        updates[1].address = 4;
        assert!(!verify(updates));
    }

    #[test]
    fn test_broken_chain() {
        let mut updates = random_updates(3);
        updates.swap(1, 2);
        assert!(!verify(updates));
    }

    #[test]
    fn test_fill_width() {
        let mut updates = random_updates(1);
        updates[0].fill = (1 << 96) - 1;
        assert!(verify(updates.clone()));

        updates[0].fill = 1 << 96;
        assert!(!verify(updates));
    }

    #[test]
    fn test_filled_width() {
        let mut tree = TradeHistoryTree::new(params());
        let after = TradeHistory {
            filled: 1 << 96,
            cancelled: false,
            order_id: 1,
        };
        let update = tree.update(3, after, 0).unwrap();
        assert!(!verify(vec![update]));
    }
}
