use crate::{
    constants::{
        TradeHistoryParams, MAX_TREE_DEPTH, NUM_BITS_AMOUNT, NUM_BITS_ORDER_ID,
        TREE_DEPTH_TRADING_HISTORY,
    },
    constraint_builder::{AdviceColumn, ConstraintBuilder, SelectorColumn},
    error::TradeHistoryError,
    gadgets::{
        bit_representation::BitRepresentationConfig, poseidon::PoseidonTable,
        trade_history_trimming::TradeHistoryTrimmingConfig,
        trade_history_update::{AssignedRoots, TradeHistoryUpdateConfig},
    },
    types::OrderFill,
    util::log2_ceil,
};
use halo2_proofs::{
    circuit::{Layouter, SimpleFloorPlanner},
    halo2curves::bn256::Fr,
    plonk::{Circuit, Column, ConstraintSystem, Error, Instance},
};
use itertools::Itertools;
use rayon::prelude::*;

// Rows reserved at the end of the domain for blinding factors.
const UNUSABLE_ROWS: usize = 16;

/// A block of order fills against one trade history tree. Each fill is an
/// authenticated update of its slot whose after record is the trimmed before
/// record plus the fill, and consecutive fills chain their roots. The roots
/// before and after the block are the public inputs.
#[derive(Clone, Debug, Default)]
pub struct TradeHistoryCircuit<const TREE_DEPTH: usize = TREE_DEPTH_TRADING_HISTORY> {
    fills: Vec<OrderFill>,
}

#[derive(Clone)]
pub struct TradeHistoryCircuitConfig {
    selector: SelectorColumn,
    poseidon: PoseidonTable,
    bits: BitRepresentationConfig,
    update: TradeHistoryUpdateConfig,
    trimming: TradeHistoryTrimmingConfig,
    order_id: AdviceColumn,
    instance: Column<Instance>,
}

impl<const TREE_DEPTH: usize> TradeHistoryCircuit<TREE_DEPTH> {
    const TREE_DEPTH_IN_RANGE: () = assert!(
        0 < TREE_DEPTH && TREE_DEPTH <= MAX_TREE_DEPTH,
        "TREE_DEPTH is out of range"
    );

    pub fn params() -> Result<TradeHistoryParams, TradeHistoryError> {
        TradeHistoryParams::new(TREE_DEPTH, NUM_BITS_AMOUNT, NUM_BITS_ORDER_ID)
    }

    pub fn new(fills: Vec<OrderFill>) -> Result<Self, TradeHistoryError> {
        let params = Self::params()?;
        for fill in &fills {
            fill.update.check(&params)?;
        }
        Ok(Self { fills })
    }

    pub fn fills(&self) -> &[OrderFill] {
        &self.fills
    }

    pub fn start_root(&self) -> Option<Fr> {
        self.fills.first().map(|fill| fill.update.merkle_root_before)
    }

    pub fn exit_root(&self) -> Option<Fr> {
        self.fills.last().map(|fill| fill.update.new_root())
    }

    /// `[start_root, exit_root]`, empty for a block without fills.
    pub fn instances(&self) -> Vec<Vec<Fr>> {
        vec![self.start_root().into_iter().chain(self.exit_root()).collect()]
    }

    fn hash_traces(&self) -> Vec<(Fr, Fr, Fr)> {
        self.fills
            .par_iter()
            .flat_map_iter(|fill| fill.update.hash_traces())
            .collect()
    }

    fn bit_width_checks(&self, params: &TradeHistoryParams) -> Vec<(Fr, usize)> {
        let checks: Vec<_> = self
            .fills
            .par_iter()
            .flat_map_iter(|fill| fill.bit_width_checks(params))
            .collect();
        checks
            .into_iter()
            .unique_by(|(value, n_bits)| (value.to_bytes(), *n_bits))
            .collect()
    }

    fn n_rows(
        &self,
        hash_traces: &[(Fr, Fr, Fr)],
        bit_width_checks: &[(Fr, usize)],
    ) -> usize {
        [
            1 + self.fills.len() * (TREE_DEPTH + 2),
            PoseidonTable::n_rows_required(hash_traces),
            BitRepresentationConfig::n_rows_required(bit_width_checks),
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }

    /// Number of rows the witness occupies, not counting rows kept free for
    /// blinding.
    pub fn n_rows_required(&self) -> Result<usize, TradeHistoryError> {
        let params = Self::params()?;
        Ok(self.n_rows(&self.hash_traces(), &self.bit_width_checks(&params)))
    }

    /// Smallest `k` whose domain fits the witness.
    pub fn k(&self) -> Result<u32, TradeHistoryError> {
        Ok(log2_ceil(self.n_rows_required()? + UNUSABLE_ROWS).max(6))
    }
}

impl<const TREE_DEPTH: usize> Circuit<Fr> for TradeHistoryCircuit<TREE_DEPTH> {
    type Config = TradeHistoryCircuitConfig;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self::default()
    }

    fn configure(cs: &mut ConstraintSystem<Fr>) -> Self::Config {
        let () = Self::TREE_DEPTH_IN_RANGE;
        let params = Self::params().expect("TREE_DEPTH is checked at compile time");

        let selector = SelectorColumn(cs.fixed_column());
        let mut cb = ConstraintBuilder::new(selector);

        let poseidon = PoseidonTable::configure(cs, &mut cb);
        let bits = BitRepresentationConfig::configure(cs, &mut cb);
        let update = TradeHistoryUpdateConfig::configure(cs, &mut cb, &params, &poseidon, &bits);
        update.chain_roots(&mut cb, selector);

        let instance = cs.instance_column();
        cs.enable_equality(instance);

        let [order_id] = cb.advice_columns(cs);
        let trimming = cb.condition(update.is_leaf(), |cb| {
            let trimming = TradeHistoryTrimmingConfig::configure(
                cs,
                cb,
                update.before(),
                order_id.current(),
                &params,
                &bits,
            );

            let [filled, cancelled, stored_order_id] = update.after();
            cb.assert_equal(
                "after filled = trimmed filled + fill",
                filled,
                trimming.filled() + update.fill(),
            );
            cb.assert_equal(
                "after cancelled = trimmed cancelled_to_store",
                cancelled,
                trimming.cancelled_to_store(),
            );
            cb.assert_equal(
                "after order id = trimmed order_id_to_store",
                stored_order_id,
                trimming.order_id_to_store(),
            );
            trimming
        });

        cb.build(cs);

        TradeHistoryCircuitConfig {
            selector,
            poseidon,
            bits,
            update,
            trimming,
            order_id,
            instance,
        }
    }

    fn synthesize(&self, config: Self::Config, mut layouter: impl Layouter<Fr>) -> Result<(), Error> {
        let params = Self::params().map_err(|e| {
            log::error!("{}", e);
            Error::Synthesis
        })?;
        let hash_traces = self.hash_traces();
        let bit_width_checks = self.bit_width_checks(&params);
        let n_rows = self.n_rows(&hash_traces, &bit_width_checks);
        log::debug!(
            "assigning {} fills into {} rows ({} hashes, {} range checks)",
            self.fills.len(),
            n_rows,
            hash_traces.len(),
            bit_width_checks.len()
        );

        let roots = layouter.assign_region(
            || "trade history",
            |mut region| {
                for offset in 1..n_rows {
                    config.selector.enable(&mut region, offset)?;
                }

                // old root of the first update, new root of the last one
                let mut roots: Option<AssignedRoots> = None;
                let mut offset = 1;
                for fill in &self.fills {
                    let assigned = config.update.assign(&mut region, offset, &fill.update)?;
                    roots = Some(match roots.take() {
                        Some(first) => AssignedRoots {
                            old_root: first.old_root,
                            new_root: assigned.new_root,
                        },
                        None => assigned,
                    });

                    let leaf_offset = offset + config.update.n_rows() - 1;
                    config
                        .order_id
                        .assign(&mut region, leaf_offset, Fr::from(fill.order_id))?;
                    config
                        .trimming
                        .assign(&mut region, leaf_offset, &fill.trimming())?;
                    offset += config.update.n_rows();
                }

                config.poseidon.dev_load(&mut region, &hash_traces)?;
                config.bits.assign(&mut region, &bit_width_checks)?;
                Ok(roots)
            },
        )?;

        if let Some(roots) = roots {
            layouter.constrain_instance(roots.old_root.cell(), config.instance, 0)?;
            layouter.constrain_instance(roots.new_root.cell(), config.instance, 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::TradeHistoryTree;
    use halo2_proofs::dev::MockProver;

    const TEST_TREE_DEPTH: usize = 3;

    fn tree() -> TradeHistoryTree {
        TradeHistoryTree::new(TradeHistoryCircuit::<TEST_TREE_DEPTH>::params().unwrap())
    }

    fn verify(circuit: &TradeHistoryCircuit<TEST_TREE_DEPTH>) -> bool {
        verify_against(circuit, circuit.instances())
    }

    fn verify_against(circuit: &TradeHistoryCircuit<TEST_TREE_DEPTH>, instances: Vec<Vec<Fr>>) -> bool {
        let k = circuit.k().unwrap();
        let prover = MockProver::<Fr>::run(k, circuit, instances).unwrap();
        prover.verify().is_ok()
    }

    #[test]
    fn test_empty_block() {
        let circuit = TradeHistoryCircuit::<TEST_TREE_DEPTH>::default();
        assert_eq!(circuit.start_root(), None);
        assert_eq!(circuit.instances(), vec![vec![]]);
        assert!(verify(&circuit));
    }

    #[test]
    fn test_public_roots() {
        let mut tree = tree();
        let start_root = tree.root();
        let fills = vec![
            tree.fill_order(2, 5, 100).unwrap(),
            tree.fill_order(4, 1, 3).unwrap(),
        ];
        let circuit = TradeHistoryCircuit::<TEST_TREE_DEPTH>::new(fills).unwrap();
        let exit_root = tree.root();
        assert_eq!(circuit.instances(), vec![vec![start_root, exit_root]]);

        assert!(verify_against(&circuit, vec![vec![start_root, exit_root]]));
        assert!(!verify_against(
            &circuit,
            vec![vec![start_root + Fr::one(), exit_root]]
        ));
        assert!(!verify_against(
            &circuit,
            vec![vec![start_root, exit_root + Fr::one()]]
        ));
    }

    #[test]
    fn test_max_tree_depth_configures() {
        let mut cs = ConstraintSystem::<Fr>::default();
        TradeHistoryCircuit::<MAX_TREE_DEPTH>::configure(&mut cs);
        assert!(TradeHistoryCircuit::<MAX_TREE_DEPTH>::params().is_ok());
    }

    #[test]
    fn test_slot_reuse() {
        let mut tree = tree();
        let fills = vec![
            tree.fill_order(2, 5, 100).unwrap(),
            tree.fill_order(2, 5, 20).unwrap(),
            tree.fill_order(2, 9, 7).unwrap(),
            tree.fill_order(2, 5, 0).unwrap(),
            tree.fill_order(6, 3, 1).unwrap(),
        ];
        let circuit = TradeHistoryCircuit::<TEST_TREE_DEPTH>::new(fills).unwrap();
        assert_eq!(circuit.exit_root(), Some(tree.root()));
        assert!(verify(&circuit));
    }

    #[test]
    fn test_stale_state_carried_over() {
        let mut tree = tree();
        let mut fills = vec![
            tree.fill_order(2, 5, 100).unwrap(),
            tree.fill_order(2, 9, 7).unwrap(),
        ];
        // A newer order that keeps the previous order's filled amount.
        let stale = &mut fills[1].update;
        stale.after.filled = 107;
        assert!(!verify(
            &TradeHistoryCircuit::<TEST_TREE_DEPTH>::new(fills).unwrap()
        ));
    }

    #[test]
    fn test_superseded_order_overwrites_slot() {
        let mut tree = tree();
        let mut fills = vec![
            tree.fill_order(2, 9, 100).unwrap(),
            tree.fill_order(2, 5, 0).unwrap(),
        ];
        fills[1].update.after.order_id = 5;
        assert!(!verify(
            &TradeHistoryCircuit::<TEST_TREE_DEPTH>::new(fills).unwrap()
        ));
    }

    #[test]
    fn test_n_rows_required() {
        let mut tree = tree();
        let circuit = TradeHistoryCircuit::<TEST_TREE_DEPTH>::new(vec![tree
            .fill_order(1, 1, 1)
            .unwrap()])
        .unwrap();
        // after filled and fill are both 1, so two distinct amount checks.
        // Order ids 0 and 1 and their difference 2^20 - 1 are distinct.
        assert_eq!(circuit.n_rows_required().unwrap(), 1 + 2 * 96 + 3 * 20);
    }

    #[test]
    fn test_proof_length_rejected() {
        let mut tree = TradeHistoryTree::new(TradeHistoryParams::with_tree_depth(4).unwrap());
        let fill = tree.fill_order(1, 1, 1).unwrap();
        assert!(matches!(
            TradeHistoryCircuit::<TEST_TREE_DEPTH>::new(vec![fill]),
            Err(TradeHistoryError::ProofLength {
                expected: TEST_TREE_DEPTH,
                actual: 4
            })
        ));
    }
}
