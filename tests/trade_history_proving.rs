use halo2_proofs::{dev::MockProver, halo2curves::bn256::Fr};
use halo2_trade_history_circuits::{
    OrderFill, TradeHistory, TradeHistoryCircuit, TradeHistoryTree, NUM_BITS_AMOUNT,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

type BlockCircuit = TradeHistoryCircuit;

fn mock_prove(fills: Vec<OrderFill>) -> Result<(), Vec<halo2_proofs::dev::VerifyFailure>> {
    let circuit = BlockCircuit::new(fills).unwrap();
    let k = circuit.k().unwrap();
    let prover = MockProver::<Fr>::run(k, &circuit, circuit.instances()).unwrap();
    prover.verify()
}

fn tree() -> TradeHistoryTree {
    TradeHistoryTree::new(BlockCircuit::params().unwrap())
}

fn random_fills(rng: &mut ChaCha8Rng, tree: &mut TradeHistoryTree, n: usize) -> Vec<OrderFill> {
    (0..n)
        .map(|_| {
            let address = rng.gen_range(0..4);
            let order_id = rng.gen_range(0..6);
            tree.fill_order(address, order_id, rng.gen::<u64>().into())
                .unwrap()
        })
        .collect()
}

#[test]
fn block_of_fills() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut tree = tree();
    let fills = random_fills(&mut rng, &mut tree, 12);
    assert_eq!(BlockCircuit::new(fills.clone()).unwrap().exit_root(), Some(tree.root()));
    assert_eq!(mock_prove(fills), Ok(()));
}

#[test]
fn fill_new_order_into_used_slot() {
    let mut tree = tree();
    let first = tree.fill_order(100, 5, 100).unwrap();
    let second = tree.fill_order(100, 9, 30).unwrap();
    assert_eq!(
        second.update.after,
        TradeHistory {
            filled: 30,
            cancelled: false,
            order_id: 9,
        }
    );
    assert_eq!(mock_prove(vec![first, second]), Ok(()));
}

#[test]
fn fill_cancelled_order() {
    let mut tree = tree();
    tree.set(
        7,
        TradeHistory {
            filled: 10,
            cancelled: true,
            order_id: 5,
        },
    )
    .unwrap();
    let fill = tree.fill_order(7, 5, 0).unwrap();
    assert!(fill.trimming().trim().cancelled);
    assert!(fill.update.after.cancelled);
    assert_eq!(mock_prove(vec![fill]), Ok(()));
}

#[test]
fn replayed_order_is_force_cancelled() {
    let mut tree = tree();
    let fills = vec![
        tree.fill_order(3, 9, 50).unwrap(),
        tree.fill_order(3, 5, 0).unwrap(),
    ];
    let replay = fills[1].trimming().trim();
    assert!(replay.cancelled);
    assert!(!replay.cancelled_to_store);
    assert_eq!(fills[1].update.after, fills[1].update.before);
    assert_eq!(mock_prove(fills), Ok(()));
}

#[test]
fn malice_after_record() {
    let mut tree = tree();
    let mut fills = vec![tree.fill_order(3, 5, 50).unwrap()];
    fills[0].update.after.filled += 1;
    assert_ne!(mock_prove(fills), Ok(()));
}

#[test]
fn malice_cancelled_flag_dropped() {
    let mut tree = tree();
    tree.set(
        1,
        TradeHistory {
            filled: 10,
            cancelled: true,
            order_id: 5,
        },
    )
    .unwrap();
    let mut fills = vec![tree.fill_order(1, 5, 1).unwrap()];
    fills[0].update.after.cancelled = false;
    assert_ne!(mock_prove(fills), Ok(()));
}

#[test]
fn malice_forged_sibling() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut tree = tree();
    let mut fills = random_fills(&mut rng, &mut tree, 3);
    fills[2].update.proof.0[5] = Fr::from(42);
    assert_ne!(mock_prove(fills), Ok(()));
}

#[test]
fn malice_broken_root_chain() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut tree = tree();
    let mut fills = random_fills(&mut rng, &mut tree, 3);
    fills.remove(1);
    assert_ne!(mock_prove(fills), Ok(()));
}

#[test]
fn malice_block_built_on_other_state() {
    let stored = |filled| TradeHistory {
        filled,
        cancelled: false,
        order_id: 5,
    };
    let mut other_tree = tree();
    other_tree.set(3, stored(0)).unwrap();
    let mut tree = tree();
    tree.set(3, stored(1000)).unwrap();

    let circuit = BlockCircuit::new(vec![other_tree.fill_order(3, 5, 10).unwrap()]).unwrap();
    let k = circuit.k().unwrap();
    let prove_from = |start_root| {
        MockProver::<Fr>::run(k, &circuit, vec![vec![start_root, other_tree.root()]])
            .unwrap()
            .verify()
    };
    assert_eq!(prove_from(circuit.start_root().unwrap()), Ok(()));
    assert_ne!(prove_from(tree.root()), Ok(()));
}

#[test]
fn malice_fill_too_wide() {
    let mut tree = tree();
    let fill = 1u128 << NUM_BITS_AMOUNT;
    let fills = vec![tree.fill_order(0, 1, fill).unwrap()];
    assert_ne!(mock_prove(fills), Ok(()));
}

#[test]
fn malice_order_id_too_wide() {
    let mut tree = tree();
    let fills = vec![tree.fill_order(0, 1 << 20, 1).unwrap()];
    assert_ne!(mock_prove(fills), Ok(()));
}

#[cfg(feature = "print_layout")]
#[test]
fn print_layout() {
    use plotters::prelude::*;

    let mut tree = tree();
    let circuit = BlockCircuit::new(vec![tree.fill_order(1, 1, 1).unwrap()]).unwrap();
    let k = circuit.k().unwrap();

    let root = BitMapBackend::new("trade-history-layout.png", (1024, 2048)).into_drawing_area();
    root.fill(&WHITE).unwrap();
    let root = root
        .titled("Trade history layout", ("sans-serif", 60))
        .unwrap();
    halo2_proofs::dev::CircuitLayout::default()
        .render(k, &circuit, &root)
        .unwrap();
}
