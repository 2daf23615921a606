use criterion::{criterion_group, criterion_main, Criterion};
use halo2_proofs::{dev::MockProver, halo2curves::bn256::Fr};
use halo2_trade_history_circuits::{TradeHistoryCircuit, TradeHistoryTree};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn bench(criterion: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let mut tree = TradeHistoryTree::new(TradeHistoryCircuit::<14>::params().unwrap());
    let fills = (0..64)
        .map(|_| {
            tree.fill_order(
                rng.gen_range(0..1 << 14),
                rng.gen_range(0..1 << 20),
                rng.gen::<u64>().into(),
            )
            .unwrap()
        })
        .collect();
    let circuit = TradeHistoryCircuit::<14>::new(fills).unwrap();
    let k = circuit.k().unwrap();

    criterion.bench_function("assign 64 fills", |bencher| {
        bencher.iter(|| MockProver::<Fr>::run(k, &circuit, circuit.instances()))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench
}

criterion_main!(benches);
