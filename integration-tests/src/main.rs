use clap::Parser;
use halo2_proofs::{dev::MockProver, halo2curves::bn256::Fr};
use halo2_trade_history_circuits::{
    serde::{format_field, TradeHistoryBlock},
    TradeHistoryCircuit, TradeHistoryError, TradeHistoryTree, TREE_DEPTH_TRADING_HISTORY,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::{fs, path::PathBuf, process};

type BlockCircuit = TradeHistoryCircuit<TREE_DEPTH_TRADING_HISTORY>;

#[derive(Parser, Debug)]
#[command(
    name = "validate-block",
    about = "Checks a block of order fills against the trade history circuit"
)]
struct Cli {
    /// Block JSON to validate
    #[arg(required_unless_present = "demo", conflicts_with = "demo")]
    block: Option<PathBuf>,
    /// Validate a random consistent block with this many fills instead
    #[arg(long, value_name = "N_FILLS")]
    demo: Option<usize>,
    /// Seed for --demo
    #[arg(long, default_value_t = 0, requires = "demo")]
    seed: u64,
}

fn demo_block(n_fills: usize, seed: u64) -> Result<TradeHistoryBlock, TradeHistoryError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut tree = TradeHistoryTree::new(BlockCircuit::params()?);
    let fills = (0..n_fills)
        .map(|_| {
            // few slots and order ids so that slots get reused
            let address = rng.gen_range(0..8);
            let order_id = rng.gen_range(0..4);
            tree.fill_order(address, order_id, rng.gen_range(0..1_000_000))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TradeHistoryBlock::from_fills(&fills))
}

fn load_block(cli: &Cli) -> Result<TradeHistoryBlock, TradeHistoryError> {
    match (&cli.block, cli.demo) {
        (_, Some(n_fills)) => {
            let block = demo_block(n_fills, cli.seed)?;
            log::debug!("demo block:\n{}", block.to_json()?);
            Ok(block)
        }
        (Some(path), None) => TradeHistoryBlock::from_json(&fs::read_to_string(path)?),
        (None, None) => unreachable!("clap requires a block or --demo"),
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let circuit = match load_block(&cli)
        .and_then(|block| block.fills(&BlockCircuit::params()?))
        .and_then(BlockCircuit::new)
    {
        Ok(circuit) => circuit,
        Err(e) => {
            log::error!("cannot build circuit: {}", e);
            process::exit(1);
        }
    };
    let k = match circuit.k() {
        Ok(k) => k,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };

    println!(
        "validating {} fills with trade-history-circuit, k is {}",
        circuit.fills().len(),
        k
    );

    let prover = match MockProver::<Fr>::run(k, &circuit, circuit.instances()) {
        Ok(prover) => prover,
        Err(e) => {
            log::error!("synthesis failed: {:?}", e);
            process::exit(1);
        }
    };
    match prover.verify() {
        Ok(()) => println!(
            "block is valid, final root {}",
            circuit
                .exit_root()
                .map_or_else(|| "unchanged".to_string(), |root| format_field(&root))
        ),
        Err(failures) => {
            for failure in failures.iter().take(10) {
                log::error!("{:?}", failure);
            }
            println!("block is not valid ({} failures)", failures.len());
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_block_path() {
        let cli = Cli::try_parse_from(["validate-block", "block.json"]).unwrap();
        assert_eq!(cli.block, Some(PathBuf::from("block.json")));
        assert_eq!(cli.demo, None);
    }

    #[test]
    fn test_demo_with_seed() {
        let cli =
            Cli::try_parse_from(["validate-block", "--demo", "3", "--seed", "7"]).unwrap();
        assert_eq!((cli.demo, cli.seed), (Some(3), 7));
        assert_eq!(load_block(&cli).unwrap().fills.len(), 3);
    }

    #[test]
    fn test_rejected_arguments() {
        for args in [
            vec!["validate-block"],
            vec!["validate-block", "block.json", "--demo", "3"],
            vec!["validate-block", "block.json", "--seed", "7"],
            vec!["validate-block", "--demo", "many"],
        ] {
            assert!(Cli::try_parse_from(args).is_err());
        }
    }
}
