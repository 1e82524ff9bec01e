use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use cordyceps_avl::{Avl, AvlSet, Balance, Unbalanced};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "avl-dot", about = "Build a search tree and print it as a Graphviz digraph")]
struct Cli {
    /// Keys to insert, in order. Defaults to 0 1 2 3 when no random keys are requested.
    keys: Vec<u32>,
    /// Number of random keys to insert after the explicit ones.
    #[arg(long, default_value_t = 0)]
    random: usize,
    /// Random keys are drawn from `0..max_key`.
    #[arg(long, default_value_t = 10_000)]
    max_key: u32,
    /// Seed for the random key generator.
    #[arg(long)]
    seed: Option<u64>,
    /// Build a plain binary search tree instead of an AVL tree.
    #[arg(long)]
    unbalanced: bool,
    /// Name of the generated graph.
    #[arg(long, default_value = "tree")]
    name: String,
    /// Write the graph to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let keys = collect_keys(&cli)?;

    let graph = if cli.unbalanced {
        render::<Unbalanced>(&cli.name, keys)?
    } else {
        render::<Avl>(&cli.name, keys)?
    };

    match &cli.output {
        Some(path) => fs::write(path, graph)
            .with_context(|| format!("failed to write graph to {}", path.display()))?,
        None => println!("{graph}"),
    }

    Ok(())
}

fn collect_keys(cli: &Cli) -> Result<Vec<u32>> {
    if cli.keys.is_empty() && cli.random == 0 {
        return Ok((0..4).collect());
    }

    anyhow::ensure!(
        cli.random == 0 || cli.max_key > 0,
        "--max-key must be positive when generating random keys"
    );

    let mut keys = cli.keys.clone();
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    keys.extend((0..cli.random).map(|_| rng.random_range(0..cli.max_key)));

    Ok(keys)
}

fn render<S: Balance>(name: &str, keys: Vec<u32>) -> Result<String> {
    let mut set: AvlSet<u32, S> = AvlSet::new();

    for key in keys {
        if !set.insert(key) {
            debug!(key, "skipping duplicate key");
        }
    }

    info!(
        nodes = set.len(),
        height = set.height(),
        balanced = S::BALANCED,
        "built tree"
    );

    let mut graph = String::new();
    set.dotgraph(name, &mut graph)
        .context("failed to render graph")?;

    Ok(graph)
}
