use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use treesum::{driver, load_tree, load_values, PromptedValues, ReductionConfig};

#[derive(Parser, Debug)]
#[command(name = "treesum", about = "Sum leaf values up a tree, one thread per node")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the reduction and print the sum at the root.
    Sum {
        /// Tree definition: record count, then `child parent` pairs.
        #[arg(default_value = "tree.txt")]
        tree: PathBuf,
        /// Leaf values file (`<node> <value>` per line); prompts on stdin when absent.
        #[arg(long)]
        values: Option<PathBuf>,
        /// Maximum number of nodes accepted.
        #[arg(long, default_value_t = treesum::tree::DEFAULT_CAPACITY)]
        capacity: usize,
        /// Give up on any barrier wait after this many milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Worker thread stack size in bytes.
        #[arg(long, default_value_t = treesum::DEFAULT_STACK_SIZE)]
        stack_size: usize,
        /// Print every internal node's partial sum.
        #[arg(short, long)]
        verbose: bool,
    },
    /// Validate a tree definition and print its structure.
    Check {
        /// Tree definition file.
        #[arg(default_value = "tree.txt")]
        tree: PathBuf,
        /// Maximum number of nodes accepted.
        #[arg(long, default_value_t = treesum::tree::DEFAULT_CAPACITY)]
        capacity: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = matches!(cli.command, Commands::Sum { verbose: true, .. });
    init_tracing(verbose);

    match cli.command {
        Commands::Sum {
            tree,
            values,
            capacity,
            timeout_ms,
            stack_size,
            verbose,
        } => {
            let mut config = ReductionConfig::default()
                .with_capacity(capacity)
                .with_stack_size(stack_size);
            if let Some(ms) = timeout_ms {
                config = config.with_barrier_timeout(Duration::from_millis(ms));
            }
            run_sum(tree, values, config, verbose)?
        }
        Commands::Check { tree, capacity } => run_check(tree, capacity)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .init();
}

fn run_sum(
    tree_path: PathBuf,
    values_path: Option<PathBuf>,
    config: ReductionConfig,
    verbose: bool,
) -> Result<()> {
    let tree = load_tree(&tree_path, config.capacity)
        .with_context(|| format!("failed to load tree from {}", tree_path.display()))?;

    let report = match values_path {
        Some(path) => {
            let values = load_values(&path)
                .with_context(|| format!("failed to load leaf values from {}", path.display()))?;
            driver::run(tree, &values, &config)
        }
        None => driver::run(tree, &PromptedValues::stdio(), &config),
    }
    .context("reduction failed")?;

    if verbose {
        for partial in &report.partial_sums {
            println!("{}", partial);
        }
    }
    println!("{}", report);

    Ok(())
}

fn run_check(tree_path: PathBuf, capacity: usize) -> Result<()> {
    let tree = load_tree(&tree_path, capacity)
        .with_context(|| format!("failed to load tree from {}", tree_path.display()))?;
    println!("{}", tree);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sum_arguments() {
        let cli = Cli::try_parse_from([
            "treesum",
            "sum",
            "nodes.txt",
            "--values",
            "leaves.txt",
            "--timeout-ms",
            "50",
            "-v",
        ])
        .unwrap();
        match cli.command {
            Commands::Sum {
                tree,
                values,
                capacity,
                timeout_ms,
                stack_size,
                verbose,
            } => {
                assert_eq!(tree, PathBuf::from("nodes.txt"));
                assert_eq!(values, Some(PathBuf::from("leaves.txt")));
                assert_eq!(capacity, 100);
                assert_eq!(timeout_ms, Some(50));
                assert_eq!(stack_size, treesum::DEFAULT_STACK_SIZE);
                assert!(verbose);
            }
            other => panic!("expected sum, got {:?}", other),
        }
    }

    #[test]
    fn test_check_defaults() {
        let cli = Cli::try_parse_from(["treesum", "check"]).unwrap();
        match cli.command {
            Commands::Check { tree, capacity } => {
                assert_eq!(tree, PathBuf::from("tree.txt"));
                assert_eq!(capacity, 100);
            }
            other => panic!("expected check, got {:?}", other),
        }
    }
}
