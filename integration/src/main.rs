//! Behavioral tests for the VBTC token. These assume that a devnet is already
//! running locally and that the token has been compiled into the artifacts directory.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{eyre, Result};
use test_args::TestArgs;
use test_inventory::IntegrationTest;
use tracing_subscriber::EnvFilter;

mod test_args;
mod test_inventory;
mod token_tests;
mod vbtc;

/// The mnemonic an Anvil node derives its default accounts from
const DEFAULT_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// The CLI arguments for the integration tests
#[derive(Debug, Clone, Parser)]
struct CliArgs {
    /// Directory holding compiled contract artifacts
    #[clap(short, long, default_value = "out")]
    artifacts_dir: PathBuf,
    /// The mnemonic the test accounts are derived from
    #[clap(short, long, default_value = DEFAULT_MNEMONIC)]
    mnemonic: String,
    /// The RPC url to run the tests against
    #[clap(short = 'r', long, env = "RPC_URL", default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    // --- Test Harness Args --- //
    /// Only run tests whose name contains this string
    #[arg(short, long)]
    test: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = TestArgs::new(&cli).await?;

    let mut tests: Vec<&IntegrationTest> = inventory::iter::<IntegrationTest>
        .into_iter()
        .filter(|test| cli.test.as_deref().map_or(true, |name| test.name.contains(name)))
        .collect();
    tests.sort_by_key(|test| test.name);

    if tests.is_empty() {
        return Err(eyre!("no tests match the filter"));
    }

    let mut failures = 0;
    for test in tests.iter() {
        match (test.test_fn)(args.clone()).await {
            Ok(()) => println!("{} ... {}", test.name, "ok".green()),
            Err(e) => {
                failures += 1;
                println!("{} ... {}", test.name, "FAILED".red().bold());
                println!("    {e}");
            }
        }
    }

    let summary = format!("{} passed, {failures} failed", tests.len() - failures);
    if failures > 0 {
        println!("\n{}", summary.red());
        return Err(eyre!("{failures} integration tests failed"));
    }

    println!("\n{}", summary.green());
    Ok(())
}
