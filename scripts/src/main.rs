use clap::Parser;
use scripts::{cli::Cli, utils::setup_client};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let Cli {
        priv_key,
        rpc_url,
        deployments_path,
        artifacts_dir,
        command,
    } = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().pretty().with_env_filter(filter).init();

    let client = setup_client(&priv_key, &rpc_url)?;

    command
        .run(client, &artifacts_dir, &deployments_path)
        .await?;

    Ok(())
}
