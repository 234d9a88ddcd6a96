//! Zerocoin engine CLI binary

use anyhow::Context;
use clap::Parser;
use zerocoin_engine::cli::{
    describe_denominations, inspect_snapshot, load_config, Cli, Commands, SimulationApp,
    SimulationParams,
};
use zerocoin_engine::SpendType;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            mint,
            spend,
            spend_type,
            decoys,
            selector,
            output,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let spend_type: SpendType = spend_type.parse().context("invalid --spend-type")?;
            let params = SimulationParams {
                mint,
                spend,
                spend_type,
                decoys,
                selector,
                output,
            };

            let mut app = SimulationApp::new(config, params.selector)?;
            let report = app.run(&params).await?;

            println!("minted coins:     {}", report.minted);
            println!("chain tip:        {}", report.tip);
            println!("coins spent:      {}", report.spent_coins);
            println!("change to remint: {}", report.change);
            println!("balance after:    {}", report.balance_after);
            println!("replay rejected:  {}", report.replay_rejection);
        }

        Commands::Denominations { amount } => {
            let lines = describe_denominations(amount);
            if lines.is_empty() {
                println!("{} cannot be minted", amount);
            }
            for line in lines {
                println!("{}", line);
            }
        }

        Commands::Inspect { path } => {
            for line in inspect_snapshot(&path).await? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
