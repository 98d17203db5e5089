use anyhow::Context as _;
use clap::Parser as _;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = regrid_cli::Cli::parse();
    let config = regrid_cli::RegridConfig::from_env()?;
    let output = regrid_cli::run(cli, config)?;
    let text = serde_json::to_string_pretty(&output).context("failed to encode output")?;
    println!("{text}");
    Ok(())
}
