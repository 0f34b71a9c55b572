mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fnforge",
    about = "Build container images for every function in a stack manifest"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build function images from a stack manifest, or a single function from flags
    #[command(after_help = commands::BUILD_EXAMPLES)]
    Build(commands::BuildArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => commands::build(args).await?,
    }

    Ok(())
}
