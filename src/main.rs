use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eddy::app::AppContext;
use eddy::cli::{commands, Cli, Commands};
use eddy::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let ctx = AppContext::new(config, cli.session())?;
    ctx.start_session();

    let result = match cli.command {
        Commands::Feed { page_size, more } => commands::show_feed(&ctx, page_size, more).await,
        Commands::Like { kind, id } => commands::like(&ctx, kind, &id).await,
        Commands::Bookmark { kind, id } => commands::bookmark(&ctx, kind, &id).await,
        Commands::View { kind, id } => commands::view(&ctx, kind, &id).await,
        Commands::Stories { start } => commands::play_stories(&ctx, start).await,
    };

    // Let queued story views reach the backend before exiting
    ctx.shutdown().await;
    result?;

    Ok(())
}
