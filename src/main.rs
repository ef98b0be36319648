// src/main.rs

use clap::Parser;
use color_eyre::eyre::Result;

mod app;
mod commands;
mod core;
mod logging;
mod report;

use app::App;
use commands::Commands;

#[derive(Parser)]
#[command(name = "vanguard-headers")]
#[command(about = "HTTP security headers scanner: grades the headers a site sends")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // A missing log file is not worth refusing to scan over.
    if let Err(e) = logging::initialize_logging() {
        eprintln!("warning: file logging disabled: {e}");
    }

    App::new(!cli.no_color).run(cli.command).await
}
