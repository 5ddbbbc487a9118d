use clap::Parser;
mod commands;
mod logging;
mod render;
use commands::{cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    let cfg = run::load_config(&args)?;
    let guard = logging::init(&cfg.logging, args.log_dir.as_deref())?;

    let exit = run::run(&args, &cfg).await?;

    // process::exit skips destructors; flush the log writer first.
    drop(guard);
    std::process::exit(exit);
}
