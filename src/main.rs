use clap::Parser;
use setupsync::commands;
use setupsync::config::Cli;
use setupsync::watcher::Shutdown;
use setupsync::Config;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Convert CLI args to Config - this validates immediately
    let config = Config::try_from(cli)?;
    init_tracing(config.verbose);

    tracing::debug!(version = setupsync::VERSION, root = %config.root.display(), "Starting");

    if config.runs_init() {
        commands::init::run(&config)?;
    }

    if config.runs_watch() {
        let shutdown = Shutdown::new();
        shutdown.install_ctrl_c_handler()?;
        commands::watch::run(&config, &shutdown)?;
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
