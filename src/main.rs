use clap::Parser;
use roomfinder::app::App;
use roomfinder::cli::Args;
use roomfinder::config::Config;
use roomfinder::logging::setup_logging;
use std::process::ExitCode;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logging needs the config, so a bad config can only be reported on stderr.
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        workers = config.workers,
        delay = roomfinder::utils::fmt_duration(config.request_delay),
        "starting roomfinder"
    );

    App::new(config).run(args.command).await
}
