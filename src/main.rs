use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod domain;
mod services;
#[cfg(test)]
mod testing;

use cli::{Cli, Commands};
use commands::{
    handle_diagnostics_commands, handle_findings_commands, handle_scan, handle_validate, run_shell,
    AppContext,
};
use services::boundary::install_panic_capture;
use services::config::{Overrides, Settings};
use services::output::{classify, print_error, Reported};

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = std::env::var("NUVAI_LOG_JSON").map(|v| v == "1").unwrap_or(false);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
        }))
        .try_init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let timeout_ms = match &cli.command {
        Commands::Scan(args) => args.timeout_ms,
        _ => None,
    };
    let settings = Settings::load(&Overrides {
        base_url: cli.base_url.clone(),
        timeout_ms,
    })?;
    tracing::debug!(
        base_url = %settings.base_url,
        timeout_ms = settings.timeout_ms,
        mode = ?settings.mode,
        "settings resolved"
    );
    let ctx = AppContext {
        json: cli.json,
        settings,
    };

    match &cli.command {
        Commands::Scan(args) => handle_scan(&ctx, args),
        Commands::Validate { file, content_type } => {
            handle_validate(&ctx, file.as_ref(), content_type.as_deref())
        }
        Commands::Findings { command } => handle_findings_commands(&ctx, command),
        Commands::Diagnostics { command } => handle_diagnostics_commands(&ctx, command),
        Commands::Shell => run_shell(&ctx),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    install_panic_capture();

    if let Err(err) = run(&cli) {
        if err.downcast_ref::<Reported>().is_none() {
            print_error(cli.json, &classify(&err));
        }
        std::process::exit(1);
    }
}
