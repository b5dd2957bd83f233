#![deny(warnings)]
#![deny(clippy::unwrap_used)]

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};

use tinytunnel::tunnel::auth::Authenticator;
use tinytunnel::tunnel::config::resolve_config_path;
use tinytunnel::tunnel::source::{app_dir, load_profiles};
use tinytunnel::tunnel::supervisor::{BANNER, emit, supervise};
use tinytunnel::tunnel::{
    RusshTransport, SessionRegistry, ShutdownCoordinator, TunnelError, TunnelOrchestrator,
    TunnelSettings,
};

#[derive(Parser)]
#[command(version, about = "Opens an SSH session and local port forward for every enabled profile", long_about = None)]
struct Cli {
    /// Profile file, defaults to connections.toml next to the executable
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds allowed for connecting and authenticating one profile
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    connect_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    // Logs go to stderr so stdout only carries the console lines
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            emit(&mut io::stderr(), &e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), TunnelError> {
    let mut out = io::stdout();
    emit(&mut out, BANNER);

    let shutdown = ShutdownCoordinator::install();

    let app_dir = app_dir()?;
    let settings = TunnelSettings::resolve(cli.connect_timeout);
    let config_path = resolve_config_path(cli.config, &app_dir);
    info!("Loading profiles from {}", config_path.display());

    let profile_set = load_profiles(&config_path)?;

    let registry = SessionRegistry::new(settings.disconnect_timeout);
    let mut orchestrator = TunnelOrchestrator::new(
        RusshTransport::new(settings),
        Authenticator::new(app_dir),
        registry,
    );

    supervise(&mut orchestrator, profile_set.entries, &shutdown, &mut out).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_connect_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["tinytunnel", "--connect-timeout", "0"]).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "tinytunnel",
            "-c",
            "/etc/tinytunnel.toml",
            "--connect-timeout",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/tinytunnel.toml")));
        assert_eq!(cli.connect_timeout, Some(10));
    }
}
