use clap::Parser;
use otp_relay::cli::{self, Cli, Command};
use otp_relay::hook::TelephonyHook;
use otp_relay::{config, logging, server};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Version) = cli.command {
        cli::handle_version();
        return Ok(());
    }

    // The relay websocket and the lookup client both run over rustls.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::CheckConfig => {
            if !cli::handle_check_config(&cfg)? {
                std::process::exit(1);
            }
        }
        Command::Version => cli::handle_version(),
        Command::Serve => {
            logging::init_logging(&cfg.logging)?;

            if let Err(problems) = cfg.validate() {
                for problem in &problems {
                    tracing::warn!(problem = %problem, "configuration incomplete");
                }
            }

            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                provider = %cfg.provider.name,
                "starting otp-relay"
            );
            let hook = Arc::new(TelephonyHook::from_config(&cfg));
            server::serve(&cfg.server, hook, server::shutdown_signal()).await?;
        }
    }

    Ok(())
}
