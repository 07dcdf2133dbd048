//! HTTP error catcher.
//!
//! Configured as a web server's error-document target, it turns every request
//! it receives into a Riemann event and answers with a fixed body.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                  HTTP ERROR CATCHER                   │
//!                  │                                                       │
//!  Web server      │  ┌─────────┐   ┌─────────┐   ┌──────────────────┐    │
//!  error redirect ─┼─▶│   net   │──▶│  http   │──▶│ catcher handler  │    │
//!                  │  │listener │   │ server  │   │ attributes+event │    │
//!                  │  └─────────┘   └────┬────┘   └────────┬─────────┘    │
//!                  │                     │                 │              │
//!  200 + body   ◀──┼─────────────────────┘                 ▼              │
//!                  │                                ┌──────────────┐      │
//!                  │                                │   riemann    │──────┼──▶ Collector
//!                  │                                │  tcp / udp   │      │
//!                  │                                └──────────────┘      │
//!                  │  config · cli · lifecycle · observability            │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use http_error_catcher::cli::{Cli, USAGE};
use http_error_catcher::config::validate_config;
use http_error_catcher::lifecycle::{self, signals, Shutdown};
use http_error_catcher::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    let settings = match validate_config(&config) {
        Ok(settings) => settings,
        Err(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    logging::init(settings.log_format);
    tracing::info!("http-error-catcher v{} starting", env!("CARGO_PKG_VERSION"));

    let catcher = match lifecycle::start(&settings).await {
        Ok(catcher) => catcher,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();
    let mut server = tokio::spawn(catcher.run(shutdown.subscribe()));

    let result = tokio::select! {
        _ = signals::shutdown_requested() => {
            shutdown.trigger();
            (&mut server).await
        }
        result = &mut server => result,
    };

    match result {
        Ok(Ok(())) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Server stopped with error");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Server task failed");
            ExitCode::FAILURE
        }
    }
}
