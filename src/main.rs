//! header-session binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use header_session::api::{serve, AppState};
use header_session::cli::{self, Args};
use header_session::config::Config;
use header_session::{logging, ConnectionEvent, MemoryBackend, SessionManager};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Run with --help for usage.");
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(Some(config.log_filter()));
    info!("header-session v{}", env!("CARGO_PKG_VERSION"));

    match run(&args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "header-session stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, config: Config) -> header_session::Result<()> {
    let server_config = config.to_server_config()?;

    let sessions = if args.memory {
        warn!("using in-process session store; sessions are lost on exit");
        SessionManager::with_backend(config.session, Arc::new(MemoryBackend::new()))?
    } else {
        SessionManager::connect(config.session).await?
    };
    info!(
        header = %sessions.sid_header(),
        ttl_secs = sessions.config().ttl_secs,
        persist = sessions.config().persist,
        "session store ready"
    );

    let mut events = sessions.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ConnectionEvent::Connected) => info!("session store reconnected"),
                Ok(ConnectionEvent::Error(e)) => warn!(error = %e, "session store error"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "session store events dropped"),
                Ok(ConnectionEvent::Disconnected) | Err(RecvError::Closed) => break,
            }
        }
    });

    serve(server_config, AppState::new(Arc::new(sessions))).await
}
