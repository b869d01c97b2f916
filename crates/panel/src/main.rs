//! `overlay-panel` -- command-line control panel for the livestream
//! overlay backend.
//!
//! Signs in, manages overlays and configures the stream source. The
//! session is persisted between invocations.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default                                        | Description                      |
//! |------------------------|----------|------------------------------------------------|----------------------------------|
//! | `API_BASE_URL`         | no       | `http://localhost:5000/api`                    | Backend API base                 |
//! | `REQUEST_TIMEOUT_SECS` | no       | `30`                                           | Per-request timeout              |
//! | `SESSION_FILE`         | no       | `<config dir>/livestream-overlay/session.json` | Persisted token and user         |
//! | `OVERLAY_PASSWORD`     | no       | --                                             | Password for `login`/`register`  |
//! | `RUST_LOG`             | no       | `overlay_panel=warn,overlay_client=warn`       | Log filter                       |

use std::process::ExitCode;

use clap::Parser;
use overlay_client::ClientConfig;
use overlay_panel::app::App;
use overlay_panel::cli::Cli;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "overlay_panel=warn,overlay_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    tracing::debug!(api_base = %config.api_base_url, session_file = %config.session_file.display(), "Configuration loaded");

    let mut app = match App::new(&config, cli.yes) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if app.run(cli.command).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
