//! Demo host for the lifespan manager.
//!
//! ```text
//! lifespan-manager [--config app.toml] [--bind 127.0.0.1:8080]
//!
//!   startup:   settings (blocking) → clock (async) → listener
//!   GET /state lists the merged state
//!   shutdown:  listener drained → clock → settings
//! ```

use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use tokio::net::TcpListener;

use lifespan_manager::config::{load_config, AppConfig};
use lifespan_manager::http::{state_routes, HttpServer};
use lifespan_manager::lifecycle::{signals, Shutdown};
use lifespan_manager::observability::{logging, metrics};
use lifespan_manager::{BoxError, Lifespan, LifespanManager, State};

#[derive(Parser)]
#[command(name = "lifespan-manager")]
#[command(about = "Serve an app whose startup/shutdown is composed from several lifespans", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

/// Application handle passed to every lifespan.
#[derive(Clone)]
struct DemoApp {
    name: String,
}

/// Blocking lifespan: reads settings from the environment.
fn settings(app: DemoApp) -> impl Iterator<Item = Result<Option<State>, BoxError>> {
    let mut step = 0;
    std::iter::from_fn(move || {
        step += 1;
        match step {
            1 => {
                let greeting = std::env::var("DEMO_GREETING")
                    .unwrap_or_else(|_| format!("hello from {}", app.name));
                tracing::info!(greeting = %greeting, "Settings loaded");
                Some(Ok(Some(State::new().with("greeting", greeting))))
            }
            _ => {
                tracing::info!("Settings released");
                None
            }
        }
    })
}

/// Async lifespan: records when the app started and reports uptime on stop.
fn clock(
    _app: DemoApp,
    state: State,
) -> impl futures_util::Stream<Item = Result<Option<State>, BoxError>> {
    async_stream::try_stream! {
        let started = Instant::now();
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        tracing::info!(
            greeting = ?state.get::<String>("greeting"),
            started_at = since_epoch,
            "Clock started"
        );

        yield Some(State::new().with("started_at", since_epoch.to_string()));

        tracing::info!(uptime_secs = started.elapsed().as_secs(), "Clock stopped");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        startup_timeout_secs = ?config.lifespan.startup_timeout_secs,
        shutdown_timeout_secs = ?config.lifespan.shutdown_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut lifespans = LifespanManager::<DemoApp>::new().with_config(config.lifespan.clone());
    lifespans.add(Lifespan::named("settings", settings));
    lifespans.add(Lifespan::named("clock", clock));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    signals::forward_signals(&shutdown);

    let app = DemoApp {
        name: "lifespan-demo".to_string(),
    };
    HttpServer::new(lifespans, app)
        .run(listener, state_routes, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
