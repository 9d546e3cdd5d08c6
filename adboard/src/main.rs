mod config;

use accounts::AccountStore;
use accounts::oauth::OAuthClient;
use clap::{Parser, Subcommand};
use config::Config;
use metrika::client::MetrikaClient;
use metrika::store::TrafficStore;
use reports::cache::ReportCache;
use reports::client::ReportClient;
use reports::negative::NegativeCache;
use reports::refresh::RefreshQueue;
use reports::service::ReportService;
use reports::store::RedisReportStore;
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "adboard", about = "Advertising/analytics reporting gateway")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "adboard.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway.
    Serve,
    /// Periodically rebuild the report cache for every authorized account.
    RefreshWorker,
}

#[derive(thiserror::Error, Debug)]
enum RunError {
    #[error("invalid configuration: {0}")]
    Validation(#[from] reports::config::ValidationError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("cache store error: {0}")]
    Store(#[from] reports::store::StoreError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("could not load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Keep the guard alive for the lifetime of the process.
    let _sentry_guard = config.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions::default(),
        ))
    });

    if let Some(metrics) = &config.metrics {
        if let Err(err) = shared::statsd::install(&metrics.statsd_host, metrics.statsd_port, &metrics.prefix)
        {
            tracing::warn!("metrics disabled: {err}");
        }
    }

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> Result<(), RunError> {
    config.reports.validate()?;

    // One transport client for every outbound request in the process.
    let http = reqwest::Client::new();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    sqlx::migrate!().run(&pool).await?;

    let store = RedisReportStore::connect(&config.reports.cache.url).await?;
    let cache = ReportCache::new(Arc::new(store));
    let report_client = Arc::new(ReportClient::new(http.clone(), &config.reports.direct));
    let account_store = AccountStore::new(pool.clone());

    match command {
        Command::Serve => {
            let (queue, refresh_rx) = RefreshQueue::new();
            let service = ReportService::new(report_client.clone(), cache, queue);
            tokio::spawn(reports::refresh::run_refresh_worker(
                refresh_rx,
                service.clone(),
            ));

            let mut app = reports::api::router(reports::api::ApiState {
                service,
                client: report_client,
                accounts: account_store.clone(),
                negative: Arc::new(NegativeCache::new()),
            })
            .merge(accounts::api::router(accounts::api::ApiState {
                oauth: OAuthClient::new(http.clone(), config.oauth.clone()),
                store: account_store,
            }));

            if let Some(metrika_config) = config.metrika.clone() {
                app = app.merge(metrika::api::router(metrika::api::ApiState {
                    client: MetrikaClient::new(http, metrika_config),
                    store: TrafficStore::new(pool),
                }));
            }

            let addr = format!("{}:{}", config.listener.host, config.listener.port);
            let listener = TcpListener::bind(&addr).await?;
            tracing::info!("gateway listening on {addr}");
            axum::serve(listener, app).await?;
        }
        Command::RefreshWorker => {
            // The per-hit refresh queue lives in the serving process; this
            // one only runs the periodic sweep.
            let (queue, _refresh_rx) = RefreshQueue::new();
            let service = ReportService::new(report_client, cache, queue);
            let interval = Duration::from_secs(config.reports.refresh.interval_hours * 60 * 60);
            reports::refresh::run_scheduled_refresh(service, account_store, interval).await;
        }
    }

    Ok(())
}
