//! UGC Analytics ETL
//!
//! Streams analytics events from Redpanda into ClickHouse:
//! - Extract raw messages from one topic partition
//! - Decode each payload into an analytics event
//! - Batch events into ClickHouse by size or elapsed time
//! - Commit offsets only for events that were stored

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use api::StatusConfig;
use clickhouse_client::{ClickHouseClient, ClickHouseConfig, ClickHouseSink};
use pipeline::{Pipeline, PipelineConfig, Termination};
use redpanda::{RedpandaConfig, RedpandaSource};
use telemetry::{health, init_tracing_from_env, metrics, PipelineState};

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    redpanda: RedpandaConfig,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    pipeline: PipelineConfig,

    #[serde(default)]
    status: StatusConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23+ requires explicit crypto provider selection before any TLS use
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting UGC analytics ETL v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config()?;

    info!(
        brokers = ?config.redpanda.brokers,
        topic = %config.redpanda.topic,
        sasl_username = config.redpanda.sasl_username.as_deref().unwrap_or("none"),
        "Loaded Redpanda config"
    );

    let clickhouse = ClickHouseClient::new(config.clickhouse.clone());

    if let Err(e) = clickhouse_client::health::init_schema(&clickhouse).await {
        error!("Failed to initialize ClickHouse schema: {}", e);
    }

    check_health(&config.redpanda, &clickhouse).await;

    let source = Arc::new(
        RedpandaSource::new(config.redpanda.clone()).context("Failed to open offset store")?,
    );
    let sink = ClickHouseSink::new(clickhouse);
    config.pipeline.target = sink.default_target().to_string();

    let pipeline = Pipeline::new(source.clone(), sink, config.pipeline.clone())
        .context("Invalid pipeline configuration")?;

    let cancel = CancellationToken::new();

    let status_server = if config.status.enabled {
        let status = config.status.clone();
        let cancel = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = api::serve(&status, cancel).await {
                error!("Status server error: {}", e);
            }
        }))
    } else {
        info!("Status server disabled");
        None
    };

    let signal_watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutting down...");
            cancel.cancel();
        })
    };

    let report = pipeline.run(cancel.clone()).await;

    // Stop the status server even when the pipeline ended on its own
    cancel.cancel();
    signal_watcher.abort();
    if let Some(handle) = status_server {
        let _ = handle.await;
    }

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            health().set_pipeline_state(PipelineState::Failed);
            return Err(e).context("Pipeline aborted");
        }
    };

    info!(
        report = %serde_json::to_string(&report).unwrap_or_default(),
        committed_offset = ?source.committed_offset(),
        "Pipeline report"
    );
    info!(
        metrics = %serde_json::to_string(&metrics().snapshot()).unwrap_or_default(),
        "Final metrics"
    );

    if let Termination::SourceFailed(cause) = report.termination {
        return Err(anyhow!("Pipeline stopped because the source failed: {}", cause));
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("ETL")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(brokers) = std::env::var("ETL_REDPANDA_BROKERS") {
        config.redpanda.brokers = brokers.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Ok(username) = std::env::var("ETL_REDPANDA_SASL_USERNAME") {
        config.redpanda.sasl_username = Some(username);
    }
    if let Ok(password) = std::env::var("ETL_REDPANDA_SASL_PASSWORD") {
        config.redpanda.sasl_password = Some(password);
    }
    if let Ok(topic) = std::env::var("ETL_REDPANDA_TOPIC") {
        config.redpanda.topic = topic;
    }
    if let Ok(group_id) = std::env::var("ETL_REDPANDA_GROUP_ID") {
        config.redpanda.group_id = group_id;
    }
    if let Ok(path) = std::env::var("ETL_REDPANDA_OFFSET_STORE_PATH") {
        config.redpanda.offset_store_path = path;
    }

    if let Ok(url) = std::env::var("ETL_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("ETL_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("ETL_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("ETL_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }

    if let Ok(batch_size) = std::env::var("ETL_PIPELINE_BATCH_SIZE") {
        config.pipeline.batch_size = batch_size
            .parse()
            .context("ETL_PIPELINE_BATCH_SIZE must be a positive integer")?;
    }
    if let Ok(interval) = std::env::var("ETL_PIPELINE_FLUSH_INTERVAL_MS") {
        config.pipeline.flush_interval_ms = interval
            .parse()
            .context("ETL_PIPELINE_FLUSH_INTERVAL_MS must be a positive integer")?;
    }

    Ok(config)
}

/// Check component health on startup.
async fn check_health(redpanda_config: &RedpandaConfig, clickhouse: &ClickHouseClient) {
    let redpanda_healthy = redpanda::health::check_connection(redpanda_config).await;
    if redpanda_healthy {
        health().redpanda.set_healthy();
        info!("Redpanda connection: healthy");
    } else {
        health().redpanda.set_unhealthy("Connection failed");
        error!("Redpanda connection: unhealthy");
    }

    let ch_healthy = clickhouse_client::health::check_connection(clickhouse).await;
    if ch_healthy {
        health().clickhouse.set_healthy();
        info!("ClickHouse connection: healthy");
    } else {
        health().clickhouse.set_unhealthy("Connection failed");
        error!("ClickHouse connection: unhealthy");
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
