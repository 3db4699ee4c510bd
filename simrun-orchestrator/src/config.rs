//! Orchestrator configuration
//!
//! Defines every configurable parameter of the orchestrator: HTTP binding,
//! storage, the workflow executor and ingestion backend endpoints, and the
//! platform settings injected into run containers.

use anyhow::Context;
use simrun_core::domain::solution::SdkVersion;
use std::path::PathBuf;
use std::time::Duration;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API binds to
    pub bind_addr: String,

    /// Postgres URL; runs and documents are kept in memory when absent
    pub database_url: Option<String>,

    /// JSON file of catalog entities imported at startup
    pub catalog_seed: Option<PathBuf>,

    pub executor: ExecutorConfig,

    pub ingestion: IngestionConfig,

    /// Minimum solution SDK version emitting ingestion telemetry
    pub min_ingestion_sdk_version: SdkVersion,

    pub platform: PlatformSettings,
}

/// Workflow executor (Argo Workflows server) settings
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub url: String,
    pub namespace: String,
    /// Node selector label key receiving the pipeline node label
    pub node_selector_key: String,
    pub service_account: Option<String>,
    pub image_pull_secret: Option<String>,
    /// Upper bound of a single workflow status query
    pub timeout: Duration,
}

/// Data ingestion backend settings
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub url: String,
    /// Upper bound of a single ingestion state lookup
    pub timeout: Duration,
    /// Time after workflow completion during which pending ingestion is
    /// awaited; the run is failed once it elapses
    pub observation_window: Duration,
}

/// Platform values injected into every run pipeline
#[derive(Debug, Clone, Default)]
pub struct PlatformSettings {
    /// Registry prefixed to solution and connector images, may be empty
    pub container_registry: String,
    pub fetch_parameters_image: String,
    pub send_data_warehouse_image: String,
    pub identity_tenant_id: String,
    pub identity_client_id: String,
    pub identity_client_secret: String,
    pub api_url: String,
    pub api_scope: String,
    /// Base URI of the analytics event bus, workspace keys are appended
    pub analytics_bus_uri: String,
    pub storage_connection_string: String,
    pub data_warehouse_uri: String,
    pub data_warehouse_ingest_uri: String,
    pub parameters_write_csv: bool,
    pub parameters_write_json: bool,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional, see `Default`):
    /// - SIMRUN_BIND_ADDR, DATABASE_URL, SIMRUN_CATALOG_SEED
    /// - SIMRUN_EXECUTOR_URL, SIMRUN_EXECUTOR_NAMESPACE, SIMRUN_EXECUTOR_NODE_SELECTOR_KEY,
    ///   SIMRUN_EXECUTOR_SERVICE_ACCOUNT, SIMRUN_EXECUTOR_IMAGE_PULL_SECRET,
    ///   SIMRUN_EXECUTOR_TIMEOUT (seconds)
    /// - SIMRUN_INGESTION_URL, SIMRUN_INGESTION_TIMEOUT (seconds),
    ///   SIMRUN_INGESTION_OBSERVATION_WINDOW (seconds)
    /// - SIMRUN_MIN_INGESTION_SDK_VERSION (major.minor)
    /// - SIMRUN_CONTAINER_REGISTRY, SIMRUN_FETCH_PARAMETERS_IMAGE, SIMRUN_SEND_DATA_WAREHOUSE_IMAGE
    /// - SIMRUN_IDENTITY_TENANT_ID, SIMRUN_IDENTITY_CLIENT_ID, SIMRUN_IDENTITY_CLIENT_SECRET
    /// - SIMRUN_API_URL, SIMRUN_API_SCOPE, SIMRUN_ANALYTICS_BUS_URI,
    ///   SIMRUN_STORAGE_CONNECTION_STRING, SIMRUN_DATA_WAREHOUSE_URI,
    ///   SIMRUN_DATA_WAREHOUSE_INGEST_URI, SIMRUN_PARAMETERS_WRITE_CSV, SIMRUN_PARAMETERS_WRITE_JSON
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let min_ingestion_sdk_version = match std::env::var("SIMRUN_MIN_INGESTION_SDK_VERSION") {
            Ok(raw) => SdkVersion::parse(&raw)
                .with_context(|| format!("invalid SIMRUN_MIN_INGESTION_SDK_VERSION '{}'", raw))?,
            Err(_) => defaults.min_ingestion_sdk_version,
        };

        let executor_timeout = env_secs("SIMRUN_EXECUTOR_TIMEOUT", defaults.executor.timeout);
        let ingestion_timeout = env_secs("SIMRUN_INGESTION_TIMEOUT", defaults.ingestion.timeout);
        let observation_window = env_secs(
            "SIMRUN_INGESTION_OBSERVATION_WINDOW",
            defaults.ingestion.observation_window,
        );

        let platform = PlatformSettings {
            container_registry: env_or("SIMRUN_CONTAINER_REGISTRY", ""),
            fetch_parameters_image: env_or(
                "SIMRUN_FETCH_PARAMETERS_IMAGE",
                &defaults.platform.fetch_parameters_image,
            ),
            send_data_warehouse_image: env_or(
                "SIMRUN_SEND_DATA_WAREHOUSE_IMAGE",
                &defaults.platform.send_data_warehouse_image,
            ),
            identity_tenant_id: env_or("SIMRUN_IDENTITY_TENANT_ID", ""),
            identity_client_id: env_or("SIMRUN_IDENTITY_CLIENT_ID", ""),
            identity_client_secret: env_or("SIMRUN_IDENTITY_CLIENT_SECRET", ""),
            api_url: env_or("SIMRUN_API_URL", &defaults.platform.api_url),
            api_scope: env_or("SIMRUN_API_SCOPE", ""),
            analytics_bus_uri: env_or(
                "SIMRUN_ANALYTICS_BUS_URI",
                &defaults.platform.analytics_bus_uri,
            ),
            storage_connection_string: env_or("SIMRUN_STORAGE_CONNECTION_STRING", ""),
            data_warehouse_uri: env_or("SIMRUN_DATA_WAREHOUSE_URI", ""),
            data_warehouse_ingest_uri: env_or("SIMRUN_DATA_WAREHOUSE_INGEST_URI", ""),
            parameters_write_csv: env_flag("SIMRUN_PARAMETERS_WRITE_CSV", true),
            parameters_write_json: env_flag("SIMRUN_PARAMETERS_WRITE_JSON", false),
        };

        Ok(Self {
            bind_addr: env_or("SIMRUN_BIND_ADDR", &defaults.bind_addr),
            database_url: std::env::var("DATABASE_URL").ok(),
            catalog_seed: std::env::var("SIMRUN_CATALOG_SEED").ok().map(PathBuf::from),
            executor: ExecutorConfig {
                url: env_or("SIMRUN_EXECUTOR_URL", &defaults.executor.url),
                namespace: env_or("SIMRUN_EXECUTOR_NAMESPACE", &defaults.executor.namespace),
                node_selector_key: env_or(
                    "SIMRUN_EXECUTOR_NODE_SELECTOR_KEY",
                    &defaults.executor.node_selector_key,
                ),
                service_account: std::env::var("SIMRUN_EXECUTOR_SERVICE_ACCOUNT").ok(),
                image_pull_secret: std::env::var("SIMRUN_EXECUTOR_IMAGE_PULL_SECRET").ok(),
                timeout: executor_timeout,
            },
            ingestion: IngestionConfig {
                url: env_or("SIMRUN_INGESTION_URL", &defaults.ingestion.url),
                timeout: ingestion_timeout,
                observation_window,
            },
            min_ingestion_sdk_version,
            platform,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        for (name, url) in [
            ("executor url", &self.executor.url),
            ("ingestion url", &self.ingestion.url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.executor.namespace.is_empty() {
            anyhow::bail!("executor namespace cannot be empty");
        }

        if self.executor.timeout.is_zero() {
            anyhow::bail!("executor timeout must be greater than 0");
        }

        if self.ingestion.timeout.is_zero() {
            anyhow::bail!("ingestion timeout must be greater than 0");
        }

        if self.ingestion.observation_window.is_zero() {
            anyhow::bail!("ingestion observation window must be greater than 0");
        }

        if self.platform.fetch_parameters_image.is_empty()
            || self.platform.send_data_warehouse_image.is_empty()
        {
            anyhow::bail!("platform images cannot be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: None,
            catalog_seed: None,
            executor: ExecutorConfig {
                url: "http://localhost:2746".to_string(),
                namespace: "simrun".to_string(),
                node_selector_key: "agentpool".to_string(),
                service_account: None,
                image_pull_secret: None,
                timeout: Duration::from_secs(30),
            },
            ingestion: IngestionConfig {
                url: "http://localhost:8090".to_string(),
                timeout: Duration::from_secs(10),
                observation_window: Duration::from_secs(6 * 60 * 60),
            },
            min_ingestion_sdk_version: SdkVersion::new(8, 5),
            platform: PlatformSettings {
                fetch_parameters_image: "simrun/fetch-scenario-parameters:latest".to_string(),
                send_data_warehouse_image: "simrun/send-data-warehouse:latest".to_string(),
                api_url: "http://localhost:8080".to_string(),
                analytics_bus_uri: "amqps://localhost".to_string(),
                parameters_write_csv: true,
                ..Default::default()
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<bool>().ok())
        .unwrap_or(default)
}
