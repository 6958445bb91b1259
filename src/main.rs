//! Dotaboard
//!
//! Dota 2 dashboard backend: cache service, match pipeline, REST API.
//!
//! ```text
//!   Args/env ──► CacheService::from_config ──► AppState ──► ApiServer (REST)
//!                        │                         │
//!                        └──────► metrics server ◄─┘  (/metrics, /healthz)
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dotaboard::cache::{FileBackendConfig, MemoryBackendConfig, RemoteStoreConfig};
use dotaboard::matches::reference::{heroes_from_json, items_from_json};
use dotaboard::{
    ApiServer, ApiServerConfig, AppState, CacheService, CacheServiceConfig, Error, MatchStore,
    ReferenceData, Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Dotaboard - Dota 2 dashboard cache and match-processing backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// REST API bind address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8080")]
    api_addr: String,

    /// Metrics and health server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:9090")]
    metrics_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Prefer the remote key-value store
    #[arg(long, env = "USE_REMOTE_CACHE")]
    use_remote_cache: bool,

    /// Remote store command endpoint
    #[arg(long, env = "REMOTE_CACHE_URL")]
    remote_cache_url: Option<String>,

    /// Remote store bearer token
    #[arg(long, env = "REMOTE_CACHE_TOKEN", hide_env_values = true)]
    remote_cache_token: Option<String>,

    /// Prefix for every remote key
    #[arg(long, env = "REMOTE_CACHE_PREFIX", default_value = "")]
    remote_cache_prefix: String,

    /// Fall back to memory when the remote store is unusable
    #[arg(
        long,
        env = "CACHE_FALLBACK_TO_MEMORY",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    cache_fallback_to_memory: bool,

    /// Use the file backend
    #[arg(long, env = "USE_FILE_CACHE")]
    use_file_cache: bool,

    /// File backend directory
    #[arg(long, env = "CACHE_DIR", default_value = ".cache/dotaboard")]
    cache_dir: PathBuf,

    /// Memory backend budget in MiB (unbounded when unset)
    #[arg(long, env = "CACHE_MAX_MEMORY_MB")]
    cache_max_memory_mb: Option<u64>,

    /// Expiry sweep interval in seconds (0 disables)
    #[arg(long, env = "CACHE_SWEEP_INTERVAL", default_value = "300")]
    cache_sweep_interval_secs: u64,

    /// TTL applied when a write omits one
    #[arg(long, env = "CACHE_DEFAULT_TTL", default_value = "86400")]
    cache_default_ttl_secs: u64,

    /// TTL for cached raw match payloads
    #[arg(long, env = "RAW_MATCH_TTL")]
    raw_match_ttl_secs: Option<u64>,

    /// Hero reference JSON (list or id-keyed map)
    #[arg(long, env = "HEROES_PATH")]
    heroes_path: Option<PathBuf>,

    /// Item reference JSON (list or id-keyed map)
    #[arg(long, env = "ITEMS_PATH")]
    items_path: Option<PathBuf>,
}

impl Args {
    fn cache_config(&self) -> CacheServiceConfig {
        let sweep_interval = (self.cache_sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.cache_sweep_interval_secs));

        CacheServiceConfig {
            use_remote: self.use_remote_cache,
            fallback_to_memory: self.cache_fallback_to_memory,
            remote: RemoteStoreConfig {
                url: self.remote_cache_url.clone(),
                token: self.remote_cache_token.clone(),
                key_prefix: self.remote_cache_prefix.clone(),
                default_ttl_seconds: Some(self.cache_default_ttl_secs),
            },
            use_file: self.use_file_cache,
            file: FileBackendConfig {
                cache_dir: self.cache_dir.clone(),
                ..Default::default()
            },
            memory: MemoryBackendConfig {
                max_memory_bytes: self.cache_max_memory_mb.map(|mb| mb.saturating_mul(1024 * 1024)),
                default_ttl_seconds: self.cache_default_ttl_secs,
                sweep_interval,
                ..Default::default()
            },
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting Dotaboard");
    info!("  Version: {}", dotaboard::VERSION);
    info!("  REST API: {}", args.api_addr);
    info!("  Metrics: {}", args.metrics_addr);

    let reference = load_reference(&args).await?;
    info!(
        heroes = reference.heroes.len(),
        items = reference.items.len(),
        "Reference data loaded"
    );

    let cache = Arc::new(CacheService::from_config(args.cache_config()).await?);
    info!("Cache backend: {}", cache.kind());

    let matches = Arc::new(MatchStore::new());
    let mut state = AppState::new(cache.clone(), matches.clone(), Arc::new(reference));
    if let Some(ttl) = args.raw_match_ttl_secs {
        state = state.with_raw_ttl(ttl);
    }

    // Start metrics server
    let metrics_addr: SocketAddr = args
        .metrics_addr
        .parse()
        .map_err(|e| Error::Configuration(format!("Invalid metrics address: {}", e)))?;
    let metrics_shutdown = CancellationToken::new();
    let metrics_handle = {
        let state = state.clone();
        let shutdown = metrics_shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = run_metrics_server(metrics_addr, state, shutdown).await {
                error!("Metrics server error: {}", e);
            }
        })
    };

    let api_config = ApiServerConfig {
        rest_addr: args
            .api_addr
            .parse()
            .map_err(|e| Error::Configuration(format!("Invalid REST API address: {}", e)))?,
        ..Default::default()
    };

    let api_server = Arc::new(ApiServer::new(api_config, state));

    {
        let api_server = api_server.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            info!("Shutdown signal received");
            api_server.shutdown();
        });
    }

    let result = api_server.run().await;

    metrics_shutdown.cancel();
    let _ = metrics_handle.await;
    drop(api_server);

    match Arc::try_unwrap(cache) {
        Ok(mut cache) => cache.shutdown().await,
        Err(_) => debug!("Cache still shared at exit; sweeper stops on drop"),
    }

    info!("Dotaboard shutdown complete");
    result
}

async fn load_reference(args: &Args) -> Result<ReferenceData> {
    let heroes = match &args.heroes_path {
        Some(path) => heroes_from_json(&tokio::fs::read_to_string(path).await?)?,
        None => {
            warn!("No hero reference file; heroes render as placeholders");
            Default::default()
        }
    };

    let items = match &args.items_path {
        Some(path) => items_from_json(&tokio::fs::read_to_string(path).await?)?,
        None => {
            warn!("No item reference file; items render as placeholders");
            Default::default()
        }
    };

    Ok(ReferenceData::new(heroes, items))
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "tower=warn", "axum=info", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Metrics Server
// =============================================================================

/// Cache and store gauges, refreshed on every scrape
struct ServiceGauges {
    registry: prometheus::Registry,
    keys: prometheus::IntGauge,
    memory_usage_bytes: prometheus::IntGauge,
    hits: prometheus::IntGauge,
    misses: prometheus::IntGauge,
    sets: prometheus::IntGauge,
    deletes: prometheus::IntGauge,
    evictions: prometheus::IntGauge,
    expirations: prometheus::IntGauge,
    hit_rate: prometheus::Gauge,
    healthy: prometheus::IntGauge,
    matches_stored: prometheus::IntGauge,
}

impl ServiceGauges {
    fn new() -> prometheus::Result<Self> {
        use prometheus::{Gauge, IntGauge};

        let registry = prometheus::Registry::new();
        let int_gauge = |name: &str, help: &str| -> prometheus::Result<IntGauge> {
            let gauge = IntGauge::new(name, help)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        let keys = int_gauge("dotaboard_cache_keys", "Live cache entries")?;
        let memory_usage_bytes = int_gauge(
            "dotaboard_cache_memory_usage_bytes",
            "Estimated cache memory usage",
        )?;
        let hits = int_gauge("dotaboard_cache_hits", "Cache hits since start")?;
        let misses = int_gauge("dotaboard_cache_misses", "Cache misses since start")?;
        let sets = int_gauge("dotaboard_cache_sets", "Cache writes since start")?;
        let deletes = int_gauge("dotaboard_cache_deletes", "Keys deleted since start")?;
        let evictions = int_gauge("dotaboard_cache_evictions", "Entries evicted for space")?;
        let expirations = int_gauge("dotaboard_cache_expirations", "Entries removed on expiry")?;
        let healthy = int_gauge("dotaboard_cache_healthy", "1 when the cache backend is healthy")?;
        let matches_stored = int_gauge("dotaboard_matches_stored", "Processed matches in memory")?;

        let hit_rate = Gauge::new("dotaboard_cache_hit_rate", "Hits over lookups")?;
        registry.register(Box::new(hit_rate.clone()))?;

        Ok(Self {
            registry,
            keys,
            memory_usage_bytes,
            hits,
            misses,
            sets,
            deletes,
            evictions,
            expirations,
            hit_rate,
            healthy,
            matches_stored,
        })
    }

    async fn refresh(&self, state: &AppState) {
        match state.cache.stats().await {
            Ok(stats) => {
                self.keys.set(stats.key_count as i64);
                self.memory_usage_bytes.set(stats.memory_usage_bytes as i64);
                self.hits.set(stats.hits as i64);
                self.misses.set(stats.misses as i64);
                self.sets.set(stats.sets as i64);
                self.deletes.set(stats.deletes as i64);
                self.evictions.set(stats.evictions as i64);
                self.expirations.set(stats.expirations as i64);
                self.hit_rate.set(stats.hit_rate);
            }
            Err(e) => warn!(error = %e, "Cache stats unavailable for scrape"),
        }
        self.healthy.set(i64::from(state.cache.is_healthy().await));
        self.matches_stored.set(state.matches.len() as i64);
    }

    fn encode(&self) -> prometheus::Result<(Vec<u8>, String)> {
        use prometheus::{Encoder, TextEncoder};

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((buffer, encoder.format_type().to_string()))
    }
}

async fn run_metrics_server(
    addr: SocketAddr,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{header, Body, Request, Response, Server, StatusCode};
    use std::convert::Infallible;

    let gauges = Arc::new(
        ServiceGauges::new()
            .map_err(|e| Error::Internal(format!("Failed to register metrics: {}", e)))?,
    );

    let make_svc = make_service_fn(move |_conn| {
        let gauges = gauges.clone();
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let gauges = gauges.clone();
                let state = state.clone();
                async move {
                    let mut response = Response::new(Body::empty());
                    match req.uri().path() {
                        "/metrics" => {
                            gauges.refresh(&state).await;
                            match gauges.encode() {
                                Ok((buffer, content_type)) => {
                                    if let Ok(value) = header::HeaderValue::from_str(&content_type) {
                                        response.headers_mut().insert(header::CONTENT_TYPE, value);
                                    }
                                    *response.body_mut() = Body::from(buffer);
                                }
                                Err(e) => {
                                    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                                    *response.body_mut() = Body::from(e.to_string());
                                }
                            }
                        }
                        "/healthz" => {
                            if state.cache.is_healthy().await {
                                *response.body_mut() = Body::from("ok");
                            } else {
                                *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
                                *response.body_mut() = Body::from("cache backend unhealthy");
                            }
                        }
                        _ => {
                            *response.status_mut() = StatusCode::NOT_FOUND;
                            *response.body_mut() = Body::from("not found");
                        }
                    }
                    Ok::<_, Infallible>(response)
                }
            }))
        }
    });

    info!("Metrics server listening on {}", addr);
    Server::try_bind(&addr)
        .map_err(|e| Error::Internal(format!("Failed to bind metrics server: {}", e)))?
        .serve(make_svc)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
