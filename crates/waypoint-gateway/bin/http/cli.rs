use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use waypoint_core::ShortKey;
use waypoint_telemetry::LogFormat;

pub const LISTEN_ADDR_ENV: &str = "WAYPOINT_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "WAYPOINT_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "WAYPOINT_MYSQL_DSN";
pub const CACHE_BACKEND_ENV: &str = "WAYPOINT_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "WAYPOINT_REDIS_URL";
pub const ACCESS_SINK_ENV: &str = "WAYPOINT_ACCESS_SINK";
pub const L1_CAPACITY_ENV: &str = "MEMORY_CACHE_CAPACITY";
pub const TRACKER_MAX_KEYS_ENV: &str = "WAYPOINT_TRACKER_MAX_KEYS";
pub const TRACKER_RETAIN_ENV: &str = "WAYPOINT_TRACKER_RETAIN";
pub const L2_TIMEOUT_MS_ENV: &str = "WAYPOINT_L2_TIMEOUT_MS";
pub const STORE_TIMEOUT_MS_ENV: &str = "WAYPOINT_STORE_TIMEOUT_MS";
pub const ACCESS_QUEUE_CAPACITY_ENV: &str = "WAYPOINT_ACCESS_QUEUE_CAPACITY";
pub const SINK_TIMEOUT_MS_ENV: &str = "WAYPOINT_SINK_TIMEOUT_MS";
pub const DRAIN_TIMEOUT_MS_ENV: &str = "WAYPOINT_DRAIN_TIMEOUT_MS";
pub const NEGATIVE_TTL_SECS_ENV: &str = "WAYPOINT_NEGATIVE_TTL_SECS";
pub const LOG_FORMAT_ENV: &str = "WAYPOINT_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "WAYPOINT_OTLP_ENDPOINT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "redis")]
    Redis,
    #[value(name = "moka")]
    Moka,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::Redis => write!(f, "redis"),
            CacheBackendArg::Moka => write!(f, "moka"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AccessSinkArg {
    #[value(name = "log")]
    Log,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for AccessSinkArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessSinkArg::Log => write!(f, "log"),
            AccessSinkArg::Mysql => write!(f, "mysql"),
        }
    }
}

/// A `key=url` pair loaded into the store at startup.
#[derive(Debug, Clone)]
pub struct LinkSeed {
    pub short_key: ShortKey,
    pub destination_url: String,
}

fn parse_link_seed(raw: &str) -> Result<LinkSeed, String> {
    let (key, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=url, got '{raw}'"))?;
    let short_key = ShortKey::new(key.trim()).map_err(|e| e.to_string())?;
    let destination_url = url.trim();
    if destination_url.is_empty() {
        return Err(format!("missing destination for '{short_key}'"));
    }
    Ok(LinkSeed {
        short_key,
        destination_url: destination_url.to_string(),
    })
}

#[derive(Debug, Parser)]
#[command(name = "waypoint-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq_any([("storage", "mysql"), ("access_sink", "mysql")]))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::Moka
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    #[arg(
        long,
        env = ACCESS_SINK_ENV,
        value_enum,
        default_value_t = AccessSinkArg::Log
    )]
    pub access_sink: AccessSinkArg,

    #[arg(long, env = L1_CAPACITY_ENV, default_value_t = 10_000)]
    pub l1_capacity: usize,

    #[arg(long, env = TRACKER_MAX_KEYS_ENV, default_value_t = 100_000)]
    pub tracker_max_keys: usize,

    #[arg(long, env = TRACKER_RETAIN_ENV, default_value_t = 50_000)]
    pub tracker_retain: usize,

    #[arg(long, env = L2_TIMEOUT_MS_ENV, default_value_t = 250)]
    pub l2_timeout_ms: u64,

    #[arg(long, env = STORE_TIMEOUT_MS_ENV, default_value_t = 3_000)]
    pub store_timeout_ms: u64,

    #[arg(long, env = ACCESS_QUEUE_CAPACITY_ENV, default_value_t = 10_000)]
    pub access_queue_capacity: usize,

    #[arg(long, env = SINK_TIMEOUT_MS_ENV, default_value_t = 2_000)]
    pub sink_timeout_ms: u64,

    /// How long shutdown waits for queued access events.
    #[arg(long, env = DRAIN_TIMEOUT_MS_ENV, default_value_t = 5_000)]
    pub drain_timeout_ms: u64,

    /// Remember missing keys for this many seconds. Off when unset.
    #[arg(long, env = NEGATIVE_TTL_SECS_ENV)]
    pub negative_ttl_secs: Option<u64>,

    #[arg(long, env = LOG_FORMAT_ENV, default_value = "text")]
    pub log_format: LogFormat,

    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,

    /// Seed link as `key=url`; may be repeated.
    #[arg(long = "link", value_parser = parse_link_seed)]
    pub links: Vec<LinkSeed>,
}
