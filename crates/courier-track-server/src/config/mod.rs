//! Server configuration and courier table resolution.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::HeaderValue;
use courier_track::{ConfigError, CourierConfig, HttpClient, Registry};

/// Env var naming a courier table that replaces the embedded one.
pub const COURIERS_ENV: &str = "COURIER_TRACK_COURIERS";

/// Origins allowed to call the API from a browser unless overridden.
pub const DEFAULT_ORIGINS: [&str; 3] = [
    "https://www.thekashmircraft.com",
    "https://thekashmircraft.com",
    "https://courier-tracker-gvi5.onrender.com",
];

/// Options for the HTTP front door.
#[derive(Debug, Clone, clap::Args)]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0", global = true)]
    pub bind: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000, global = true)]
    pub port: u16,

    /// Directory of static frontend assets; unknown paths get its index.html.
    #[arg(long, default_value = "public", global = true)]
    pub static_dir: PathBuf,

    /// Browser origin allowed by CORS. Repeatable or comma separated.
    #[arg(
        long = "allow-origin",
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_values = DEFAULT_ORIGINS,
        global = true
    )]
    pub allow_origins: Vec<String>,

    /// Requests per client IP per minute on /api routes. 0 disables the limit.
    #[arg(long, default_value_t = 30, global = true)]
    pub rate_limit: u32,

    #[arg(skip = Duration::from_secs(60))]
    pub rate_window: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            static_dir: PathBuf::from("public"),
            allow_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
            rate_limit: 30,
            rate_window: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Configured origins as header values. Blank or malformed entries are
    /// skipped with a warning.
    pub fn origin_values(&self) -> Vec<HeaderValue> {
        self.allow_origins
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = o, "Ignoring malformed CORS origin");
                    None
                }
            })
            .collect()
    }
}

/// Resolve the courier table path: explicit flag, then `COURIER_TRACK_COURIERS`.
/// `None` means the embedded table.
pub fn resolve_couriers_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    std::env::var_os(COURIERS_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Build the registry from a courier table file, or the embedded table.
pub fn load_registry(path: Option<&Path>) -> Result<Registry, ConfigError> {
    match path {
        Some(path) => {
            tracing::info!("Courier table: {}", path.display());
            let config = CourierConfig::load(path)?;
            Registry::from_config(&config, HttpClient::new())
        }
        None => {
            tracing::info!("Courier table: built-in");
            Registry::builtin()
        }
    }
}
