//! Server configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

/// Default port when none is configured.
const DEFAULT_PORT: u16 = 8080;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but its value cannot be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Path of the JSON data file.
    pub data_path: PathBuf,
    /// Origins allowed by CORS; `*` mirrors any request origin.
    pub cors_origins: Vec<String>,
    /// Whether the session cookie carries the `Secure` attribute.
    pub secure_cookies: bool,
    /// Verbose logging.
    pub debug: bool,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            data_path: PathBuf::from("data/twosteps.json"),
            cors_origins: vec!["*".to_string()],
            secure_cookies: false,
            debug: false,
        }
    }

    /// Builds a configuration from environment variables.
    ///
    /// Recognized variables: `SERVER_HOST`, `PORT` (or `FLASK_PORT`),
    /// `CORS_ORIGINS` (comma-separated), `DEBUG`, `SECURE_COOKIES` and
    /// `TWOSTEPS_DATA`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("SERVER_HOST") {
            let ip: IpAddr = host.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "SERVER_HOST",
                value: host.clone(),
            })?;
            config.bind_addr.set_ip(ip);
        }

        let port = match get("PORT") {
            Some(port) => Some(("PORT", port)),
            None => get("FLASK_PORT").map(|port| ("FLASK_PORT", port)),
        };
        if let Some((name, port)) = port {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name, value: port })?;
            config.bind_addr.set_port(port);
        }

        if let Some(origins) = get("CORS_ORIGINS") {
            config = config.with_cors_origins(origins.split(','));
        }

        if let Some(path) = get("TWOSTEPS_DATA") {
            config.data_path = PathBuf::from(path);
        }

        config.debug = get("DEBUG").map(|v| parse_flag(&v)).unwrap_or(false);
        config.secure_cookies = get("SECURE_COOKIES")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        Ok(config)
    }

    /// Sets the data file path.
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Sets the allowed CORS origins. Blank entries are dropped.
    pub fn with_cors_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cors_origins = origins
            .into_iter()
            .map(|o| o.as_ref().trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        self
    }

    /// Enables the `Secure` cookie attribute.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Enables debug logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Returns true if any origin is accepted.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}
