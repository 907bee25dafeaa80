use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::WireFormat;

/// AppConfig
///
/// Holds the client's entire configuration state. Loaded once at startup and
/// never mutated afterwards; the Portal and both HTTP services read from it.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and URL fallbacks.
    pub env: Env,
    // POST endpoint for check_code / register / login.
    pub auth_url: String,
    // POST endpoint for generation requests.
    pub generation_url: String,
    // When false the Module Interaction Controller runs without a session.
    pub auth_gate: bool,
    // Upper bound on any single HTTP call. Expiry is a transport failure.
    pub request_timeout: Duration,
    // Body layout expected by the generation endpoint.
    pub wire_format: WireFormat,
}

/// Env
///
/// Local runs get pretty logs and localhost endpoints; production requires
/// explicit endpoints and logs JSON.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
const LOCAL_AUTH_URL: &str = "http://localhost:8080/auth";
const LOCAL_GENERATION_URL: &str = "http://localhost:8080/generate";

impl Default for AppConfig {
    /// default
    ///
    /// Safe values for tests: local env, gate on, flat wire format.
    fn default() -> Self {
        Self {
            env: Env::Local,
            auth_url: LOCAL_AUTH_URL.to_string(),
            generation_url: LOCAL_GENERATION_URL.to_string(),
            auth_gate: true,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            wire_format: WireFormat::Flat,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment. In production the endpoint
    /// URLs are mandatory; locally they fall back to localhost.
    ///
    /// # Errors
    /// Returns `ConfigError` when a production endpoint is missing or a value
    /// cannot be parsed, so `main` can refuse to start.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let (auth_url, generation_url) = match env {
            Env::Production => (
                env::var("AUTH_API_URL").map_err(|_| ConfigError::Missing("AUTH_API_URL"))?,
                env::var("GENERATION_API_URL")
                    .map_err(|_| ConfigError::Missing("GENERATION_API_URL"))?,
            ),
            Env::Local => (
                env::var("AUTH_API_URL").unwrap_or_else(|_| LOCAL_AUTH_URL.to_string()),
                env::var("GENERATION_API_URL")
                    .unwrap_or_else(|_| LOCAL_GENERATION_URL.to_string()),
            ),
        };

        let auth_gate = match env::var("AUTH_GATE") {
            Err(_) => true,
            Ok(value) => match value.to_ascii_lowercase().as_str() {
                "on" | "true" | "1" => true,
                "off" | "false" | "0" => false,
                _ => return Err(ConfigError::Invalid { key: "AUTH_GATE", value }),
            },
        };

        let request_timeout = match env::var("REQUEST_TIMEOUT_SECS") {
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Ok(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "REQUEST_TIMEOUT_SECS",
                        value,
                    });
                }
            },
        };

        let wire_format = match env::var("GENERATION_WIRE_FORMAT") {
            Err(_) => WireFormat::Flat,
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "GENERATION_WIRE_FORMAT",
                value,
            })?,
        };

        Ok(Self {
            env,
            auth_url,
            generation_url,
            auth_gate,
            request_timeout,
            wire_format,
        })
    }
}
