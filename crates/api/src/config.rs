use std::path::PathBuf;
use std::time::Duration;

use screenplan_core::upload::DEFAULT_MAX_UPLOAD_BYTES;

use crate::auth::jwt::JwtConfig;

/// Default cap on a whole request body (100 MiB), which bounds multipart
/// batches of several screen images.
const DEFAULT_MAX_REQUEST_BYTES: usize = 100 * 1024 * 1024;

/// Runtime settings, read once at startup by [`ServerConfig::from_env`].
///
/// Only `JWT_SECRET` is mandatory; the rest default to a local setup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Frontend origins allowed by CORS.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight plan generations.
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// Directory that holds stored screen images.
    pub storage_root: PathBuf,
    /// Base URL under which `storage_root` is served (`.../files`).
    pub public_base_url: String,
    /// Per-file upload cap in bytes.
    pub max_upload_bytes: usize,
    /// Whole-request body cap in bytes.
    pub max_request_bytes: usize,
    /// Artificial latency of the simulated plan generator, in milliseconds.
    pub plan_generation_delay_ms: u64,
    /// Staged uploads older than this many seconds are discarded.
    pub upload_staging_ttl_secs: u64,
}

impl ServerConfig {
    /// Read settings from the environment, panicking on unparsable values.
    ///
    /// | Env Var                    | Default                          |
    /// |----------------------------|----------------------------------|
    /// | `HOST`                     | `0.0.0.0`                        |
    /// | `PORT`                     | `3000`                           |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`          |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                             |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `30`                             |
    /// | `STORAGE_ROOT`             | `./storage`                      |
    /// | `PUBLIC_BASE_URL`          | `http://localhost:{PORT}/files`  |
    /// | `MAX_UPLOAD_BYTES`         | `20971520` (20 MiB)              |
    /// | `MAX_REQUEST_BYTES`        | `104857600` (100 MiB)            |
    /// | `PLAN_GENERATION_DELAY_MS` | `3500`                           |
    /// | `UPLOAD_STAGING_TTL_SECS`  | `3600`                           |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();

        let storage_root = PathBuf::from(
            std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "./storage".into()),
        );

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}/files"))
            .trim_end_matches('/')
            .to_string();

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let max_request_bytes: usize = std::env::var("MAX_REQUEST_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_REQUEST_BYTES.to_string())
            .parse()
            .expect("MAX_REQUEST_BYTES must be a valid usize");

        let plan_generation_delay_ms: u64 = std::env::var("PLAN_GENERATION_DELAY_MS")
            .unwrap_or_else(|_| "3500".into())
            .parse()
            .expect("PLAN_GENERATION_DELAY_MS must be a valid u64");

        let upload_staging_ttl_secs: u64 = std::env::var("UPLOAD_STAGING_TTL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("UPLOAD_STAGING_TTL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            storage_root,
            public_base_url,
            max_upload_bytes,
            max_request_bytes,
            plan_generation_delay_ms,
            upload_staging_ttl_secs,
        }
    }

    pub fn plan_generation_delay(&self) -> Duration {
        Duration::from_millis(self.plan_generation_delay_ms)
    }

    pub fn upload_staging_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_staging_ttl_secs)
    }
}
