use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::AppError;

const DEFAULT_CORS_ORIGINS: [&str; 3] = [
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "https://thinkbot.web.app",
];

/// HTTP server settings. Provider settings live in `GatewayConfig`.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Browser origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Upper bound on a multipart upload, in bytes.
    pub max_upload_bytes: usize,
    /// JSON file replacing the built-in score mappings and category keywords.
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    /// Optional:
    /// - `THINKBOT_LISTEN_ADDR` (default: "0.0.0.0:8000")
    /// - `THINKBOT_CORS_ORIGINS` (comma separated; default: the frontend dev and hosted origins)
    /// - `THINKBOT_MAX_UPLOAD_BYTES` (default: 10 MiB)
    /// - `THINKBOT_CATALOG_PATH`
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr = std::env::var("THINKBOT_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let listen_addr = listen_addr.parse::<SocketAddr>().map_err(|e| {
            AppError::Config(format!("THINKBOT_LISTEN_ADDR {listen_addr:?} is invalid: {e}"))
        })?;

        let cors_origins = match std::env::var("THINKBOT_CORS_ORIGINS") {
            Ok(raw) => parse_origins(&raw),
            Err(_) => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        let max_upload_bytes = std::env::var("THINKBOT_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(10 * 1024 * 1024);

        let catalog_path = std::env::var("THINKBOT_CATALOG_PATH").ok().map(PathBuf::from);
        if let Some(path) = &catalog_path {
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "catalog file not found at {}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            listen_addr,
            cors_origins,
            max_upload_bytes,
            catalog_path,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
