//! Server configuration, populated from environment variables.

use std::net::SocketAddr;

/// Runtime configuration for a terrograph server.
///
/// All fields are populated from environment variables with sensible
/// defaults, so a server can be started with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `TGRAPH_BIND` | `0.0.0.0:3000` | TCP socket address to listen on |
/// | `TGRAPH_API_BASE` | derived from TGRAPH_BIND | Absolute base URL used in hypermedia links |
/// | `TGRAPH_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `TGRAPH_JWT_SECRET` | generated per start | HS256 signing secret, at least 32 characters |
/// | `TGRAPH_TOKEN_TTL_SECS` | `3600` | Access-token lifetime in seconds |
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Absolute base URL prepended to every link href.
    /// Example: `"https://records.example.com"`.
    pub api_base: String,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,

    /// HS256 signing secret for bearer tokens.
    pub jwt_secret: String,

    /// Seconds an issued token stays valid.
    pub token_ttl_secs: i64,
}

impl Config {
    /// Populate config from environment variables, applying defaults where
    /// absent.
    ///
    /// When `TGRAPH_JWT_SECRET` is unset a random secret is generated and a
    /// warning is logged: tokens will not survive a restart.
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = std::env::var("TGRAPH_BIND")
            .unwrap_or_else(|_| "0.0.0.0:3000".into())
            .parse()
            .expect("TGRAPH_BIND must be a valid socket address (e.g. 0.0.0.0:3000)");

        let api_base = std::env::var("TGRAPH_API_BASE")
            .unwrap_or_else(|_| format!("http://{bind_addr}"));

        let jwt_secret = std::env::var("TGRAPH_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!(
                "TGRAPH_JWT_SECRET is not set; using a generated secret \
                 (tokens will be invalidated on restart)"
            );
            generated_secret()
        });
        if jwt_secret.len() < 32 {
            panic!("TGRAPH_JWT_SECRET must be at least 32 characters");
        }

        let token_ttl_secs = std::env::var("TGRAPH_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(3600);

        Self {
            bind_addr,
            api_base,
            db_path: std::env::var("TGRAPH_DB").ok(),
            jwt_secret,
            token_ttl_secs,
        }
    }

    /// A config suitable for in-process tests: in-memory storage, fixed
    /// secret, short-lived tokens.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().expect("valid test bind address"),
            api_base: "http://localhost:3000".into(),
            db_path: None,
            jwt_secret: "test-secret-key-that-is-at-least-32-characters-long".into(),
            token_ttl_secs: 3600,
        }
    }
}

/// 64 hex characters of UUIDv7-derived entropy.
fn generated_secret() -> String {
    format!(
        "{}{}",
        uuid::Uuid::now_v7().simple(),
        uuid::Uuid::now_v7().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_is_long_enough() {
        assert!(generated_secret().len() >= 32);
    }
}
