use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use shiplog_core::monitor::MIN_INTERVAL_SECS;
use shiplog_db::DbConfig;

#[derive(Debug, Parser)]
#[command(name = "shiplog-server", about = "Changelog generation server")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "SHIPLOG_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(long, env = "SHIPLOG_PORT", default_value = "3720")]
    pub port: u16,

    /// SQLite database file (defaults to the XDG data dir)
    #[arg(long, env = "SHIPLOG_DB_PATH")]
    pub db_path: Option<String>,

    /// GitHub API root, for GitHub Enterprise
    #[arg(long, env = "SHIPLOG_GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// Lowest polling interval a monitor may use (seconds)
    #[arg(long, env = "SHIPLOG_MIN_INTERVAL", default_value_t = MIN_INTERVAL_SECS)]
    pub min_interval: u64,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            sqlite_path: self.db_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::try_parse_from(["shiplog-server"]).unwrap();
        assert_eq!(config.addr().to_string(), "0.0.0.0:3720");
        assert_eq!(config.github_api_url, "https://api.github.com");
        assert_eq!(config.min_interval, 30);
        assert!(config.db_config().sqlite_path.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "shiplog-server",
            "--port",
            "8080",
            "--bind",
            "127.0.0.1",
            "--db-path",
            "/tmp/shiplog.db",
            "--min-interval",
            "60",
        ])
        .unwrap();
        assert_eq!(config.addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.db_config().sqlite_path.as_deref(), Some("/tmp/shiplog.db"));
        assert_eq!(config.min_interval, 60);
    }
}
