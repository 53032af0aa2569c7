use clap::{ArgAction, Parser};

use crate::hub::HubConfig;

/// kosmos chat server
#[derive(Parser, Clone, Debug)]
#[command(name = "kosmos", version, about = "Real-time chat rooms over WebSockets")]
pub struct Config {
    /// Bind address
    #[arg(long, env = "KOSMOS_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Port to listen on
    #[arg(long, env = "KOSMOS_PORT", default_value_t = 8080)]
    pub port: u16,

    /// SQLite database url
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://kosmos.db?mode=rwc")]
    pub database_url: String,

    /// Maximum pooled database connections
    #[arg(long, env = "KOSMOS_MAX_DB_CONNECTIONS", default_value_t = 16)]
    pub max_db_connections: u32,

    /// Messages buffered per connection before it is dropped as too slow
    #[arg(long, env = "KOSMOS_OUTBOUND_BUFFER", default_value_t = 256,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub outbound_buffer: u32,

    /// Forget a room's hub once its last connection leaves
    #[arg(long, env = "KOSMOS_EVICT_EMPTY_HUBS", default_value_t = true, action = ArgAction::Set)]
    pub evict_empty_hubs: bool,

    /// Minutes of inactivity before a session expires
    #[arg(long, env = "KOSMOS_SESSION_EXPIRY_MINUTES", default_value_t = 60)]
    pub session_expiry_minutes: i64,

    /// Only send the session cookie over https
    #[arg(long, env = "KOSMOS_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Structured JSON logs instead of human readable ones
    #[arg(long, env = "KOSMOS_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Reads `.env` if present, then the command line and environment.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Config::parse()
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            outbound_capacity: self.outbound_buffer as usize,
            evict_empty: self.evict_empty_hubs,
        }
    }
}
