use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Base URL of the assistant service
    #[arg(long, env = "ASSISTANT_URL")]
    pub service_url: String,

    /// API key used for basic auth against the assistant service
    #[arg(long, env = "ASSISTANT_APIKEY")]
    pub api_key: String,

    /// Assistant to open sessions against
    #[arg(long, env = "ASSISTANT_ID")]
    pub assistant_id: String,

    /// Assistant API version date
    #[arg(long, env = "ASSISTANT_VERSION", default_value = "2019-02-28")]
    pub api_version: String,

    /// Per-call timeout in seconds for assistant requests
    #[arg(long, env = "ASSISTANT_TIMEOUT", default_value = "100")]
    pub timeout_secs: u64,

    /// Items per chunk; one assistant session is opened per chunk
    #[arg(long, env = "CHUNK_SIZE", default_value = "100")]
    pub chunk_size: usize,

    /// Number of concurrent chunk workers
    #[arg(long, env = "WORKERS", default_value = "50")]
    pub workers: usize,

    /// Label vocabulary override, comma-separated and order-significant
    #[arg(long, env = "LABELS")]
    pub labels: Option<String>,

    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub chunk_size: usize,
    pub workers: usize,
}

impl From<&Config> for DispatchConfig {
    fn from(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            workers: config.workers,
        }
    }
}

impl Config {
    pub fn parse_labels(&self) -> Option<Vec<String>> {
        self.labels.as_ref().map(|labels| {
            labels
                .split(',')
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .collect()
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
