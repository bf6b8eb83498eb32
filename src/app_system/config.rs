/// Runtime configuration.
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | INVENTRIX_LOG | info | Log filter used when `RUST_LOG` is not set |
/// | INVENTRIX_LOG_JSON | false | Emit JSON lines instead of compact text |
/// | INVENTRIX_CHANNEL_BUFFER | 100 | Mailbox size of every store |
/// | INVENTRIX_SEQUENCE_START | 0 | Value counters start from; first id is start + 1 |
///
/// Values that fail to parse fall back to the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_filter: String,
    pub log_json: bool,
    pub channel_buffer: usize,
    pub sequence_start: u64,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub const DEFAULT_CHANNEL_BUFFER: usize = 100;

    pub fn from_env() -> Self {
        Self {
            log_filter: std::env::var("INVENTRIX_LOG").unwrap_or_else(|_| "info".into()),
            log_json: env_or("INVENTRIX_LOG_JSON", false),
            channel_buffer: match env_or("INVENTRIX_CHANNEL_BUFFER", Self::DEFAULT_CHANNEL_BUFFER) {
                0 => Self::DEFAULT_CHANNEL_BUFFER,
                n => n,
            },
            sequence_start: env_or("INVENTRIX_SEQUENCE_START", 0),
        }
    }

    /// Defaults without consulting the environment. Used by tests.
    pub fn with_defaults() -> Self {
        Self {
            log_filter: "info".into(),
            log_json: false,
            channel_buffer: Self::DEFAULT_CHANNEL_BUFFER,
            sequence_start: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
