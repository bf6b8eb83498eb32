use tracing_subscriber::EnvFilter;

use super::Config;

/// Configure tracing once at startup for the whole process.
///
/// `RUST_LOG` wins when set; otherwise the configured filter applies.
/// Output is compact text with uptime timestamps, or JSON lines when
/// `log_json` is on. Calling this twice is harmless.
///
/// ```bash
/// RUST_LOG=debug inventrix
/// RUST_LOG=inventrix::clients=debug,info inventrix
/// ```
pub fn setup_tracing(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::uptime());

    let _ = if config.log_json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}
