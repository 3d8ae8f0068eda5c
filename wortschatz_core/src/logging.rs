//! Tracing setup for hosts embedding the core

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a stdout subscriber filtered by `log_level` (an `EnvFilter`
/// directive such as `"info"` or `"wortschatz_core=debug"`).
///
/// Returns false when a global subscriber was already installed.
pub fn init_tracing(log_level: &str) -> bool {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init_tracing("not a valid [directive");
        assert!(!init_tracing("debug"));
    }
}
