use tracing::dispatcher::{Dispatch, set_global_default};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global subscriber writing to stderr, as text or as JSON.
///
/// `levels` is an env-filter directive such as `info` or
/// `forwarder_conf=debug`. `RUST_LOG` replaces it when set.
pub fn init(color: bool, json: bool, levels: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(levels));

    let dispatch = if json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .flatten_event(true)
            .finish();
        Dispatch::new(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_ansi(color)
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        Dispatch::new(subscriber)
    };

    // Tests may initialize more than once.
    let _ = set_global_default(dispatch);
}
