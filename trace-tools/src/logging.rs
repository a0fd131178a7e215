use std::sync::Once;

use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Route diagnostics to stderr so stdout stays machine readable.
///
/// The level comes from `RUST_LOG` and defaults to `info`.
pub fn setup_logger() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt::Subscriber::builder()
            .compact()
            .without_time()
            .with_target(false)
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .finish()
            .try_init();
    });
}
