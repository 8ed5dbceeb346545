//! Podupu CLI entry point.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podupu=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = podupu_cli::run() {
        log::debug!("{e:?}");
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}
