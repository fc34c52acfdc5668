// Logging setup shared by the console binaries
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install a stderr fmt subscriber filtered by `RUST_LOG`
///
/// Falls back to `default_directives` (e.g. `"info,luminaris_core=debug"`)
/// when `RUST_LOG` is unset or invalid. Stdout stays free for view output.
pub fn init_tracing(
    default_directives: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    info!(target: "telemetry", "Tracing initialized");
    Ok(())
}
