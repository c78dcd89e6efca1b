use tracing_subscriber::EnvFilter;

/// Environment variable holding the diagnostic log filter, e.g. `SCHEDULER_LOG=debug`.
pub const LOG_ENV: &str = "SCHEDULER_LOG";

/// Send diagnostics to stderr, keeping stdout for command output.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // a subscriber may already be installed, e.g. by a test harness
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
