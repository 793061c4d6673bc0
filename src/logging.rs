use tracing_subscriber::EnvFilter;

/// Set up logging to stderr.
///
/// Use the RUST_LOG environment variable to override the default level,
/// e.g. `RUST_LOG=dns_optimizer=trace`. Without it only warnings are shown,
/// or debug events when `verbose` is set.
pub fn init_logging(verbose: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.try_init()
		.ok();
}
