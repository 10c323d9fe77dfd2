use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Filter directives for a `-v` count.
///
/// The runtime logs per-call flow at debug and ignored foreign traffic at
/// trace; the CLI itself reports command summaries at info. Stdout carries
/// JSON, so everything goes to stderr.
pub fn filter_directives(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "warn",
		1 => "warn,frame_rpc_cli=info,frame_rpc=debug",
		_ => "info,frame_rpc_cli=debug,frame_rpc=trace",
	}
}

pub fn init_logging(verbosity: u8) {
	// RUST_LOG wins over -v
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(verbosity)));

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE))
		.with_target(verbosity > 1)
		.without_time()
		.compact()
		.init();
}
