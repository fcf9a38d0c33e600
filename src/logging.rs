use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Environment variable holding filter directives, e.g. `crc_transfer=trace`.
pub const LOG_ENV : &str = "CRC_TRANSFER_LOG";

/// Installs a stderr subscriber. `level` applies when the environment sets no filter.
pub fn init(level : LevelFilter) {
	let format = fmt::layer()
		.with_writer(std::io::stderr)
		.with_level(true)
		.with_target(true)
		.compact();

	let filter = EnvFilter::builder()
		.with_default_directive(level.into())
		.with_env_var(LOG_ENV)
		.from_env_lossy();

	if tracing_subscriber::registry()
		.with(filter)
		.with(format)
		.try_init()
		.is_err()
	{
		tracing::debug!("logger already initialized");
	}
}
