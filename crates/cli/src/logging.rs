use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Maps `-v` occurrences to a default level; `RUST_LOG` overrides it.
pub fn default_level(verbose: u8) -> LevelFilter {
	match verbose {
		0 => LevelFilter::WARN,
		1 => LevelFilter::INFO,
		_ => LevelFilter::DEBUG,
	}
}

/// Installs a stderr subscriber so stdout stays free for results.
pub fn init_logging(verbose: u8) {
	let default_level = default_level(verbose);
	let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
		Ok(rust_log) => EnvFilter::try_new(&rust_log).unwrap_or_else(|err| {
			eprintln!("invalid {}, falling back to level '{default_level}' - {err}", EnvFilter::DEFAULT_ENV);
			EnvFilter::new(default_level.to_string())
		}),
		Err(_) => EnvFilter::new(default_level.to_string()),
	};

	let _ = tracing_subscriber::registry()
		.with(fmt::layer().with_writer(std::io::stderr).with_target(false))
		.with(filter)
		.try_init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verbosity_raises_level() {
		assert_eq!(default_level(0), LevelFilter::WARN);
		assert_eq!(default_level(1), LevelFilter::INFO);
		assert_eq!(default_level(5), LevelFilter::DEBUG);
	}
}
