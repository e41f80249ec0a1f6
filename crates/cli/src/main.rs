use std::io::Write;

use clap::Parser;
use thsr_cli::{cli::Cli, commands, logging};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let code = match commands::dispatch(cli).await {
		Ok(status) => status.code(),
		Err(err) => {
			error!(target = "thsr", error = %err, "command failed");
			eprintln!("error: {err:#}");
			1
		}
	};
	let _ = std::io::stdout().flush();
	// A prompt may still be blocked on stdin; exit without waiting for it.
	std::process::exit(code);
}
