//! Command dispatch and process exit status.

pub mod book;
pub mod list;

use crate::cli::Cli;

/// How the process should exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
	/// Booked, listed, dry run finished, or cancelled by the user.
	Success,
	Failure,
	/// Every candidate date came back sold out.
	Exhausted,
}

impl ExitStatus {
	pub fn code(self) -> i32 {
		match self {
			ExitStatus::Success => 0,
			ExitStatus::Failure => 1,
			ExitStatus::Exhausted => 2,
		}
	}
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<ExitStatus> {
	if cli.list_stations {
		list::stations(cli.format);
		return Ok(ExitStatus::Success);
	}
	if cli.list_time_table {
		list::time_table(cli.format);
		return Ok(ExitStatus::Success);
	}
	book::run(cli).await
}
