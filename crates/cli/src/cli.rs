use std::path::PathBuf;

use clap::{ArgAction, Parser};
use thsr::protocol::Station;

use crate::output::OutputFormat;

#[derive(Parser, Debug, Default)]
#[command(name = "thsr")]
#[command(about = "Book Taiwan High Speed Rail tickets from the command line")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, action = ArgAction::Count)]
	pub verbose: u8,

	/// Config file (defaults to ~/.thsr.toml)
	#[arg(long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Output format for the final result
	#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	/// Directory for history, captcha samples and the manual captcha image
	#[arg(long, value_name = "DIR")]
	pub data_dir: Option<PathBuf>,

	/// Program that reads a captcha image on stdin and prints a JSON prediction
	#[arg(long, value_name = "COMMAND")]
	pub captcha_solver: Option<String>,

	/// Print station ids and names, then exit
	#[arg(long, alias = "list-station")]
	pub list_stations: bool,

	/// Print departure time slots, then exit
	#[arg(long)]
	pub list_time_table: bool,

	/// Departure station (id, English or Chinese name)
	#[arg(short = 'f', long, value_name = "STATION", value_parser = parse_station)]
	pub from_station: Option<Station>,

	/// Arrival station (id, English or Chinese name)
	#[arg(short = 't', long, value_name = "STATION", value_parser = parse_station)]
	pub to_station: Option<Station>,

	/// Departure date, YYYY/MM/DD
	#[arg(short = 'd', long, value_name = "DATE")]
	pub date: Option<String>,

	/// Departure time slot id (see --list-time-table)
	#[arg(short = 'T', long = "time", value_name = "ID")]
	pub time_id: Option<usize>,

	/// Number of adult tickets
	#[arg(short = 'a', long, value_name = "N")]
	pub adult_count: Option<u8>,

	/// Number of college-student tickets
	#[arg(short = 's', long, value_name = "N")]
	pub student_count: Option<u8>,

	/// Passenger national id
	#[arg(short = 'i', long, value_name = "ID")]
	pub personal_id: Option<String>,

	/// Contact phone, 09xxxxxxxx
	#[arg(short = 'P', long, value_name = "PHONE")]
	pub phone: Option<String>,

	/// Seat preference: 0 none, 1 window, 2 aisle
	#[arg(short = 'p', long, value_name = "0-2")]
	pub seat_prefer: Option<usize>,

	/// Cabin class: 0 standard, 1 business
	#[arg(short = 'c', long, value_name = "0-1")]
	pub class_type: Option<u8>,

	/// Keep polling the departure date until a seat is booked
	#[arg(long, conflicts_with = "snatch_end")]
	pub snatch: bool,

	/// Poll every date from the departure date through this one
	#[arg(long, value_name = "DATE")]
	pub snatch_end: Option<String>,

	/// Seconds between polling rounds; 0 sweeps once
	#[arg(long, value_name = "SECONDS")]
	pub snatch_interval: Option<u64>,

	/// Only book this train number
	#[arg(long, value_name = "TRAIN")]
	pub train_id: Option<u32>,

	/// Type the captcha instead of running the solver
	#[arg(short = 'C', long)]
	pub no_auto_captcha: bool,

	/// Book with the passenger's TGo membership
	#[arg(short = 'm', long)]
	pub use_membership: bool,

	/// Stop after choosing a train; nothing is reserved
	#[arg(long)]
	pub dry_run: bool,
}

fn parse_station(value: &str) -> Result<Station, String> {
	value.parse()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_flags_match_booking_fields() {
		let cli = Cli::try_parse_from([
			"thsr", "-f", "台北", "-t", "12", "-d", "2025/05/10", "-T", "10", "-a", "2", "-s", "1", "-i", "A123456789", "-P", "0912345678", "-p", "1", "-c",
			"0", "-C", "-m", "-vv",
		])
		.unwrap();
		assert_eq!(cli.from_station, Some(Station::Taipei));
		assert_eq!(cli.to_station, Some(Station::Zuouing));
		assert_eq!(cli.date.as_deref(), Some("2025/05/10"));
		assert_eq!(cli.time_id, Some(10));
		assert_eq!(cli.adult_count, Some(2));
		assert_eq!(cli.student_count, Some(1));
		assert_eq!(cli.seat_prefer, Some(1));
		assert_eq!(cli.class_type, Some(0));
		assert!(cli.no_auto_captcha && cli.use_membership);
		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.format, OutputFormat::Text);
	}

	#[test]
	fn snatch_flags_conflict() {
		assert!(Cli::try_parse_from(["thsr", "--snatch", "--snatch-end", "2025/05/03"]).is_err());
		let cli = Cli::try_parse_from(["thsr", "--snatch-end", "2025/05/03", "--snatch-interval", "45", "--train-id", "803"]).unwrap();
		assert_eq!(cli.snatch_end.as_deref(), Some("2025/05/03"));
		assert_eq!(cli.snatch_interval, Some(45));
		assert_eq!(cli.train_id, Some(803));
	}

	#[test]
	fn unknown_station_is_rejected() {
		assert!(Cli::try_parse_from(["thsr", "-f", "Kaohsiung"]).is_err());
		assert!(Cli::try_parse_from(["thsr", "-t", "13"]).is_err());
	}

	#[test]
	fn list_station_alias() {
		assert!(Cli::try_parse_from(["thsr", "--list-station"]).unwrap().list_stations);
		assert!(Cli::try_parse_from(["thsr", "--list-time-table", "--format", "json"]).unwrap().list_time_table);
	}
}
