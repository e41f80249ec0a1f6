//! `~/.thsr.toml` defaults and their merge with command-line flags.
//!
//! Flags always win. Anything neither source sets stays `None` and is asked
//! for interactively during the first attempt.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use thsr::protocol::{CabinClass, MAX_TICKET_NUM, SeatPreference, Station, TIME_TABLE};
use thsr::validate::{parse_date, validate_personal_id, validate_phone};
use thsr::{BookingOptions, SnatchMode, ValidationError};
use thsr_runtime::http::DEFAULT_TIMEOUT;
use thsr_runtime::solver::DEFAULT_SOLVER_TIMEOUT;
use tracing::{debug, warn};

use crate::cli::Cli;

pub const CONFIG_FILE_NAME: &str = ".thsr.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("cannot read {}: {source}", .path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("invalid config {}: {source}", .path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},
}

/// A station given either by form id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StationRef {
	Id(u8),
	Name(String),
}

impl StationRef {
	fn resolve(&self) -> Result<Station, String> {
		match self {
			StationRef::Id(id) => Station::try_from(*id),
			StationRef::Name(name) => name.parse(),
		}
	}
}

/// Contents of the config file; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
	pub from_station: Option<StationRef>,
	pub to_station: Option<StationRef>,
	pub date: Option<String>,
	pub time: Option<usize>,
	pub adult_count: Option<u8>,
	pub student_count: Option<u8>,
	pub personal_id: Option<String>,
	pub phone: Option<String>,
	pub seat_prefer: Option<usize>,
	pub class_type: Option<u8>,
	pub snatch_end: Option<String>,
	pub snatch_interval: Option<u64>,
	pub snatch_single: Option<bool>,
	pub train_id: Option<u32>,
	pub use_membership: Option<bool>,
	pub captcha_solver: Option<String>,
	pub data_dir: Option<PathBuf>,
	pub http_timeout_secs: Option<u64>,
	pub solver_timeout_secs: Option<u64>,
}

impl ConfigFile {
	/// `Ok(None)` when the file does not exist.
	pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
		let text = match std::fs::read_to_string(path) {
			Ok(text) => text,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(source) => {
				return Err(ConfigError::Read {
					path: path.to_path_buf(),
					source,
				});
			}
		};
		toml::from_str(&text).map(Some).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})
	}
}

pub fn default_config_path() -> Option<PathBuf> {
	dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

pub fn default_data_dir() -> PathBuf {
	dirs::data_dir().map(|dir| dir.join("thsr")).unwrap_or_else(|| PathBuf::from(".thsr"))
}

/// A config file that was found, or why it was skipped.
#[derive(Debug, Default)]
pub struct LoadedConfig {
	pub path: Option<PathBuf>,
	pub file: ConfigFile,
	pub warning: Option<String>,
}

/// Loads `explicit` or the default path; problems become a warning.
pub fn load_config(explicit: Option<&Path>) -> LoadedConfig {
	let Some(path) = explicit.map(Path::to_path_buf).or_else(default_config_path) else {
		return LoadedConfig::default();
	};
	match ConfigFile::load(&path) {
		Ok(Some(file)) => {
			debug!(target = "thsr", path = %path.display(), "config loaded");
			LoadedConfig {
				path: Some(path),
				file,
				warning: None,
			}
		}
		Ok(None) => LoadedConfig::default(),
		Err(error) => {
			warn!(target = "thsr", %error, "config ignored");
			LoadedConfig {
				path: Some(path),
				file: ConfigFile::default(),
				warning: Some(error.to_string()),
			}
		}
	}
}

/// Everything a booking run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct Settings {
	pub options: BookingOptions,
	pub data_dir: PathBuf,
	pub captcha_solver: Option<String>,
	pub http_timeout: Duration,
	pub solver_timeout: Duration,
}

fn field_error(field: &'static str, message: impl Into<String>) -> ValidationError {
	ValidationError::Field {
		field,
		message: message.into(),
	}
}

fn station(flag: Option<Station>, file: Option<&StationRef>, field: &'static str) -> Result<Option<Station>, ValidationError> {
	match (flag, file) {
		(Some(station), _) => Ok(Some(station)),
		(None, Some(reference)) => reference.resolve().map(Some).map_err(|message| field_error(field, message)),
		(None, None) => Ok(None),
	}
}

fn ticket_count(value: Option<u8>, field: &'static str) -> Result<Option<u8>, ValidationError> {
	match value {
		Some(count) if count > MAX_TICKET_NUM => Err(field_error(field, format!("at most {MAX_TICKET_NUM} tickets"))),
		other => Ok(other),
	}
}

fn date(value: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
	value.map(parse_date).transpose()
}

/// Merges flags over the config file and validates the result.
pub fn resolve_settings(cli: &Cli, file: &ConfigFile) -> Result<Settings, ValidationError> {
	let mut options = BookingOptions::default();

	options.from_station = station(cli.from_station, file.from_station.as_ref(), "from_station")?;
	options.to_station = station(cli.to_station, file.to_station.as_ref(), "to_station")?;
	if let (Some(from), Some(to)) = (options.from_station, options.to_station) {
		if from == to {
			return Err(field_error("to_station", format!("departure and arrival are both {from}")));
		}
	}

	options.date = date(cli.date.as_deref().or(file.date.as_deref()))?;

	options.time_id = cli.time_id.or(file.time);
	if let Some(id) = options.time_id {
		if !(1..=TIME_TABLE.len()).contains(&id) {
			return Err(field_error("time", format!("time slot must be between 1 and {}", TIME_TABLE.len())));
		}
	}

	options.adult_count = ticket_count(cli.adult_count.or(file.adult_count), "adult_count")?;
	options.student_count = ticket_count(cli.student_count.or(file.student_count), "student_count")?;

	options.personal_id = cli
		.personal_id
		.as_deref()
		.or(file.personal_id.as_deref())
		.map(validate_personal_id)
		.transpose()?;
	options.phone = cli.phone.as_deref().or(file.phone.as_deref()).map(validate_phone).transpose()?;

	options.seat_prefer = cli
		.seat_prefer
		.or(file.seat_prefer)
		.map(|index| SeatPreference::from_index(index).ok_or_else(|| field_error("seat_prefer", "expected 0, 1 or 2")))
		.transpose()?;
	options.class_type = cli
		.class_type
		.or(file.class_type)
		.map(|value| CabinClass::from_value(value).ok_or_else(|| field_error("class_type", "expected 0 or 1")))
		.transpose()?;

	options.use_membership = if cli.use_membership { Some(true) } else { file.use_membership };
	options.preferred_train = cli.train_id.or(file.train_id);

	options.snatch.mode = snatch_mode(cli, file, options.date)?;
	options.snatch.interval_secs = cli.snatch_interval.or(file.snatch_interval);
	options.dry_run = cli.dry_run;
	options.auto_captcha = !cli.no_auto_captcha;

	Ok(Settings {
		options,
		data_dir: cli.data_dir.clone().or_else(|| file.data_dir.clone()).unwrap_or_else(default_data_dir),
		captcha_solver: cli.captcha_solver.clone().or_else(|| file.captcha_solver.clone()).filter(|cmd| !cmd.trim().is_empty()),
		http_timeout: file.http_timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT),
		solver_timeout: file.solver_timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_SOLVER_TIMEOUT),
	})
}

/// Flags decide first; the file only applies when no snatch flag was given.
fn snatch_mode(cli: &Cli, file: &ConfigFile, start: Option<NaiveDate>) -> Result<Option<SnatchMode>, ValidationError> {
	if cli.snatch {
		return Ok(Some(SnatchMode::SingleDay));
	}
	let end = match cli.snatch_end.as_deref() {
		Some(end) => Some(parse_date(end)?),
		None => date(file.snatch_end.as_deref())?,
	};
	if let Some(end) = end {
		if let Some(start) = start {
			if end < start {
				return Err(ValidationError::DateRange { start, end });
			}
		}
		return Ok(Some(SnatchMode::DateRange { end }));
	}
	Ok(file.snatch_single.filter(|single| *single).map(|_| SnatchMode::SingleDay))
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;

	fn cli(args: &[&str]) -> Cli {
		Cli::try_parse_from(std::iter::once("thsr").chain(args.iter().copied())).unwrap()
	}

	fn file(toml_text: &str) -> ConfigFile {
		toml::from_str(toml_text).unwrap()
	}

	#[test]
	fn config_keys_fill_unset_flags() {
		let config = file(
			r#"
			from_station = 1
			to_station = "台南"
			date = "2025/05/10"
			time = 12
			adult_count = 2
			personal_id = "A123456789"
			phone = "0912345678"
			seat_prefer = 1
			class_type = 1
			snatch_interval = 60
			use_membership = true
			captcha_solver = "python3 solve.py"
			http_timeout_secs = 5
			solver_timeout_secs = 3
			"#,
		);
		let settings = resolve_settings(&cli(&[]), &config).unwrap();
		let opts = &settings.options;
		assert_eq!(opts.from_station, Some(Station::Nangang));
		assert_eq!(opts.to_station, Some(Station::Tainan));
		assert_eq!(opts.date, NaiveDate::from_ymd_opt(2025, 5, 10));
		assert_eq!(opts.time_id, Some(12));
		assert_eq!(opts.adult_count, Some(2));
		assert_eq!(opts.student_count, None);
		assert_eq!(opts.seat_prefer, Some(SeatPreference::Window));
		assert_eq!(opts.class_type, Some(CabinClass::Business));
		assert_eq!(opts.use_membership, Some(true));
		assert_eq!(opts.snatch.mode, None);
		assert_eq!(opts.snatch.interval_secs, Some(60));
		assert_eq!(settings.captcha_solver.as_deref(), Some("python3 solve.py"));
		assert_eq!(settings.http_timeout, Duration::from_secs(5));
		assert_eq!(settings.solver_timeout, Duration::from_secs(3));
	}

	#[test]
	fn flags_win_over_config() {
		let config = file("from_station = 1\nadult_count = 2\nphone = \"0912345678\"\nsnatch_single = true");
		let settings = resolve_settings(&cli(&["-f", "Taichung", "-a", "4", "--snatch-end", "2025/05/03", "-d", "2025/05/01"]), &config).unwrap();
		let opts = &settings.options;
		assert_eq!(opts.from_station, Some(Station::Taichung));
		assert_eq!(opts.adult_count, Some(4));
		assert_eq!(opts.phone.as_deref(), Some("0912345678"));
		assert_eq!(
			opts.snatch.mode,
			Some(SnatchMode::DateRange {
				end: NaiveDate::from_ymd_opt(2025, 5, 3).unwrap()
			})
		);
	}

	#[test]
	fn snatch_single_from_config() {
		let settings = resolve_settings(&cli(&[]), &file("snatch_single = true")).unwrap();
		assert_eq!(settings.options.snatch.mode, Some(SnatchMode::SingleDay));
		let settings = resolve_settings(&cli(&[]), &file("snatch_single = false")).unwrap();
		assert_eq!(settings.options.snatch.mode, None);
	}

	#[test]
	fn invalid_values_are_rejected() {
		let empty = ConfigFile::default();
		assert!(matches!(resolve_settings(&cli(&["-i", "A123456788"]), &empty), Err(ValidationError::PersonalId(_))));
		assert!(matches!(resolve_settings(&cli(&["-P", "0212345678"]), &empty), Err(ValidationError::Phone(_))));
		assert!(matches!(resolve_settings(&cli(&["-d", "10/05/2025"]), &empty), Err(ValidationError::Date(_))));
		assert!(matches!(resolve_settings(&cli(&["-T", "39"]), &empty), Err(ValidationError::Field { field: "time", .. })));
		assert!(matches!(resolve_settings(&cli(&["-p", "3"]), &empty), Err(ValidationError::Field { field: "seat_prefer", .. })));
		assert!(matches!(resolve_settings(&cli(&["-c", "2"]), &empty), Err(ValidationError::Field { field: "class_type", .. })));
		assert!(matches!(resolve_settings(&cli(&["-a", "11"]), &empty), Err(ValidationError::Field { field: "adult_count", .. })));
		assert!(matches!(resolve_settings(&cli(&["-f", "2", "-t", "台北"]), &empty), Err(ValidationError::Field { field: "to_station", .. })));
		assert!(matches!(resolve_settings(&cli(&[]), &file("from_station = 13")), Err(ValidationError::Field { field: "from_station", .. })));
	}

	#[test]
	fn range_end_before_start_is_rejected() {
		let result = resolve_settings(&cli(&["-d", "2025/05/03", "--snatch-end", "2025/05/01"]), &ConfigFile::default());
		assert!(matches!(result, Err(ValidationError::DateRange { .. })));
	}

	#[test]
	fn missing_file_is_silent_and_bad_file_warns() {
		let dir = tempfile::tempdir().unwrap();
		let missing = load_config(Some(&dir.path().join("absent.toml")));
		assert!(missing.path.is_none() && missing.warning.is_none());

		let bad = dir.path().join("bad.toml");
		std::fs::write(&bad, "adult_count = \"two\"").unwrap();
		let loaded = load_config(Some(&bad));
		assert_eq!(loaded.file, ConfigFile::default());
		assert!(loaded.warning.unwrap().contains("bad.toml"));

		let good = dir.path().join("good.toml");
		std::fs::write(&good, "personal_id = \"A123456789\"").unwrap();
		let loaded = load_config(Some(&good));
		assert_eq!(loaded.file.personal_id.as_deref(), Some("A123456789"));
		assert_eq!(loaded.path.as_deref(), Some(good.as_path()));
	}

	#[test]
	fn blank_solver_command_is_unset() {
		let settings = resolve_settings(&cli(&["--captcha-solver", "  "]), &ConfigFile::default()).unwrap();
		assert!(settings.captcha_solver.is_none());
		assert!(settings.options.auto_captcha);
		assert!(!resolve_settings(&cli(&["-C"]), &ConfigFile::default()).unwrap().options.auto_captcha);
	}
}
