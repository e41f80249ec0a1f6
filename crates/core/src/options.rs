//! Run configuration accumulated from the command line, the config file and
//! first-attempt answers.
//!
//! Every optional field follows one rule: once it holds a value it is fixed
//! for the rest of the run. Flow code fills gaps through [`remember`] and
//! never assigns over a populated field.

use std::time::Duration;

use chrono::NaiveDate;
use thsr_protocol::{CabinClass, SeatPreference, Station};

/// Default polling interval offered by the interactive snatch setup.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Fills `slot` with `value` only when it is empty; returns the kept value.
pub fn remember<T>(slot: &mut Option<T>, value: T) -> &T {
	slot.get_or_insert(value)
}

/// Polling ("snatch") mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnatchMode {
	/// Book once; sold out is fatal.
	Off,
	/// Keep polling the configured date.
	SingleDay,
	/// Sweep every day from the start date through `end`.
	DateRange { end: NaiveDate },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnatchOptions {
	/// `None` until chosen by flag, config, or the interactive setup.
	pub mode: Option<SnatchMode>,
	pub interval_secs: Option<u64>,
	/// Ask for the target train on the first attempt and keep it.
	pub lock_train: bool,
}

impl SnatchOptions {
	pub fn is_active(&self) -> bool {
		matches!(self.mode, Some(SnatchMode::SingleDay | SnatchMode::DateRange { .. }))
	}

	/// Round interval; `None` or zero means a single sweep.
	pub fn interval(&self) -> Option<Duration> {
		self.interval_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingOptions {
	pub from_station: Option<Station>,
	pub to_station: Option<Station>,
	pub date: Option<NaiveDate>,
	/// 1-based time-table slot.
	pub time_id: Option<usize>,
	pub adult_count: Option<u8>,
	pub student_count: Option<u8>,
	pub seat_prefer: Option<SeatPreference>,
	pub class_type: Option<CabinClass>,
	pub personal_id: Option<String>,
	pub phone: Option<String>,
	pub use_membership: Option<bool>,
	pub preferred_train: Option<u32>,
	pub snatch: SnatchOptions,
	/// Stop after train confirmation; passenger data is never submitted.
	pub dry_run: bool,
	pub auto_captcha: bool,
}

impl Default for BookingOptions {
	fn default() -> Self {
		Self {
			from_station: None,
			to_station: None,
			date: None,
			time_id: None,
			adult_count: None,
			student_count: None,
			seat_prefer: None,
			class_type: None,
			personal_id: None,
			phone: None,
			use_membership: None,
			preferred_train: None,
			snatch: SnatchOptions::default(),
			dry_run: false,
			auto_captcha: true,
		}
	}
}

impl BookingOptions {
	pub fn with_snatch_mode(mut self, mode: SnatchMode) -> Self {
		self.snatch.mode = Some(mode);
		self
	}

	pub fn with_interval(mut self, secs: u64) -> Self {
		self.snatch.interval_secs = Some(secs);
		self
	}

	pub fn with_dry_run(mut self, dry_run: bool) -> Self {
		self.dry_run = dry_run;
		self
	}

	pub fn with_auto_captcha(mut self, auto_captcha: bool) -> Self {
		self.auto_captcha = auto_captcha;
		self
	}

	pub fn is_snatch(&self) -> bool {
		self.snatch.is_active()
	}
}
