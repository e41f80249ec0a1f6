//! Passenger history persisted as a JSON file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thsr::protocol::{BookingForm, PassengerForm};
use thsr::store::StoreResult;
use thsr::{HistoryRecord, HistoryStore, StoreError, TicketInfo};
use tracing::debug;

const HISTORY_SCHEMA_VERSION: u32 = 1;

/// Oldest records beyond this count are dropped on save.
pub const MAX_HISTORY_RECORDS: usize = 20;

/// On-disk format, most recent record first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFile {
	pub schema: u32,
	#[serde(default)]
	pub records: Vec<HistoryRecord>,
}

impl Default for HistoryFile {
	fn default() -> Self {
		Self {
			schema: HISTORY_SCHEMA_VERSION,
			records: Vec::new(),
		}
	}
}

#[derive(Debug)]
pub struct JsonHistoryStore {
	path: PathBuf,
	write_lock: Mutex<()>,
}

impl JsonHistoryStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			write_lock: Mutex::new(()),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn io_error(&self, source: std::io::Error) -> StoreError {
		StoreError::Io {
			path: self.path.display().to_string(),
			source,
		}
	}

	fn load(&self) -> StoreResult<HistoryFile> {
		match fs::read_to_string(&self.path) {
			Ok(content) => serde_json::from_str(&content).map_err(|e| StoreError::Invalid(format!("{}: {e}", self.path.display()))),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(HistoryFile::default()),
			Err(e) => Err(self.io_error(e)),
		}
	}

	fn write(&self, file: &HistoryFile) -> StoreResult<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
		}
		let json = serde_json::to_string_pretty(file).map_err(|e| StoreError::Invalid(e.to_string()))?;
		fs::write(&self.path, json).map_err(|e| self.io_error(e))
	}
}

impl HistoryStore for JsonHistoryStore {
	fn records(&self) -> StoreResult<Vec<HistoryRecord>> {
		Ok(self.load()?.records)
	}

	/// Moves the booking's profile to the front, replacing an identical one.
	fn save(&self, booking: &BookingForm, passenger: &PassengerForm, ticket: &TicketInfo) -> StoreResult<()> {
		let record = HistoryRecord::from_forms(booking, passenger).ok_or_else(|| {
			StoreError::Invalid(format!(
				"unknown station in booking form ({} -> {})",
				booking.start_station, booking.dest_station
			))
		})?;

		let _guard = self.write_lock.lock();
		let mut file = self.load()?;
		file.records.retain(|existing| !existing.same_profile(&record));
		file.records.insert(0, record);
		file.records.truncate(MAX_HISTORY_RECORDS);
		self.write(&file)?;

		debug!(target = "thsr.store", ticket = %ticket.id, records = file.records.len(), path = %self.path.display(), "history saved");
		Ok(())
	}
}
