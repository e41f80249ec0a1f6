//! Local persistence seams: passenger history and captcha samples.

use thsr_protocol::{BookingForm, PassengerForm};

use crate::model::{HistoryRecord, TicketInfo};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("store I/O failed for {path}: {source}")]
	Io {
		path: String,
		#[source]
		source: std::io::Error,
	},
	#[error("store data is invalid: {0}")]
	Invalid(String),
}

/// Previously used passenger profiles, most recent first.
pub trait HistoryStore: Send + Sync {
	fn records(&self) -> StoreResult<Vec<HistoryRecord>>;

	fn most_recent(&self) -> StoreResult<Option<HistoryRecord>> {
		Ok(self.records()?.into_iter().next())
	}

	/// Records the profile used by a completed booking.
	fn save(&self, booking: &BookingForm, passenger: &PassengerForm, ticket: &TicketInfo) -> StoreResult<()>;
}

/// Captcha images kept for labeling and retraining.
///
/// Callers log failures and carry on; a full disk never aborts a booking.
pub trait SampleStore: Send + Sync {
	/// `label` is the confirmed text, or `None` for a rejected guess.
	fn save(&self, image: &[u8], label: Option<&str>) -> StoreResult<()>;
}

/// Store that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

impl HistoryStore for NoopStore {
	fn records(&self) -> StoreResult<Vec<HistoryRecord>> {
		Ok(Vec::new())
	}

	fn save(&self, _: &BookingForm, _: &PassengerForm, _: &TicketInfo) -> StoreResult<()> {
		Ok(())
	}
}

impl SampleStore for NoopStore {
	fn save(&self, _: &[u8], _: Option<&str>) -> StoreResult<()> {
		Ok(())
	}
}
