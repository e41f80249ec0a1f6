use serde::{Deserialize, Serialize};
use thsr::protocol::{Station, format_time_token};
use thsr::{Booked, TicketInfo, Train};

/// Result data for a completed booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingData {
	pub ticket: TicketInfo,
	pub train: Train,
	pub personal_id: String,
	#[serde(skip_serializing_if = "String::is_empty", default)]
	pub phone: String,
}

impl From<&Booked> for BookingData {
	fn from(booked: &Booked) -> Self {
		Self {
			ticket: booked.ticket.clone(),
			train: booked.train.clone(),
			personal_id: booked.passenger.personal_id.clone(),
			phone: booked.passenger.phone_num.clone(),
		}
	}
}

/// One row of `--list-stations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationEntry {
	pub id: u8,
	pub name: String,
	pub name_zh: String,
}

impl From<Station> for StationEntry {
	fn from(station: Station) -> Self {
		Self {
			id: station.id(),
			name: station.name().to_string(),
			name_zh: station.name_zh().to_string(),
		}
	}
}

/// One row of `--list-time-table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
	pub id: usize,
	pub token: String,
	/// 24-hour `HH:MM`.
	pub time: String,
}

impl TimeSlot {
	pub fn new(id: usize, token: &str) -> Self {
		Self {
			id,
			token: token.to_string(),
			time: format_time_token(token).unwrap_or_else(|| token.to_string()),
		}
	}
}

/// Result data for a dry run that reached train confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunData {
	pub dry_run: bool,
}
