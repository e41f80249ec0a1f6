//! Structured views of the site's pages and of a completed booking.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thsr_protocol::{BookingForm, PassengerForm, Station};

/// Substring the site uses in captcha rejection messages.
pub const CAPTCHA_REJECTED_MARKER: &str = "檢測碼";
/// Substring of the "no trains found" message.
pub const NO_INVENTORY_MARKER: &str = "查無";
/// Substring of membership-credential errors.
pub const MEMBERSHIP_INVALID_MARKER: &str = "TGo";

/// A fetched page or form-submission response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
	pub url: String,
	pub body: Vec<u8>,
}

impl Page {
	pub fn new(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
		Self {
			url: url.into(),
			body: body.into(),
		}
	}

	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}
}

/// One bookable service listed after the first page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Train {
	pub id: u32,
	pub departure: String,
	pub arrival: String,
	pub travel_time: String,
	pub discount: String,
	/// Opaque radio value echoed back when selecting this train.
	pub form_value: String,
}

/// Error messages shown by a response, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorFeedback {
	messages: Vec<String>,
}

impl ErrorFeedback {
	pub fn new(messages: Vec<String>) -> Self {
		Self { messages }
	}

	pub fn is_empty(&self) -> bool {
		self.messages.is_empty()
	}

	pub fn messages(&self) -> &[String] {
		&self.messages
	}

	pub fn into_messages(self) -> Vec<String> {
		self.messages
	}

	fn any_contains(&self, marker: &str) -> bool {
		self.messages.iter().any(|m| m.contains(marker))
	}

	pub fn is_captcha_rejected(&self) -> bool {
		self.any_contains(CAPTCHA_REJECTED_MARKER)
	}

	pub fn is_no_inventory(&self) -> bool {
		self.any_contains(NO_INVENTORY_MARKER)
	}

	pub fn is_membership_invalid(&self) -> bool {
		self.any_contains(MEMBERSHIP_INVALID_MARKER)
	}
}

/// Hidden values of the first page needed to build [`thsr_protocol::BookingForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPage {
	/// `seatRadioGroup` option values in page order.
	pub seat_options: Vec<String>,
	pub types_of_trip: u8,
	pub search_by: String,
}

/// Inputs of the passenger page that vary between responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassengerPage {
	pub member_radio: Option<String>,
	pub non_member_radio: Option<String>,
	pub early_bird: Option<EarlyBirdForm>,
}

/// Per-passenger id rows required for early-bird fares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarlyBirdForm {
	pub passenger_count: usize,
	pub type_name: String,
}

/// Reservation summary shown on the final page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketInfo {
	pub id: String,
	pub payment_deadline: String,
	pub total_price: String,
	pub date: String,
	pub start_station: String,
	pub dest_station: String,
	pub departure: String,
	pub arrival: String,
	pub train_id: String,
	pub seat_class: String,
	pub seats: Vec<String>,
}

/// A previously used passenger profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
	pub personal_id: String,
	#[serde(default)]
	pub phone: String,
	pub start_station: Station,
	pub dest_station: Station,
	/// Raw time-table token, e.g. `"930A"`.
	pub outbound_time: String,
	/// Posted adult amount, e.g. `"1F"`.
	pub adult_num: String,
}

impl HistoryRecord {
	/// Profile of a completed booking; `None` when the form names an unknown station.
	pub fn from_forms(booking: &BookingForm, passenger: &PassengerForm) -> Option<Self> {
		Some(Self {
			personal_id: passenger.personal_id.clone(),
			phone: passenger.phone_num.clone(),
			start_station: Station::from_id(booking.start_station)?,
			dest_station: Station::from_id(booking.dest_station)?,
			outbound_time: booking.outbound_time.clone(),
			adult_num: booking.adult_ticket_num.clone(),
		})
	}

	/// Same passenger and journey, ignoring phone.
	pub fn same_profile(&self, other: &HistoryRecord) -> bool {
		self.personal_id == other.personal_id
			&& self.start_station == other.start_station
			&& self.dest_station == other.dest_station
			&& self.outbound_time == other.outbound_time
			&& self.adult_num == other.adult_num
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_feedback_by_marker() {
		let captcha = ErrorFeedback::new(vec!["檢測碼輸入錯誤，請確認後重新輸入".into()]);
		assert!(captcha.is_captcha_rejected());
		assert!(!captcha.is_no_inventory());

		let sold_out = ErrorFeedback::new(vec!["去程查無可售車次或選購的車票已售完".into()]);
		assert!(sold_out.is_no_inventory());
		assert!(!sold_out.is_captcha_rejected());

		let member = ErrorFeedback::new(vec!["TGo帳號無效".into()]);
		assert!(member.is_membership_invalid());
		assert!(ErrorFeedback::default().is_empty());
	}

	#[test]
	fn history_record_round_trips_station_ids() {
		let record = HistoryRecord {
			personal_id: "A123456789".into(),
			phone: String::new(),
			start_station: Station::Taipei,
			dest_station: Station::Tainan,
			outbound_time: "930A".into(),
			adult_num: "1F".into(),
		};
		let json = serde_json::to_value(&record).unwrap();
		assert_eq!(json["startStation"], 2);
		let back: HistoryRecord = serde_json::from_value(json).unwrap();
		assert_eq!(back, record);
	}
}
