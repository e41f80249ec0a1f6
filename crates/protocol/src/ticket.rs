//! Ticket-count codes and seat/cabin options of the first booking page.

use serde::{Deserialize, Serialize};

/// Largest ticket count the site accepts per fare type.
pub const MAX_TICKET_NUM: u8 = 10;

/// Fare types; the code letter is appended to the count (`"2F"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketType {
	Adult,
	Child,
	Disabled,
	Elder,
	College,
}

impl TicketType {
	/// Suffix letter the site expects after the count.
	pub fn code(self) -> char {
		match self {
			TicketType::Adult => 'F',
			TicketType::Child => 'H',
			TicketType::Disabled => 'W',
			TicketType::Elder => 'E',
			TicketType::College => 'P',
		}
	}

	/// Chinese display label.
	pub fn label_zh(self) -> &'static str {
		match self {
			TicketType::Adult => "成人",
			TicketType::Child => "孩童",
			TicketType::Disabled => "愛心",
			TicketType::Elder => "敬老",
			TicketType::College => "大學生",
		}
	}

	/// Formats a count as the posted ticket amount.
	pub fn amount(self, count: u8) -> String {
		format!("{count}{}", self.code())
	}

	/// Parses a posted ticket amount back into its count.
	pub fn parse_amount(self, amount: &str) -> Option<u8> {
		amount.strip_suffix(self.code())?.parse().ok()
	}
}

/// Seat preference, posted as the value of the n-th `seatRadioGroup` option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatPreference {
	#[default]
	None,
	Window,
	Aisle,
}

impl SeatPreference {
	/// Position of this preference in the page's option list.
	pub fn index(self) -> usize {
		match self {
			SeatPreference::None => 0,
			SeatPreference::Window => 1,
			SeatPreference::Aisle => 2,
		}
	}

	pub fn from_index(index: usize) -> Option<Self> {
		match index {
			0 => Some(SeatPreference::None),
			1 => Some(SeatPreference::Window),
			2 => Some(SeatPreference::Aisle),
			_ => None,
		}
	}

	pub fn label_zh(self) -> &'static str {
		match self {
			SeatPreference::None => "無偏好",
			SeatPreference::Window => "靠窗",
			SeatPreference::Aisle => "走道",
		}
	}
}

/// Cabin class, posted directly as `trainCon:trainRadioGroup`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
	#[default]
	Standard,
	Business,
}

impl CabinClass {
	pub fn value(self) -> u8 {
		match self {
			CabinClass::Standard => 0,
			CabinClass::Business => 1,
		}
	}

	pub fn from_value(value: u8) -> Option<Self> {
		match value {
			0 => Some(CabinClass::Standard),
			1 => Some(CabinClass::Business),
			_ => None,
		}
	}

	pub fn label_zh(self) -> &'static str {
		match self {
			CabinClass::Standard => "標準車廂",
			CabinClass::Business => "商務車廂",
		}
	}
}
