//! Station ids used by the `selectStartStation`/`selectDestinationStation` selects.

use serde::{Deserialize, Serialize};

/// A THSR station, numbered north to south as the booking form expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Station {
	Nangang = 1,
	Taipei = 2,
	Banqiao = 3,
	Taoyuan = 4,
	Hsinchu = 5,
	Miaoli = 6,
	Taichung = 7,
	Changhua = 8,
	Yunlin = 9,
	Chiayi = 10,
	Tainan = 11,
	Zuouing = 12,
}

impl Station {
	/// All stations in form order.
	pub const ALL: [Station; 12] = [
		Station::Nangang,
		Station::Taipei,
		Station::Banqiao,
		Station::Taoyuan,
		Station::Hsinchu,
		Station::Miaoli,
		Station::Taichung,
		Station::Changhua,
		Station::Yunlin,
		Station::Chiayi,
		Station::Tainan,
		Station::Zuouing,
	];

	/// Default origin when nothing else is known.
	pub const DEFAULT_ORIGIN: Station = Station::Taipei;

	/// Default destination when nothing else is known.
	pub const DEFAULT_DESTINATION: Station = Station::Zuouing;

	/// Numeric id posted in the booking form.
	pub fn id(self) -> u8 {
		self as u8
	}

	/// Looks up a station by its form id.
	pub fn from_id(id: u8) -> Option<Self> {
		Self::ALL.get(usize::from(id).checked_sub(1)?).copied()
	}

	/// English name as used by the site's internal enum.
	pub fn name(self) -> &'static str {
		match self {
			Station::Nangang => "Nangang",
			Station::Taipei => "Taipei",
			Station::Banqiao => "Banqiao",
			Station::Taoyuan => "Taoyuan",
			Station::Hsinchu => "Hsinchu",
			Station::Miaoli => "Miaoli",
			Station::Taichung => "Taichung",
			Station::Changhua => "Changhua",
			Station::Yunlin => "Yunlin",
			Station::Chiayi => "Chiayi",
			Station::Tainan => "Tainan",
			Station::Zuouing => "Zuouing",
		}
	}

	/// Traditional Chinese display name.
	pub fn name_zh(self) -> &'static str {
		match self {
			Station::Nangang => "南港",
			Station::Taipei => "台北",
			Station::Banqiao => "板橋",
			Station::Taoyuan => "桃園",
			Station::Hsinchu => "新竹",
			Station::Miaoli => "苗栗",
			Station::Taichung => "台中",
			Station::Changhua => "彰化",
			Station::Yunlin => "雲林",
			Station::Chiayi => "嘉義",
			Station::Tainan => "台南",
			Station::Zuouing => "左營",
		}
	}
}

impl std::fmt::Display for Station {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name_zh())
	}
}

impl From<Station> for u8 {
	fn from(station: Station) -> Self {
		station.id()
	}
}

impl TryFrom<u8> for Station {
	type Error = String;

	fn try_from(id: u8) -> Result<Self, Self::Error> {
		Station::from_id(id).ok_or_else(|| format!("unknown station id: {id}"))
	}
}

impl std::str::FromStr for Station {
	type Err = String;

	/// Accepts a numeric id, an English name, or a Chinese name.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if let Ok(id) = s.parse::<u8>() {
			return Station::try_from(id);
		}
		Station::ALL
			.into_iter()
			.find(|st| st.name().eq_ignore_ascii_case(s) || st.name_zh() == s)
			.ok_or_else(|| format!("unknown station: {s}"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_follow_form_order() {
		assert_eq!(Station::Nangang.id(), 1);
		assert_eq!(Station::Zuouing.id(), 12);
		assert_eq!(Station::from_id(7), Some(Station::Taichung));
		assert_eq!(Station::from_id(0), None);
		assert_eq!(Station::from_id(13), None);
	}

	#[test]
	fn parses_ids_and_names() {
		assert_eq!("2".parse::<Station>(), Ok(Station::Taipei));
		assert_eq!("tainan".parse::<Station>(), Ok(Station::Tainan));
		assert_eq!("左營".parse::<Station>(), Ok(Station::Zuouing));
		assert!("Kaohsiung".parse::<Station>().is_err());
	}

	#[test]
	fn serializes_as_form_id() {
		assert_eq!(serde_json::to_string(&Station::Hsinchu).unwrap(), "5");
		let parsed: Station = serde_json::from_str("11").unwrap();
		assert_eq!(parsed, Station::Tainan);
		assert!(serde_json::from_str::<Station>("42").is_err());
	}
}
