use thsr::protocol::{Station, TIME_TABLE};

use crate::output::{OutputFormat, ResultBuilder, StationEntry, TimeSlot, print_result};

pub fn station_entries() -> Vec<StationEntry> {
	Station::ALL.into_iter().map(StationEntry::from).collect()
}

pub fn time_slots() -> Vec<TimeSlot> {
	TIME_TABLE.iter().enumerate().map(|(idx, token)| TimeSlot::new(idx + 1, token)).collect()
}

pub fn stations(format: OutputFormat) {
	let entries = station_entries();
	if format.is_text() {
		for entry in &entries {
			println!("{:>2}  {}  {}", entry.id, entry.name_zh, entry.name);
		}
		return;
	}
	print_result(&ResultBuilder::new("stations").data(entries).build(), format);
}

pub fn time_table(format: OutputFormat) {
	let slots = time_slots();
	if format.is_text() {
		for slot in &slots {
			println!("{:>2}  {}", slot.id, slot.time);
		}
		return;
	}
	print_result(&ResultBuilder::new("time-table").data(slots).build(), format);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_station_and_slot_is_listed_in_order() {
		let stations = station_entries();
		assert_eq!(stations.len(), 12);
		assert_eq!(stations[0].name, "Nangang");
		assert_eq!(stations[11].name_zh, "左營");

		let slots = time_slots();
		assert_eq!(slots.len(), TIME_TABLE.len());
		assert_eq!(slots[9].id, 10);
		assert_eq!(slots[9].time, "09:30");
		assert_eq!(slots[37].time, "23:30");
	}
}
