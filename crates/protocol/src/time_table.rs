//! Departure time slots offered by the `toTimeTable` select.
//!
//! Slots are addressed by a 1-based id on the command line and posted as the
//! site's raw token (`"930A"`, `"1200N"`, ...).

/// Raw time-slot tokens in the order the site lists them.
pub const TIME_TABLE: [&str; 38] = [
	"1201A", "1230A", "600A", "630A", "700A", "730A", "800A", "830A", "900A", "930A", "1000A", "1030A", "1100A", "1130A", "1200N", "1230P", "100P",
	"130P", "200P", "230P", "300P", "330P", "400P", "430P", "500P", "530P", "600P", "630P", "700P", "730P", "800P", "830P", "900P", "930P", "1000P",
	"1030P", "1100P", "1130P",
];

/// Slot id offered as the prompt default.
pub const DEFAULT_TIME_ID: usize = 10;

/// Returns the raw token for a 1-based slot id.
pub fn time_token(id: usize) -> Option<&'static str> {
	TIME_TABLE.get(id.checked_sub(1)?).copied()
}

/// Returns the 1-based slot id for a raw token.
pub fn time_id(token: &str) -> Option<usize> {
	TIME_TABLE.iter().position(|t| *t == token).map(|idx| idx + 1)
}

/// Formats a raw token as 24-hour `HH:MM`.
///
/// Returns `None` for tokens that do not follow the `<digits><A|N|P>` shape.
pub fn format_time_token(token: &str) -> Option<String> {
	let (last, _) = token.char_indices().last()?;
	let (digits, suffix) = token.split_at(last);
	let mut value: u32 = digits.parse().ok()?;
	match suffix {
		"A" if value / 100 == 12 => value %= 1200,
		"P" if value != 1230 => value += 1200,
		"A" | "N" | "P" => {}
		_ => return None,
	}
	Some(format!("{:02}:{:02}", value / 100, value % 100))
}
