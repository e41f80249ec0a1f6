//! Input checks for passenger identity, phone numbers and dates.

use chrono::NaiveDate;

use crate::error::ValidationError;

/// Date format used by the booking form and accepted from users.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Two-digit codes the national id checksum assigns to the leading letter.
fn letter_code(letter: char) -> Option<u32> {
	let code = match letter {
		'A' => 10,
		'B' => 11,
		'C' => 12,
		'D' => 13,
		'E' => 14,
		'F' => 15,
		'G' => 16,
		'H' => 17,
		'I' => 34,
		'J' => 18,
		'K' => 19,
		'L' => 20,
		'M' => 21,
		'N' => 22,
		'O' => 35,
		'P' => 23,
		'Q' => 24,
		'R' => 25,
		'S' => 26,
		'T' => 27,
		'U' => 28,
		'V' => 29,
		'W' => 32,
		'X' => 30,
		'Y' => 31,
		'Z' => 33,
		_ => return None,
	};
	Some(code)
}

/// Checks shape (`[A-Z]\d{9}`) first, then the weighted checksum.
pub fn is_valid_personal_id(id: &str) -> bool {
	let mut chars = id.chars();
	let Some(letter) = chars.next() else {
		return false;
	};
	let digits: Vec<u32> = chars.map_while(|c| c.to_digit(10)).collect();
	if digits.len() != 9 || id.chars().count() != 10 {
		return false;
	}
	let Some(code) = letter_code(letter) else {
		return false;
	};

	let mut sum = code / 10 + (code % 10) * 9;
	for (digit, weight) in digits[..8].iter().zip((1..=8).rev()) {
		sum += digit * weight;
	}
	sum += digits[8];
	sum % 10 == 0
}

pub fn validate_personal_id(id: &str) -> Result<String, ValidationError> {
	let id = id.trim();
	if is_valid_personal_id(id) {
		Ok(id.to_string())
	} else {
		Err(ValidationError::PersonalId(id.to_string()))
	}
}

/// Empty is allowed; otherwise ten digits starting with `09`.
pub fn validate_phone(phone: &str) -> Result<String, ValidationError> {
	let phone = phone.trim();
	let ok = phone.is_empty() || (phone.len() == 10 && phone.starts_with("09") && phone.bytes().all(|b| b.is_ascii_digit()));
	if ok { Ok(phone.to_string()) } else { Err(ValidationError::Phone(phone.to_string())) }
}

/// Parses `YYYY/MM/DD`, also accepting `YYYY-MM-DD`.
pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
	let input = input.trim();
	NaiveDate::parse_from_str(input, DATE_FORMAT)
		.or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
		.map_err(|_| ValidationError::Date(input.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
	date.format(DATE_FORMAT).to_string()
}
