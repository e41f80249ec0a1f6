//! Error taxonomy of the booking flow.
//!
//! Transient failures ([`TransportError`], captcha rejection, low-confidence
//! declines) are absorbed inside the captcha gate up to its attempt bound.
//! Whatever escapes a component is a [`BookingError`]: either something the
//! scheduler can move past (no inventory) or a terminal failure.

use chrono::NaiveDate;
use thiserror::Error;
use thsr_protocol::FormError;

/// Network or page-shape failure reported by a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
	#[error("request to {url} failed: {message}")]
	Request { url: String, message: String },
	#[error("{url} answered with HTTP {status}")]
	Status { url: String, status: u16 },
	#[error("malformed page: {0}")]
	MalformedPage(String),
}

/// User-supplied configuration that cannot be used as given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("snatch end date {end} is earlier than start date {start}")]
	DateRange { start: NaiveDate, end: NaiveDate },
	#[error("invalid date `{0}`, expected YYYY/MM/DD")]
	Date(String),
	#[error("invalid personal id `{0}`")]
	PersonalId(String),
	#[error("invalid phone number `{0}`, expected 09xxxxxxxx")]
	Phone(String),
	#[error("{field}: {message}")]
	Field { field: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum BookingError {
	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error(transparent)]
	Transport(#[from] TransportError),

	#[error("gave up after {attempts} attempt(s): {last_error}")]
	RetriesExhausted { attempts: u32, last_error: String },

	#[error("captcha rejected on all {attempts} attempt(s): {}", .messages.join("; "))]
	CaptchaExhausted { attempts: u32, messages: Vec<String> },

	#[error("captcha solver declined on all {attempts} attempt(s): {reason}")]
	LowConfidenceExhausted { attempts: u32, reason: String },

	/// The site reported errors that resubmitting will not fix.
	#[error("{}", .messages.join("; "))]
	Remote { messages: Vec<String> },

	#[error("no trains available for the requested journey")]
	NoInventory,

	#[error("train {0} is not offered on the requested date")]
	PreferredTrainUnavailable(u32),

	#[error("invalid state: {0}")]
	InvalidState(String),

	#[error(transparent)]
	Form(#[from] FormError),

	#[error("prompt failed: {0}")]
	Prompt(String),

	#[error("cancelled")]
	Cancelled,
}

impl BookingError {
	/// Messages reported by the site, when this error carries any.
	pub fn remote_messages(&self) -> &[String] {
		match self {
			BookingError::Remote { messages } | BookingError::CaptchaExhausted { messages, .. } => messages,
			_ => &[],
		}
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, BookingError::Cancelled)
	}
}

pub type Result<T, E = BookingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn remote_messages_render_joined() {
		let err = BookingError::Remote {
			messages: vec!["重複訂位".into(), "請洽客服".into()],
		};
		assert_eq!(err.to_string(), "重複訂位; 請洽客服");
		assert_eq!(err.remote_messages().len(), 2);
		assert!(BookingError::NoInventory.remote_messages().is_empty());
	}

	#[test]
	fn validation_converts_into_booking_error() {
		let err: BookingError = ValidationError::Phone("0212".into()).into();
		assert!(matches!(err, BookingError::Validation(ValidationError::Phone(_))));
		assert!(!err.is_cancelled());
	}
}
