//! Booking site URLs.

pub const BASE_URL: &str = "https://irs.thsrc.com.tw";

pub const BOOKING_PAGE_URL: &str = "https://irs.thsrc.com.tw/IMINT/?locale=tw";

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// The three Wicket form listeners, in booking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormListener {
	Booking,
	TrainSelection,
	Passenger,
}

impl FormListener {
	fn interface(self) -> &'static str {
		match self {
			FormListener::Booking => ":0:BookingS1Form::IFormSubmitListener",
			FormListener::TrainSelection => ":1:BookingS2Form::IFormSubmitListener",
			FormListener::Passenger => ":2:BookingS3Form::IFormSubmitListener",
		}
	}

	/// Submit URL bound to the session's `JSESSIONID`.
	pub fn url(self, session_id: &str) -> String {
		format!("{BASE_URL}/IMINT/;jsessionid={session_id}?wicket:interface={}", self.interface())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn submit_urls_carry_session_and_interface() {
		assert_eq!(
			FormListener::Booking.url("ABC123"),
			"https://irs.thsrc.com.tw/IMINT/;jsessionid=ABC123?wicket:interface=:0:BookingS1Form::IFormSubmitListener"
		);
		assert!(FormListener::Passenger.url("x").ends_with(":2:BookingS3Form::IFormSubmitListener"));
	}
}
