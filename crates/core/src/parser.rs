use crate::error::TransportError;
use crate::model::{BookingPage, ErrorFeedback, Page, PassengerPage, TicketInfo, Train};

/// Extracts structured fields from raw page bodies.
pub trait PageParser: Send + Sync {
	/// Hidden values of the first page; fails when the form is missing.
	fn parse_booking_page(&self, page: &Page) -> Result<BookingPage, TransportError>;

	/// Empty when the page lists no trains.
	fn parse_available_trains(&self, page: &Page) -> Vec<Train>;

	/// Empty when the page shows no errors.
	fn parse_error_feedback(&self, page: &Page) -> ErrorFeedback;

	fn parse_passenger_page(&self, page: &Page) -> PassengerPage;

	/// Missing fields are left empty.
	fn parse_ticket_info(&self, page: &Page) -> TicketInfo;
}
