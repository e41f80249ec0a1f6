//! Connection to the booking site.

use async_trait::async_trait;
use thsr_protocol::FormParams;

use crate::error::TransportError;
use crate::model::Page;

/// One cookie jar's worth of conversation with the site.
///
/// The site keeps strict per-session state, so calls on one session run in
/// order and a session is discarded after captcha rejections, transport
/// failures, and at the start of every date attempt.
#[async_trait]
pub trait Session: Send {
	async fn fetch_booking_page(&mut self) -> Result<Page, TransportError>;

	/// Downloads the captcha image referenced by `page`.
	async fn fetch_captcha_image(&mut self, page: &Page) -> Result<Vec<u8>, TransportError>;

	async fn submit_booking_form(&mut self, params: &FormParams) -> Result<Page, TransportError>;

	async fn submit_train_selection(&mut self, params: &FormParams) -> Result<Page, TransportError>;

	async fn submit_passenger_info(&mut self, params: &FormParams) -> Result<Page, TransportError>;
}

/// Creates fresh sessions on demand.
pub trait SessionFactory: Send + Sync {
	fn create(&self) -> Result<Box<dyn Session>, TransportError>;
}
