//! Bounded retry loop around the captcha-protected first page.

use chrono::NaiveDate;
use thsr_protocol::{BookingForm, FormParams};
use tracing::{debug, info, warn};

use super::FlowContext;
use super::journey::{Journey, resolve_journey};
use crate::captcha::CaptchaAnswer;
use crate::error::{BookingError, Result};
use crate::events::BookingEvent;
use crate::model::{BookingPage, Page};
use crate::options::BookingOptions;
use crate::session::Session;

/// First page accepted without errors.
#[derive(Debug, Clone)]
pub struct GatePass {
	pub response: Page,
	pub form: BookingForm,
	pub journey: Journey,
}

#[derive(Debug, Clone)]
pub enum GateOutcome {
	Passed(GatePass),
	/// Sold out while polling; the scheduler moves to the next date.
	NoTrains(Page),
}

pub struct CaptchaGate<'a> {
	ctx: &'a FlowContext,
}

impl<'a> CaptchaGate<'a> {
	pub fn new(ctx: &'a FlowContext) -> Self {
		Self { ctx }
	}

	/// Drives the first page until it is accepted or the attempt bound is hit.
	///
	/// `session` is replaced with a fresh one whenever the loop rotates.
	/// Resolved journey parameters are recorded into `opts` on every pass;
	/// fields already set stay untouched.
	pub async fn run(&self, session: &mut Box<dyn Session>, opts: &mut BookingOptions, date_override: Option<NaiveDate>) -> Result<GateOutcome> {
		let max_attempts = self.ctx.policy.max_attempts(opts.auto_captcha);

		for attempt in 1..=max_attempts {
			let (image, booking_page) = match self.fetch(session).await {
				Ok(fetched) => fetched,
				Err(error) => {
					self.recover(session, attempt, max_attempts, error).await?;
					continue;
				}
			};

			let journey = resolve_journey(self.ctx, opts, date_override).await?;
			journey.record_into(opts);

			self.ctx.cancel.check()?;
			let answer = tokio::select! {
				answer = self.ctx.deps.solver.solve(&image) => answer,
				_ = self.ctx.cancel.cancelled() => return Err(BookingError::Cancelled),
			};
			let code = match answer {
				Ok(CaptchaAnswer::Solved(text)) => text,
				Ok(CaptchaAnswer::LowConfidence(reason)) => {
					debug!(target = "thsr.gate", attempt, %reason, "captcha solver declined");
					if attempt == max_attempts {
						return Err(BookingError::LowConfidenceExhausted {
							attempts: max_attempts,
							reason,
						});
					}
					self.ctx.emit(BookingEvent::LowConfidence {
						attempt,
						max_attempts,
						reason,
					});
					*session = self.ctx.deps.sessions.create()?;
					continue;
				}
				Err(error) => {
					self.recover(session, attempt, max_attempts, error.to_string()).await?;
					continue;
				}
			};
			self.ctx.emit(BookingEvent::CaptchaSolved {
				attempt,
				max_attempts,
				text: code.clone(),
			});

			let form = match journey.to_form(&booking_page, &code) {
				Ok(form) => form,
				Err(error) => {
					self.recover(session, attempt, max_attempts, error.to_string()).await?;
					continue;
				}
			};
			let params = FormParams::from_model(&form)?;

			self.ctx.cancel.check()?;
			let response = match session.submit_booking_form(&params).await {
				Ok(response) => response,
				Err(error) => {
					self.recover(session, attempt, max_attempts, error.to_string()).await?;
					continue;
				}
			};

			let feedback = self.ctx.deps.parser.parse_error_feedback(&response);
			if feedback.is_empty() {
				info!(target = "thsr.gate", attempt, date = %form.outbound_date, "first page accepted");
				self.save_sample(&image, Some(&code));
				return Ok(GateOutcome::Passed(GatePass { response, form, journey }));
			}

			if feedback.is_captcha_rejected() {
				self.save_sample(&image, None);
				let messages = feedback.into_messages();
				warn!(target = "thsr.gate", attempt, max_attempts, ?messages, "captcha rejected");
				if attempt == max_attempts {
					self.ctx.emit(BookingEvent::RemoteErrors { messages: messages.clone() });
					return Err(BookingError::CaptchaExhausted {
						attempts: max_attempts,
						messages,
					});
				}
				self.ctx.emit(BookingEvent::CaptchaRejected {
					attempt,
					max_attempts,
					messages,
				});
				*session = self.ctx.deps.sessions.create()?;
				self.ctx.cancel.sleep(self.ctx.policy.captcha_backoff).await?;
				continue;
			}

			if opts.is_snatch() && feedback.is_no_inventory() {
				debug!(target = "thsr.gate", date = %form.outbound_date, "sold out");
				return Ok(GateOutcome::NoTrains(response));
			}

			let messages = feedback.into_messages();
			self.ctx.emit(BookingEvent::RemoteErrors { messages: messages.clone() });
			return Err(BookingError::Remote { messages });
		}

		Err(BookingError::InvalidState("captcha gate allows no attempts".to_string()))
	}

	async fn fetch(&self, session: &mut Box<dyn Session>) -> Result<(Vec<u8>, BookingPage), String> {
		let page = session.fetch_booking_page().await.map_err(|e| e.to_string())?;
		let image = session.fetch_captcha_image(&page).await.map_err(|e| e.to_string())?;
		let booking_page = self.ctx.deps.parser.parse_booking_page(&page).map_err(|e| e.to_string())?;
		Ok((image, booking_page))
	}

	/// Rotates the session and backs off, or gives up on the last attempt.
	async fn recover(&self, session: &mut Box<dyn Session>, attempt: u32, max_attempts: u32, error: String) -> Result<()> {
		warn!(target = "thsr.gate", attempt, max_attempts, %error, "attempt failed");
		if attempt == max_attempts {
			return Err(BookingError::RetriesExhausted {
				attempts: max_attempts,
				last_error: error,
			});
		}
		self.ctx.emit(BookingEvent::TransportRetry {
			attempt,
			max_attempts,
			error,
		});
		*session = self.ctx.deps.sessions.create()?;
		self.ctx.cancel.sleep(self.ctx.policy.transport_backoff).await
	}

	fn save_sample(&self, image: &[u8], label: Option<&str>) {
		if let Err(error) = self.ctx.deps.samples.save(image, label) {
			warn!(target = "thsr.store", %error, "captcha sample not saved");
		}
	}
}
