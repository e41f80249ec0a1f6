//! The booking state machine.
//!
//! [`BookingOrchestrator`] sweeps candidate dates round after round; each date
//! attempt runs [`CaptchaGate`], [`TrainSelector`] and [`PassengerConfirmer`]
//! in that order on a fresh session.

mod captcha_gate;
mod journey;
mod orchestrator;
mod passenger;
mod scheduler;
mod train_selector;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

pub use captcha_gate::{CaptchaGate, GateOutcome, GatePass};
pub use journey::{Journey, resolve_journey};
pub use orchestrator::{AttemptResult, Booked, BookingOrchestrator, RunOutcome};
pub use passenger::{PassengerConfirmer, PassengerSubmission};
pub use scheduler::{candidate_dates, configure_snatch_mode, date_range, snatch_end_limit};
pub use train_selector::{Selection, SelectionMode, TrainSelector};

use crate::cancel::CancelToken;
use crate::captcha::CaptchaSolver;
use crate::events::{BookingEvent, EventSink};
use crate::model::HistoryRecord;
use crate::parser::PageParser;
use crate::prompt::{FieldResolver, Prompter};
use crate::session::SessionFactory;
use crate::store::{HistoryStore, SampleStore};

/// Attempt bound and backoffs of the captcha gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_captcha_attempts: u32,
	/// Wait after a rejected captcha.
	pub captcha_backoff: Duration,
	/// Wait after a transport failure.
	pub transport_backoff: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_captcha_attempts: 30,
			captcha_backoff: Duration::from_secs(1),
			transport_backoff: Duration::from_secs(2),
		}
	}
}

impl RetryPolicy {
	/// Same bound, no waiting.
	pub fn immediate() -> Self {
		Self {
			captcha_backoff: Duration::ZERO,
			transport_backoff: Duration::ZERO,
			..Self::default()
		}
	}

	/// A human-entered captcha is never retried automatically.
	pub fn max_attempts(&self, auto_captcha: bool) -> u32 {
		if auto_captcha { self.max_captcha_attempts } else { 1 }
	}
}

/// External collaborators of the flow.
#[derive(Clone)]
pub struct Collaborators {
	pub sessions: Arc<dyn SessionFactory>,
	pub parser: Arc<dyn PageParser>,
	pub solver: Arc<dyn CaptchaSolver>,
	pub prompter: Arc<dyn Prompter>,
	pub events: Arc<dyn EventSink>,
	pub samples: Arc<dyn SampleStore>,
	pub history: Arc<dyn HistoryStore>,
}

/// Everything a flow component reads while running one attempt.
pub struct FlowContext {
	pub deps: Collaborators,
	pub policy: RetryPolicy,
	pub cancel: CancelToken,
	/// Profile picked at startup, consulted for defaults.
	pub history: Option<HistoryRecord>,
	pub today: NaiveDate,
}

impl FlowContext {
	pub fn new(deps: Collaborators) -> Self {
		Self {
			deps,
			policy: RetryPolicy::default(),
			cancel: CancelToken::new(),
			history: None,
			today: chrono::Local::now().date_naive(),
		}
	}

	pub fn resolver(&self) -> FieldResolver<'_> {
		FieldResolver::new(self.deps.prompter.as_ref(), &self.cancel)
	}

	pub fn emit(&self, event: BookingEvent) {
		self.deps.events.emit(&event);
	}
}
