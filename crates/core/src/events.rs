//! Progress notifications emitted by the flow for console rendering.

use std::time::Duration;

use chrono::NaiveDate;

use crate::model::{TicketInfo, Train};
use crate::options::SnatchMode;

#[derive(Debug, Clone, PartialEq)]
pub enum BookingEvent {
	RunStarted {
		mode: SnatchMode,
		dates: Vec<NaiveDate>,
		interval: Option<Duration>,
	},
	RoundStarted {
		round: u32,
	},
	DateAttempt {
		date: Option<NaiveDate>,
	},
	CaptchaSolved {
		attempt: u32,
		max_attempts: u32,
		text: String,
	},
	CaptchaRejected {
		attempt: u32,
		max_attempts: u32,
		messages: Vec<String>,
	},
	LowConfidence {
		attempt: u32,
		max_attempts: u32,
		reason: String,
	},
	TransportRetry {
		attempt: u32,
		max_attempts: u32,
		error: String,
	},
	/// The site reported errors; printed verbatim.
	RemoteErrors {
		messages: Vec<String>,
	},
	TrainsListed {
		trains: Vec<Train>,
	},
	TrainSelected {
		train: Train,
	},
	TrainLocked {
		train_id: u32,
	},
	PreferredTrainMissing {
		train_id: u32,
	},
	NoTrains {
		date: Option<NaiveDate>,
	},
	MembershipFallback,
	DryRunStopped,
	RoundExhausted {
		round: u32,
		wait: Duration,
	},
	SearchExhausted,
	Booked {
		ticket: TicketInfo,
	},
}

pub trait EventSink: Send + Sync {
	fn emit(&self, event: &BookingEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
	fn emit(&self, _: &BookingEvent) {}
}
