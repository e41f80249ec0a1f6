//! Round and date loops around one booking attempt.

use chrono::NaiveDate;
use thsr_protocol::{BookingForm, PassengerForm};
use tracing::{debug, info, warn};

use super::captcha_gate::{CaptchaGate, GateOutcome};
use super::passenger::PassengerConfirmer;
use super::scheduler::{candidate_dates, configure_snatch_mode};
use super::train_selector::{Selection, SelectionMode, TrainSelector};
use super::{Collaborators, FlowContext, RetryPolicy};
use crate::cancel::CancelToken;
use crate::error::{BookingError, Result};
use crate::events::BookingEvent;
use crate::model::{HistoryRecord, Page, TicketInfo, Train};
use crate::options::{BookingOptions, SnatchMode, remember};

/// Everything known about a completed reservation.
#[derive(Debug, Clone)]
pub struct Booked {
	pub ticket: TicketInfo,
	pub booking: BookingForm,
	pub train: Train,
	pub passenger: PassengerForm,
	pub response: Page,
}

/// Outcome of one date attempt.
#[derive(Debug)]
pub enum AttemptResult {
	Success(Box<Booked>),
	/// Nothing bookable on this date; the raw response when one was received.
	NoTrains(Option<Page>),
	/// Dry run reached the passenger page; polling continues as for `NoTrains`.
	DryRunStopped(Page),
	Fatal(BookingError),
}

/// Outcome of a whole run.
#[derive(Debug)]
pub enum RunOutcome {
	Success(Box<Booked>),
	/// Every date came back empty and no polling interval was set.
	Exhausted,
	/// Dry run ended with at least one date reaching the passenger page.
	DryRunCompleted,
	Fatal(BookingError),
	Cancelled,
}

/// Composes gate, selector and confirmer into the date and round loops.
pub struct BookingOrchestrator {
	ctx: FlowContext,
}

impl BookingOrchestrator {
	pub fn new(deps: Collaborators) -> Self {
		Self {
			ctx: FlowContext::new(deps),
		}
	}

	pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
		self.ctx.policy = policy;
		self
	}

	pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
		self.ctx.cancel = cancel;
		self
	}

	pub fn with_history(mut self, record: Option<HistoryRecord>) -> Self {
		self.ctx.history = record;
		self
	}

	/// Overrides the local date used for range starts and prompt bounds.
	pub fn with_today(mut self, today: NaiveDate) -> Self {
		self.ctx.today = today;
		self
	}

	pub fn context(&self) -> &FlowContext {
		&self.ctx
	}

	/// Runs until a booking succeeds, the dates are exhausted, a fatal error
	/// occurs, or the cancel token fires.
	///
	/// Answers collected along the way are cached into `opts`.
	pub async fn run(&self, opts: &mut BookingOptions) -> RunOutcome {
		match self.drive(opts).await {
			Ok(outcome) => outcome,
			Err(BookingError::Cancelled) => {
				info!(target = "thsr", "run cancelled");
				RunOutcome::Cancelled
			}
			Err(error) => {
				warn!(target = "thsr", %error, "run failed");
				RunOutcome::Fatal(error)
			}
		}
	}

	async fn drive(&self, opts: &mut BookingOptions) -> Result<RunOutcome> {
		configure_snatch_mode(&self.ctx, opts).await?;
		let dates = candidate_dates(opts, self.ctx.today)?;
		let interval = opts.snatch.interval().filter(|_| opts.is_snatch());

		self.ctx.emit(BookingEvent::RunStarted {
			mode: opts.snatch.mode.unwrap_or(SnatchMode::Off),
			dates: dates.iter().flatten().copied().collect(),
			interval,
		});

		let mut dry_run_reached = false;
		let mut round = 1u32;
		loop {
			if round > 1 {
				info!(target = "thsr.schedule", round, "starting round");
				self.ctx.emit(BookingEvent::RoundStarted { round });
			}

			for date in &dates {
				self.ctx.cancel.check()?;
				self.ctx.emit(BookingEvent::DateAttempt { date: date.or(opts.date) });

				match self.attempt_date(opts, *date).await {
					AttemptResult::Success(booked) => {
						info!(target = "thsr", ticket = %booked.ticket.id, "booking completed");
						self.ctx.emit(BookingEvent::Booked { ticket: booked.ticket.clone() });
						return Ok(RunOutcome::Success(booked));
					}
					AttemptResult::NoTrains(_) => {
						let date = date.or(opts.date);
						debug!(target = "thsr.schedule", ?date, "no trains, advancing");
						self.ctx.emit(BookingEvent::NoTrains { date });
					}
					AttemptResult::DryRunStopped(_) => {
						debug!(target = "thsr.schedule", date = ?date.or(opts.date), "dry run stop, advancing");
						dry_run_reached = true;
					}
					AttemptResult::Fatal(error) => return Err(error),
				}
			}

			let Some(wait) = interval else {
				if dry_run_reached {
					return Ok(RunOutcome::DryRunCompleted);
				}
				self.ctx.emit(BookingEvent::SearchExhausted);
				return Ok(RunOutcome::Exhausted);
			};
			self.ctx.emit(BookingEvent::RoundExhausted { round, wait });
			self.ctx.cancel.sleep(wait).await?;
			round += 1;
		}
	}

	/// One pass through the three pages for `date` on a fresh session.
	pub async fn attempt_date(&self, opts: &mut BookingOptions, date: Option<NaiveDate>) -> AttemptResult {
		match self.try_date(opts, date).await {
			Ok(result) => result,
			Err(error) => AttemptResult::Fatal(error),
		}
	}

	async fn try_date(&self, opts: &mut BookingOptions, date: Option<NaiveDate>) -> Result<AttemptResult> {
		let snatch = opts.is_snatch();
		let deps = &self.ctx.deps;
		let mut session = deps.sessions.create()?;

		let pass = match CaptchaGate::new(&self.ctx).run(&mut session, opts, date).await? {
			GateOutcome::Passed(pass) => pass,
			GateOutcome::NoTrains(page) => return Ok(AttemptResult::NoTrains(Some(page))),
		};

		let trains = deps.parser.parse_available_trains(&pass.response);
		if trains.is_empty() {
			if snatch {
				return Ok(AttemptResult::NoTrains(Some(pass.response)));
			}
			return Err(BookingError::NoInventory);
		}

		let selector = TrainSelector::new(&self.ctx);
		if opts.snatch.lock_train && opts.preferred_train.is_none() {
			let picked = selector.ask(&trains).await?.id;
			let locked = *remember(&mut opts.preferred_train, picked);
			info!(target = "thsr", train_id = locked, "target train locked");
			self.ctx.emit(BookingEvent::TrainLocked { train_id: locked });
		}

		let mode = if snatch {
			SelectionMode::Automatic {
				preferred: opts.preferred_train,
			}
		} else {
			SelectionMode::Interactive {
				preferred: opts.preferred_train,
			}
		};
		let train = match selector.select(&trains, mode).await? {
			Selection::Chosen(train) => train.clone(),
			Selection::PreferredTrainUnavailable(_) if snatch => return Ok(AttemptResult::NoTrains(Some(pass.response))),
			Selection::PreferredTrainUnavailable(id) => return Err(BookingError::PreferredTrainUnavailable(id)),
		};

		self.ctx.cancel.check()?;
		let train_response = match selector.submit(&mut session, &train).await {
			Ok((response, _)) => response,
			Err(error) if snatch => {
				warn!(target = "thsr", %error, "train confirmation failed, moving on");
				return Ok(AttemptResult::NoTrains(None));
			}
			Err(error) => return Err(error.into()),
		};
		self.ensure_no_errors(&train_response)?;

		if opts.dry_run {
			info!(target = "thsr", train_id = train.id, "dry run stops before passenger data");
			self.ctx.emit(BookingEvent::DryRunStopped);
			return Ok(AttemptResult::DryRunStopped(train_response));
		}

		let submission = PassengerConfirmer::new(&self.ctx).confirm(&mut session, &train_response, opts).await?;
		self.ensure_no_errors(&submission.response)?;

		let ticket = deps.parser.parse_ticket_info(&submission.response);
		if let Err(error) = deps.history.save(&pass.form, &submission.form, &ticket) {
			warn!(target = "thsr.store", %error, "history not saved");
		}

		Ok(AttemptResult::Success(Box::new(Booked {
			ticket,
			booking: pass.form,
			train,
			passenger: submission.form,
			response: submission.response,
		})))
	}

	fn ensure_no_errors(&self, page: &Page) -> Result<()> {
		let feedback = self.ctx.deps.parser.parse_error_feedback(page);
		if feedback.is_empty() {
			return Ok(());
		}
		let messages = feedback.into_messages();
		self.ctx.emit(BookingEvent::RemoteErrors { messages: messages.clone() });
		Err(BookingError::Remote { messages })
	}
}
