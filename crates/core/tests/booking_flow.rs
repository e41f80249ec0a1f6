use std::time::Duration;

use chrono::NaiveDate;
use thsr::fake::{self, Harness, Step};
use thsr::protocol::{CabinClass, SeatPreference, Station};
use thsr::{
	BookingError, BookingEvent, BookingOptions, CaptchaAnswer, RetryPolicy, RunOutcome, SnatchMode, SnatchOptions, TransportError, ValidationError,
};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
	NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Options that answer every question without prompting, except train choice.
fn configured(mode: SnatchMode) -> BookingOptions {
	BookingOptions {
		from_station: Some(Station::Taipei),
		to_station: Some(Station::Zuouing),
		date: Some(ymd(2025, 5, 1)),
		time_id: Some(10),
		adult_count: Some(1),
		student_count: Some(0),
		seat_prefer: Some(SeatPreference::None),
		class_type: Some(CabinClass::Standard),
		personal_id: Some("A123456789".to_string()),
		phone: Some(String::new()),
		use_membership: Some(false),
		snatch: SnatchOptions {
			mode: Some(mode),
			..SnatchOptions::default()
		},
		..BookingOptions::default()
	}
}

fn transport_error() -> TransportError {
	TransportError::Request {
		url: fake::FAKE_URL.to_string(),
		message: "connection reset".to_string(),
	}
}

#[tokio::test]
async fn single_date_success_calls_each_endpoint_once() {
	let harness = Harness::new();
	harness.site.push(Step::BookingForm, Ok(fake::trains_page(&[601])));
	harness.site.push(Step::TrainSelection, Ok(fake::page("")));
	harness.site.push(Step::PassengerInfo, Ok(fake::ticket_page("09012345")));
	harness.prompter.push("1");

	let mut opts = configured(SnatchMode::Off);
	let outcome = harness.orchestrator().run(&mut opts).await;

	let RunOutcome::Success(booked) = outcome else {
		panic!("expected success, got {outcome:?}");
	};
	assert_eq!(booked.ticket.id, "09012345");
	assert_eq!(booked.train.id, 601);
	assert_eq!(harness.site.calls(Step::BookingForm), 1);
	assert_eq!(harness.site.calls(Step::TrainSelection), 1);
	assert_eq!(harness.site.calls(Step::PassengerInfo), 1);

	let train_params = harness.site.params(Step::TrainSelection);
	assert_eq!(train_params[0].get("TrainQueryDataViewPanel:TrainGroup"), Some("radio601"));
	let passenger_params = harness.site.params(Step::PassengerInfo);
	assert_eq!(passenger_params[0].get("dummyId"), Some("A123456789"));
	assert_eq!(
		passenger_params[0].get("TicketMemberSystemInputPanel:TakerMemberSystemDataView:memberSystemRadioGroup"),
		Some("memberSystemRadio3")
	);

	assert_eq!(harness.samples.labels(), [Some("K7NQ".to_string())]);
	assert_eq!(harness.history.most_recent_station(), Some(Station::Taipei));
	assert_eq!(harness.events.count(|e| matches!(e, BookingEvent::Booked { .. })), 1);
}

#[tokio::test]
async fn thirty_captcha_rejections_are_fatal() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::error_page(fake::CAPTCHA_REJECTED)));

	let mut opts = configured(SnatchMode::Off);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(
		matches!(outcome, RunOutcome::Fatal(BookingError::CaptchaExhausted { attempts: 30, .. })),
		"{outcome:?}"
	);
	assert_eq!(harness.site.calls(Step::BookingForm), 30);
	assert_eq!(harness.site.calls(Step::TrainSelection), 0);
	assert_eq!(harness.site.calls(Step::PassengerInfo), 0);
	assert_eq!(harness.site.sessions_created(), 30);
	assert_eq!(harness.samples.labels(), vec![None::<String>; 30]);
}

#[tokio::test]
async fn manual_captcha_is_tried_once() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::error_page(fake::CAPTCHA_REJECTED)));

	let mut opts = configured(SnatchMode::Off).with_auto_captcha(false);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Fatal(BookingError::CaptchaExhausted { attempts: 1, .. })));
	assert_eq!(harness.site.calls(Step::BookingForm), 1);
}

#[tokio::test]
async fn low_confidence_skips_without_submitting() {
	let harness = Harness::new();
	harness.solver.push(Ok(CaptchaAnswer::LowConfidence("blurry".into())));
	harness.solver.push(Ok(CaptchaAnswer::LowConfidence("blurry".into())));
	harness.site.push(Step::BookingForm, Ok(fake::trains_page(&[601])));
	harness.site.push(Step::TrainSelection, Ok(fake::page("")));
	harness.site.push(Step::PassengerInfo, Ok(fake::ticket_page("1")));

	let mut opts = configured(SnatchMode::Off);
	opts.preferred_train = Some(601);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Success(_)), "{outcome:?}");
	assert_eq!(harness.solver.calls(), 3);
	assert_eq!(harness.site.calls(Step::BookingForm), 1);
	assert_eq!(harness.site.sessions_created(), 3);
	assert_eq!(harness.events.count(|e| matches!(e, BookingEvent::LowConfidence { .. })), 2);
	assert_eq!(harness.samples.labels().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn gate_waits_after_rejects_and_transport_failures_only() {
	let harness = Harness::new();
	harness.solver.push(Ok(CaptchaAnswer::LowConfidence("blurry".into())));
	harness.site.push(Step::BookingForm, Ok(fake::error_page(fake::CAPTCHA_REJECTED)));
	harness.site.push(Step::BookingForm, Err(transport_error()));
	harness.site.push(Step::BookingForm, Err(transport_error()));
	harness.site.push(Step::BookingForm, Ok(fake::trains_page(&[601])));
	harness.site.push(Step::TrainSelection, Ok(fake::page("")));
	harness.site.push(Step::PassengerInfo, Ok(fake::ticket_page("1")));

	let mut opts = configured(SnatchMode::Off);
	opts.preferred_train = Some(601);
	let started = tokio::time::Instant::now();
	let outcome = harness.orchestrator().with_policy(RetryPolicy::default()).run(&mut opts).await;
	let elapsed = started.elapsed();

	assert!(matches!(outcome, RunOutcome::Success(_)), "{outcome:?}");
	assert_eq!(harness.solver.calls(), 5);
	// one captcha backoff (1s) plus two transport backoffs (2s each)
	assert!(elapsed >= Duration::from_secs(5), "{elapsed:?}");
	assert!(elapsed < Duration::from_millis(5_100), "{elapsed:?}");
}

#[tokio::test]
async fn transport_failure_rotates_and_retries() {
	let harness = Harness::new();
	harness.site.push(Step::BookingForm, Err(transport_error()));
	harness.site.push(Step::BookingForm, Ok(fake::trains_page(&[601])));
	harness.site.push(Step::TrainSelection, Ok(fake::page("")));
	harness.site.push(Step::PassengerInfo, Ok(fake::ticket_page("1")));

	let mut opts = configured(SnatchMode::Off);
	opts.preferred_train = Some(601);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Success(_)), "{outcome:?}");
	assert_eq!(harness.site.calls(Step::BookingForm), 2);
	assert_eq!(harness.site.sessions_created(), 2);
	assert_eq!(harness.events.count(|e| matches!(e, BookingEvent::TransportRetry { .. })), 1);
}

#[tokio::test]
async fn persistent_transport_failure_exhausts_the_gate() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingPage, Err(transport_error()));

	let mut opts = configured(SnatchMode::Off);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Fatal(BookingError::RetriesExhausted { attempts: 30, .. })), "{outcome:?}");
	assert_eq!(harness.site.calls(Step::BookingPage), 30);
	assert_eq!(harness.site.calls(Step::BookingForm), 0);
}

#[tokio::test]
async fn sold_out_is_fatal_outside_snatch_mode() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::error_page(fake::SOLD_OUT)));

	let mut opts = configured(SnatchMode::Off);
	let outcome = harness.orchestrator().run(&mut opts).await;

	let RunOutcome::Fatal(error) = outcome else {
		panic!("expected fatal, got {outcome:?}");
	};
	assert_eq!(error.remote_messages(), [fake::SOLD_OUT.to_string()]);
	assert_eq!(harness.site.calls(Step::BookingForm), 1);
}

#[tokio::test]
async fn other_remote_errors_are_fatal_even_when_polling() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::error_page("您已重複訂位")));

	let mut opts = configured(SnatchMode::SingleDay).with_interval(30);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Fatal(BookingError::Remote { .. })), "{outcome:?}");
	assert_eq!(harness.site.calls(Step::BookingForm), 1);
}

#[tokio::test]
async fn single_day_snatch_without_interval_is_exhausted() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::error_page(fake::SOLD_OUT)));

	let mut opts = configured(SnatchMode::SingleDay);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Exhausted), "{outcome:?}");
	assert_eq!(harness.site.calls(Step::BookingForm), 1);
	assert_eq!(harness.events.count(|e| matches!(e, BookingEvent::SearchExhausted)), 1);
}

#[tokio::test]
async fn range_mode_sweeps_every_date_on_fresh_sessions() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::error_page(fake::SOLD_OUT)));

	let mut opts = configured(SnatchMode::DateRange { end: ymd(2025, 5, 3) });
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Exhausted), "{outcome:?}");
	let dates: Vec<String> = harness
		.site
		.params(Step::BookingForm)
		.iter()
		.map(|p| p.get("toTimeInputField").unwrap_or_default().to_string())
		.collect();
	assert_eq!(dates, ["2025/05/01", "2025/05/02", "2025/05/03"]);
	assert_eq!(harness.site.sessions_created(), 3);
	assert_eq!(opts.date, Some(ymd(2025, 5, 1)));
}

#[tokio::test]
async fn range_mode_books_first_date_with_trains() {
	let harness = Harness::new();
	harness.site.push(Step::BookingForm, Ok(fake::error_page(fake::SOLD_OUT)));
	harness.site.push(Step::BookingForm, Ok(fake::trains_page(&[803, 805])));
	harness.site.push(Step::TrainSelection, Ok(fake::page("")));
	harness.site.push(Step::PassengerInfo, Ok(fake::ticket_page("77")));

	let mut opts = configured(SnatchMode::DateRange { end: ymd(2025, 5, 3) });
	let outcome = harness.orchestrator().run(&mut opts).await;

	let RunOutcome::Success(booked) = outcome else {
		panic!("expected success, got {outcome:?}");
	};
	assert_eq!(booked.booking.outbound_date, "2025/05/02");
	assert_eq!(booked.train.id, 803);
	assert_eq!(harness.site.calls(Step::BookingForm), 2);
	assert!(harness.prompter.asked().is_empty());
}

#[tokio::test]
async fn reversed_range_fails_before_any_request() {
	let harness = Harness::new();

	let mut opts = configured(SnatchMode::DateRange { end: ymd(2025, 4, 28) });
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(
		matches!(outcome, RunOutcome::Fatal(BookingError::Validation(ValidationError::DateRange { .. }))),
		"{outcome:?}"
	);
	assert_eq!(harness.site.sessions_created(), 0);
}

#[tokio::test]
async fn polling_restarts_rounds_until_cancelled() {
	let mut harness = Harness::new();
	harness.events = std::sync::Arc::new(
		thsr::fake::RecordingSink::new().cancel_on(harness.cancel.clone(), |e| matches!(e, BookingEvent::RoundExhausted { round: 2, .. })),
	);
	harness.site.respond_always(Step::BookingForm, Ok(fake::error_page(fake::SOLD_OUT)));

	let mut opts = configured(SnatchMode::SingleDay).with_interval(1);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Cancelled), "{outcome:?}");
	assert_eq!(harness.site.calls(Step::BookingForm), 2);
	assert_eq!(harness.events.count(|e| matches!(e, BookingEvent::RoundStarted { round: 2 })), 1);
}

#[tokio::test]
async fn cancelled_run_makes_no_requests() {
	let harness = Harness::new();
	harness.cancel.cancel();

	let mut opts = configured(SnatchMode::Off);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Cancelled), "{outcome:?}");
	assert_eq!(harness.site.sessions_created(), 0);
}

#[tokio::test]
async fn dry_run_stops_after_train_confirmation() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::trains_page(&[601])));
	harness.site.respond_always(Step::TrainSelection, Ok(fake::page("")));

	let mut opts = configured(SnatchMode::SingleDay).with_dry_run(true);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::DryRunCompleted), "{outcome:?}");
	assert_eq!(harness.site.calls(Step::TrainSelection), 1);
	assert_eq!(harness.site.calls(Step::PassengerInfo), 0);
	assert_eq!(harness.events.count(|e| matches!(e, BookingEvent::DryRunStopped)), 1);
	assert_eq!(harness.events.count(|e| matches!(e, BookingEvent::SearchExhausted)), 0);
}

#[tokio::test]
async fn sold_out_dry_run_is_exhausted() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::error_page(fake::SOLD_OUT)));

	let mut opts = configured(SnatchMode::SingleDay).with_dry_run(true);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Exhausted), "{outcome:?}");
	assert_eq!(harness.site.calls(Step::TrainSelection), 0);
	assert_eq!(harness.events.count(|e| matches!(e, BookingEvent::DryRunStopped)), 0);
	assert_eq!(harness.events.count(|e| matches!(e, BookingEvent::SearchExhausted)), 1);
}

#[tokio::test]
async fn missing_preferred_train_is_fatal_outside_snatch_mode() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::trains_page(&[601, 620])));

	let mut opts = configured(SnatchMode::Off);
	opts.preferred_train = Some(611);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Fatal(BookingError::PreferredTrainUnavailable(611))), "{outcome:?}");
	assert_eq!(harness.site.calls(Step::TrainSelection), 0);
}

#[tokio::test]
async fn missing_preferred_train_advances_in_snatch_mode() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::trains_page(&[601, 620])));

	let mut opts = configured(SnatchMode::DateRange { end: ymd(2025, 5, 2) });
	opts.preferred_train = Some(611);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Exhausted), "{outcome:?}");
	assert_eq!(harness.site.calls(Step::BookingForm), 2);
	assert_eq!(harness.site.calls(Step::TrainSelection), 0);
}

#[tokio::test]
async fn empty_train_list_depends_on_mode() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::page("")));
	let mut opts = configured(SnatchMode::Off);
	let outcome = harness.orchestrator().run(&mut opts).await;
	assert!(matches!(outcome, RunOutcome::Fatal(BookingError::NoInventory)), "{outcome:?}");

	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::page("")));
	let mut opts = configured(SnatchMode::SingleDay);
	let outcome = harness.orchestrator().run(&mut opts).await;
	assert!(matches!(outcome, RunOutcome::Exhausted), "{outcome:?}");
}

#[tokio::test]
async fn train_confirmation_failure_depends_on_mode() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::trains_page(&[601])));
	harness.site.respond_always(Step::TrainSelection, Err(transport_error()));
	let mut opts = configured(SnatchMode::SingleDay);
	let outcome = harness.orchestrator().run(&mut opts).await;
	assert!(matches!(outcome, RunOutcome::Exhausted), "{outcome:?}");

	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::trains_page(&[601])));
	harness.site.respond_always(Step::TrainSelection, Err(transport_error()));
	let mut opts = configured(SnatchMode::Off);
	opts.preferred_train = Some(601);
	let outcome = harness.orchestrator().run(&mut opts).await;
	assert!(matches!(outcome, RunOutcome::Fatal(BookingError::Transport(_))), "{outcome:?}");
}

#[tokio::test]
async fn locked_train_is_chosen_once_and_kept() {
	let harness = Harness::new();
	harness.site.respond_always(Step::BookingForm, Ok(fake::trains_page(&[601, 620])));
	harness.site.push(Step::TrainSelection, Ok(fake::page("")));
	harness.site.push(Step::PassengerInfo, Ok(fake::ticket_page("5")));
	harness.prompter.push("2");

	let mut opts = configured(SnatchMode::SingleDay);
	opts.snatch.lock_train = true;
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Success(_)), "{outcome:?}");
	assert_eq!(opts.preferred_train, Some(620));
	let train_params = harness.site.params(Step::TrainSelection);
	assert_eq!(train_params[0].get("TrainQueryDataViewPanel:TrainGroup"), Some("radio620"));
	assert_eq!(harness.events.count(|e| matches!(e, BookingEvent::TrainLocked { train_id: 620 })), 1);
}

#[tokio::test]
async fn failing_sample_store_does_not_abort() {
	let mut harness = Harness::new();
	harness.samples = std::sync::Arc::new(fake::MemorySamples::failing());
	harness.site.push(Step::BookingForm, Ok(fake::trains_page(&[601])));
	harness.site.push(Step::TrainSelection, Ok(fake::page("")));
	harness.site.push(Step::PassengerInfo, Ok(fake::ticket_page("1")));

	let mut opts = configured(SnatchMode::SingleDay);
	let outcome = harness.orchestrator().run(&mut opts).await;

	assert!(matches!(outcome, RunOutcome::Success(_)), "{outcome:?}");
}

trait MostRecentStation {
	fn most_recent_station(&self) -> Option<Station>;
}

impl MostRecentStation for fake::MemoryHistory {
	fn most_recent_station(&self) -> Option<Station> {
		use thsr::HistoryStore;
		self.most_recent().ok().flatten().map(|r| r.start_station)
	}
}
