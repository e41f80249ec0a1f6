//! In-memory collaborators for driving the flow without the network.
//!
//! Pages are plain text with one directive per line:
//!
//! ```text
//! booking-form                 first page with a usable form
//! seats: radio17,radio18       seat option values
//! error: <message>             one error-feedback message
//! train: <id> <form value>     one listed train
//! member: <radio value>        membership radio (default memberSystemRadio1)
//! non-member: <radio value>    non-member radio (default memberSystemRadio3)
//! early-bird: <count> <type>   early-bird passenger rows
//! ticket: <id>                 reservation id on the result page
//! ```
//!
//! # Example
//!
//! ```ignore
//! let harness = Harness::new();
//! harness.site.respond_always(Step::BookingForm, Ok(fake::trains_page(&[601])));
//! harness.site.push(Step::TrainSelection, Ok(fake::page("")));
//! harness.site.push(Step::PassengerInfo, Ok(fake::ticket_page("09012345")));
//! let outcome = harness.orchestrator().run(&mut options).await;
//! assert_eq!(harness.site.calls(Step::BookingForm), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use thsr_protocol::{BookingForm, FormParams, PassengerForm};

use crate::cancel::CancelToken;
use crate::captcha::{CaptchaAnswer, CaptchaSolver, SolverError};
use crate::error::{BookingError, Result, TransportError};
use crate::events::{BookingEvent, EventSink};
use crate::flow::{BookingOrchestrator, Collaborators, RetryPolicy};
use crate::model::{BookingPage, EarlyBirdForm, ErrorFeedback, HistoryRecord, Page, PassengerPage, TicketInfo, Train};
use crate::parser::PageParser;
use crate::prompt::{PromptSpec, Prompter};
use crate::session::{Session, SessionFactory};
use crate::store::{HistoryStore, SampleStore, StoreError, StoreResult};

pub const FAKE_URL: &str = "fake://thsr";

/// Default first page: a form with three seat options.
pub const BOOKING_PAGE: &str = "booking-form\nseats: radio17,radio18,radio19";

/// Captcha rejection as the site words it.
pub const CAPTCHA_REJECTED: &str = "檢測碼輸入錯誤，請確認後重新輸入";

/// Sold-out message as the site words it.
pub const SOLD_OUT: &str = "去程查無可售車次或選購的車票已售完，請重新輸入訂票條件";

pub fn page(body: &str) -> Page {
	Page::new(FAKE_URL, body.as_bytes().to_vec())
}

pub fn error_page(message: &str) -> Page {
	page(&format!("error: {message}"))
}

pub fn trains_page(ids: &[u32]) -> Page {
	let body: Vec<String> = ids.iter().map(|id| format!("train: {id} radio{id}")).collect();
	page(&body.join("\n"))
}

pub fn ticket_page(id: &str) -> Page {
	page(&format!("ticket: {id}"))
}

/// Site endpoints, in the order a date attempt reaches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
	BookingPage,
	CaptchaImage,
	BookingForm,
	TrainSelection,
	PassengerInfo,
}

type Response = std::result::Result<Page, TransportError>;

#[derive(Default)]
struct Endpoint {
	queue: VecDeque<Response>,
	fallback: Option<Response>,
	calls: usize,
	params: Vec<FormParams>,
}

impl Endpoint {
	fn next(&mut self, params: Option<&FormParams>) -> Response {
		self.calls += 1;
		if let Some(params) = params {
			self.params.push(params.clone());
		}
		self.queue.pop_front().or_else(|| self.fallback.clone()).unwrap_or_else(|| {
			Err(TransportError::Request {
				url: FAKE_URL.to_string(),
				message: "no scripted response".to_string(),
			})
		})
	}
}

#[derive(Default)]
struct SiteState {
	endpoints: [Endpoint; 5],
	sessions: usize,
}

fn slot(step: Step) -> usize {
	match step {
		Step::BookingPage => 0,
		Step::CaptchaImage => 1,
		Step::BookingForm => 2,
		Step::TrainSelection => 3,
		Step::PassengerInfo => 4,
	}
}

/// Scripted site shared by every session it creates.
///
/// Each endpoint answers from its queue first, then from its fallback; an
/// endpoint with neither fails with a transport error.
#[derive(Clone)]
pub struct FakeSite {
	state: Arc<Mutex<SiteState>>,
}

impl Default for FakeSite {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeSite {
	/// Booking page and captcha image answer by default; submissions are unscripted.
	pub fn new() -> Self {
		let site = Self {
			state: Arc::new(Mutex::new(SiteState::default())),
		};
		site.respond_always(Step::BookingPage, Ok(page(BOOKING_PAGE)));
		site.respond_always(Step::CaptchaImage, Ok(page("captcha-png")));
		site
	}

	pub fn push(&self, step: Step, response: Response) -> &Self {
		self.state.lock().endpoints[slot(step)].queue.push_back(response);
		self
	}

	pub fn respond_always(&self, step: Step, response: Response) -> &Self {
		self.state.lock().endpoints[slot(step)].fallback = Some(response);
		self
	}

	pub fn calls(&self, step: Step) -> usize {
		self.state.lock().endpoints[slot(step)].calls
	}

	/// Params posted to a submission endpoint, in call order.
	pub fn params(&self, step: Step) -> Vec<FormParams> {
		self.state.lock().endpoints[slot(step)].params.clone()
	}

	pub fn sessions_created(&self) -> usize {
		self.state.lock().sessions
	}

	fn call(&self, step: Step, params: Option<&FormParams>) -> Response {
		self.state.lock().endpoints[slot(step)].next(params)
	}
}

impl SessionFactory for FakeSite {
	fn create(&self) -> std::result::Result<Box<dyn Session>, TransportError> {
		self.state.lock().sessions += 1;
		Ok(Box::new(FakeSession { site: self.clone() }))
	}
}

struct FakeSession {
	site: FakeSite,
}

#[async_trait]
impl Session for FakeSession {
	async fn fetch_booking_page(&mut self) -> Response {
		self.site.call(Step::BookingPage, None)
	}

	async fn fetch_captcha_image(&mut self, _page: &Page) -> std::result::Result<Vec<u8>, TransportError> {
		self.site.call(Step::CaptchaImage, None).map(|p| p.body)
	}

	async fn submit_booking_form(&mut self, params: &FormParams) -> Response {
		self.site.call(Step::BookingForm, Some(params))
	}

	async fn submit_train_selection(&mut self, params: &FormParams) -> Response {
		self.site.call(Step::TrainSelection, Some(params))
	}

	async fn submit_passenger_info(&mut self, params: &FormParams) -> Response {
		self.site.call(Step::PassengerInfo, Some(params))
	}
}

/// Parser for the directive format described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeParser;

fn directives<'p>(page: &'p str, name: &'p str) -> impl Iterator<Item = &'p str> + 'p {
	page.lines().filter_map(move |line| line.strip_prefix(name)?.strip_prefix(':').map(str::trim))
}

impl PageParser for FakeParser {
	fn parse_booking_page(&self, page: &Page) -> std::result::Result<BookingPage, TransportError> {
		let text = page.text();
		if !text.lines().any(|line| line.trim() == "booking-form") {
			return Err(TransportError::MalformedPage("no booking form".to_string()));
		}
		let seat_options = directives(&text, "seats")
			.next()
			.map(|list| list.split(',').map(|v| v.trim().to_string()).collect())
			.unwrap_or_default();
		Ok(BookingPage {
			seat_options,
			types_of_trip: 0,
			search_by: "radio31".to_string(),
		})
	}

	fn parse_available_trains(&self, page: &Page) -> Vec<Train> {
		let text = page.text();
		directives(&text, "train")
			.filter_map(|spec| {
				let (id, value) = spec.split_once(' ')?;
				Some(Train {
					id: id.parse().ok()?,
					departure: "06:30".to_string(),
					arrival: "08:15".to_string(),
					travel_time: "1:45".to_string(),
					discount: String::new(),
					form_value: value.trim().to_string(),
				})
			})
			.collect()
	}

	fn parse_error_feedback(&self, page: &Page) -> ErrorFeedback {
		ErrorFeedback::new(directives(&page.text(), "error").map(str::to_string).collect())
	}

	fn parse_passenger_page(&self, page: &Page) -> PassengerPage {
		let text = page.text();
		let early_bird = directives(&text, "early-bird").next().and_then(|spec| {
			let (count, type_name) = spec.split_once(' ')?;
			Some(EarlyBirdForm {
				passenger_count: count.parse().ok()?,
				type_name: type_name.trim().to_string(),
			})
		});
		PassengerPage {
			member_radio: Some(directives(&text, "member").next().unwrap_or("memberSystemRadio1").to_string()),
			non_member_radio: Some(directives(&text, "non-member").next().unwrap_or("memberSystemRadio3").to_string()),
			early_bird,
		}
	}

	fn parse_ticket_info(&self, page: &Page) -> TicketInfo {
		TicketInfo {
			id: directives(&page.text(), "ticket").next().unwrap_or_default().to_string(),
			..TicketInfo::default()
		}
	}
}

/// Solver answering from a queue, then with its fallback.
pub struct ScriptedSolver {
	answers: Mutex<VecDeque<std::result::Result<CaptchaAnswer, SolverError>>>,
	fallback: CaptchaAnswer,
	calls: Mutex<usize>,
}

impl Default for ScriptedSolver {
	fn default() -> Self {
		Self::new()
	}
}

impl ScriptedSolver {
	/// Solves every captcha as `K7NQ`.
	pub fn new() -> Self {
		Self {
			answers: Mutex::new(VecDeque::new()),
			fallback: CaptchaAnswer::Solved("K7NQ".to_string()),
			calls: Mutex::new(0),
		}
	}

	pub fn push(&self, answer: std::result::Result<CaptchaAnswer, SolverError>) {
		self.answers.lock().push_back(answer);
	}

	pub fn calls(&self) -> usize {
		*self.calls.lock()
	}
}

#[async_trait]
impl CaptchaSolver for ScriptedSolver {
	async fn solve(&self, _image: &[u8]) -> std::result::Result<CaptchaAnswer, SolverError> {
		*self.calls.lock() += 1;
		self.answers.lock().pop_front().unwrap_or_else(|| Ok(self.fallback.clone()))
	}
}

/// Prompter replaying canned answers and recording every question.
#[derive(Default)]
pub struct ScriptedPrompter {
	answers: Mutex<VecDeque<String>>,
	asked: Mutex<Vec<PromptSpec>>,
}

impl ScriptedPrompter {
	pub fn new<I, S>(answers: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
			asked: Mutex::new(Vec::new()),
		}
	}

	pub fn push(&self, answer: impl Into<String>) {
		self.answers.lock().push_back(answer.into());
	}

	pub fn asked(&self) -> Vec<PromptSpec> {
		self.asked.lock().clone()
	}

	pub fn remaining(&self) -> usize {
		self.answers.lock().len()
	}
}

#[async_trait]
impl Prompter for ScriptedPrompter {
	async fn ask(&self, spec: &PromptSpec) -> Result<String> {
		self.asked.lock().push(spec.clone());
		self.answers
			.lock()
			.pop_front()
			.ok_or_else(|| BookingError::Prompt(format!("no scripted answer for {:?}", spec.field)))
	}
}

type Trigger = Box<dyn Fn(&BookingEvent) -> bool + Send + Sync>;

/// Sink that records events and can cancel a token when one matches.
#[derive(Default)]
pub struct RecordingSink {
	events: Mutex<Vec<BookingEvent>>,
	trigger: Option<(CancelToken, Trigger)>,
}

impl RecordingSink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Cancels `token` on the first event matching `when`.
	pub fn cancel_on(mut self, token: CancelToken, when: impl Fn(&BookingEvent) -> bool + Send + Sync + 'static) -> Self {
		self.trigger = Some((token, Box::new(when)));
		self
	}

	pub fn events(&self) -> Vec<BookingEvent> {
		self.events.lock().clone()
	}

	pub fn count(&self, matches: impl Fn(&BookingEvent) -> bool) -> usize {
		self.events.lock().iter().filter(|e| matches(e)).count()
	}
}

impl EventSink for RecordingSink {
	fn emit(&self, event: &BookingEvent) {
		self.events.lock().push(event.clone());
		if let Some((token, when)) = &self.trigger {
			if when(event) {
				token.cancel();
			}
		}
	}
}

/// Samples kept in memory as `(byte length, label)`.
#[derive(Default)]
pub struct MemorySamples {
	saved: Mutex<Vec<(usize, Option<String>)>>,
	fail: bool,
}

impl MemorySamples {
	/// A store whose every save fails.
	pub fn failing() -> Self {
		Self {
			fail: true,
			..Self::default()
		}
	}

	pub fn labels(&self) -> Vec<Option<String>> {
		self.saved.lock().iter().map(|(_, label)| label.clone()).collect()
	}
}

impl SampleStore for MemorySamples {
	fn save(&self, image: &[u8], label: Option<&str>) -> StoreResult<()> {
		if self.fail {
			return Err(StoreError::Invalid("sample store is read-only".to_string()));
		}
		self.saved.lock().push((image.len(), label.map(str::to_string)));
		Ok(())
	}
}

#[derive(Default)]
pub struct MemoryHistory {
	records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistory {
	pub fn with_records(records: Vec<HistoryRecord>) -> Self {
		Self {
			records: Mutex::new(records),
		}
	}
}

impl HistoryStore for MemoryHistory {
	fn records(&self) -> StoreResult<Vec<HistoryRecord>> {
		Ok(self.records.lock().clone())
	}

	fn save(&self, booking: &BookingForm, passenger: &PassengerForm, _ticket: &TicketInfo) -> StoreResult<()> {
		let record = HistoryRecord::from_forms(booking, passenger).ok_or_else(|| StoreError::Invalid("unknown station".to_string()))?;
		self.records.lock().insert(0, record);
		Ok(())
	}
}

/// The full set of fakes wired together.
pub struct Harness {
	pub site: FakeSite,
	pub solver: Arc<ScriptedSolver>,
	pub prompter: Arc<ScriptedPrompter>,
	pub events: Arc<RecordingSink>,
	pub samples: Arc<MemorySamples>,
	pub history: Arc<MemoryHistory>,
	pub cancel: CancelToken,
}

impl Default for Harness {
	fn default() -> Self {
		Self::new()
	}
}

impl Harness {
	pub fn new() -> Self {
		Self {
			site: FakeSite::new(),
			solver: Arc::new(ScriptedSolver::new()),
			prompter: Arc::new(ScriptedPrompter::default()),
			events: Arc::new(RecordingSink::new()),
			samples: Arc::new(MemorySamples::default()),
			history: Arc::new(MemoryHistory::default()),
			cancel: CancelToken::new(),
		}
	}

	/// Local date the harness orchestrator treats as today.
	pub fn today() -> NaiveDate {
		NaiveDate::from_ymd_opt(2025, 5, 1).unwrap_or_default()
	}

	pub fn collaborators(&self) -> Collaborators {
		Collaborators {
			sessions: Arc::new(self.site.clone()),
			parser: Arc::new(FakeParser),
			solver: self.solver.clone(),
			prompter: self.prompter.clone(),
			events: self.events.clone(),
			samples: self.samples.clone(),
			history: self.history.clone(),
		}
	}

	/// Orchestrator over these fakes with zero backoff.
	pub fn orchestrator(&self) -> BookingOrchestrator {
		BookingOrchestrator::new(self.collaborators())
			.with_policy(RetryPolicy::immediate())
			.with_cancel_token(self.cancel.clone())
			.with_today(Self::today())
	}
}
