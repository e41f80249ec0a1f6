//! Terminal side of the booking flow: prompts on stderr, answers from stdin,
//! progress lines for every [`BookingEvent`], and manual captcha entry.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use thsr::prompt::parse_index;
use thsr::protocol::format_time_token;
use thsr::validate::format_date;
use thsr::{
	BookingError, BookingEvent, CancelToken, CaptchaAnswer, CaptchaSolver, EventSink, Field, FieldResolver, HistoryRecord, PromptChoice, PromptSpec, Prompter,
	SnatchMode, SolverError, TicketInfo,
};

/// Question text as shown on the terminal, without a trailing newline.
pub fn render_prompt(spec: &PromptSpec) -> String {
	let mut out = String::new();
	if let Some(error) = &spec.error {
		let _ = writeln!(out, "{}", format!("✗ {error}").red());
	}
	for choice in &spec.choices {
		let _ = writeln!(out, "  {}. {}", choice.value.bold(), choice.label);
	}
	let _ = write!(out, "{}", spec.message.cyan().bold());
	if let Some(default) = spec.default.as_deref().filter(|d| !d.is_empty()) {
		let _ = write!(out, " {}", format!("[{default}]").dimmed());
	}
	out.push_str(": ");
	out
}

/// Reads answers from stdin; prompts go to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompter;

fn read_answer(prompt: &str) -> thsr::Result<String> {
	{
		let mut stderr = io::stderr().lock();
		let _ = write!(stderr, "{prompt}");
		let _ = stderr.flush();
	}
	let mut line = String::new();
	match io::stdin().lock().read_line(&mut line) {
		Ok(0) => Err(BookingError::Prompt("standard input closed".to_string())),
		Ok(_) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
		Err(err) => Err(BookingError::Prompt(err.to_string())),
	}
}

#[async_trait]
impl Prompter for ConsolePrompter {
	async fn ask(&self, spec: &PromptSpec) -> thsr::Result<String> {
		let prompt = render_prompt(spec);
		tokio::task::spawn_blocking(move || read_answer(&prompt))
			.await
			.map_err(|err| BookingError::Prompt(err.to_string()))?
	}
}

fn date_label(date: Option<chrono::NaiveDate>) -> String {
	date.map(format_date).unwrap_or_else(|| "設定日期".to_string())
}

fn attempt_label(attempt: u32, max_attempts: u32) -> String {
	format!("({attempt}/{max_attempts})")
}

/// One progress line per event; `None` for events the final result covers.
pub fn render_event(event: &BookingEvent) -> Option<String> {
	let line = match event {
		BookingEvent::RunStarted { mode, dates, interval } => {
			let mut line = match mode {
				SnatchMode::Off => return None,
				SnatchMode::SingleDay => format!("刷票模式：{}", date_label(dates.first().copied())),
				SnatchMode::DateRange { .. } => match (dates.first(), dates.last()) {
					(Some(first), Some(last)) => format!("刷票模式：{} ~ {}（共 {} 天）", format_date(*first), format_date(*last), dates.len()),
					_ => "刷票模式".to_string(),
				},
			};
			if let Some(interval) = interval {
				let _ = write!(line, "，每 {} 秒重新查詢", interval.as_secs());
			}
			line.bold().to_string()
		}
		BookingEvent::RoundStarted { round } => format!("第 {round} 輪").bold().to_string(),
		BookingEvent::DateAttempt { date } => {
			let date = (*date)?;
			format!("查詢 {}", format_date(date))
		}
		BookingEvent::CaptchaSolved { attempt, max_attempts, text } => {
			format!("驗證碼 {} {}", text.bold(), attempt_label(*attempt, *max_attempts).dimmed())
		}
		BookingEvent::CaptchaRejected { attempt, max_attempts, .. } => {
			format!("驗證碼錯誤，重新嘗試 {}", attempt_label(*attempt, *max_attempts)).yellow().to_string()
		}
		BookingEvent::LowConfidence { attempt, max_attempts, reason } => {
			format!("辨識信心不足（{reason}），換一張驗證碼 {}", attempt_label(*attempt, *max_attempts))
				.dimmed()
				.to_string()
		}
		BookingEvent::TransportRetry { attempt, max_attempts, error } => {
			format!("連線失敗：{error} {}", attempt_label(*attempt, *max_attempts)).yellow().to_string()
		}
		BookingEvent::RemoteErrors { messages } => messages.iter().map(|m| format!("✗ {m}").red().to_string()).collect::<Vec<_>>().join("\n"),
		BookingEvent::TrainsListed { trains } => format!("可訂車次 {} 班", trains.len()),
		BookingEvent::TrainSelected { train } => format!("選擇車次 {} {}~{}", train.id.to_string().bold(), train.departure, train.arrival),
		BookingEvent::TrainLocked { train_id } => format!("鎖定車次 {train_id}").green().to_string(),
		BookingEvent::PreferredTrainMissing { train_id } => format!("車次 {train_id} 目前無法訂位").yellow().to_string(),
		BookingEvent::NoTrains { date } => format!("{} 查無可售班次", date_label(*date)).yellow().to_string(),
		BookingEvent::MembershipFallback => "TGo 會員資料無效，改以非會員身分訂位".yellow().to_string(),
		BookingEvent::DryRunStopped => "試跑模式：已停在乘客資料前，未送出訂位".cyan().to_string(),
		BookingEvent::RoundExhausted { round, wait } => format!("第 {round} 輪無結果，{} 秒後重試", wait.as_secs()).dimmed().to_string(),
		BookingEvent::SearchExhausted | BookingEvent::Booked { .. } => return None,
	};
	Some(line)
}

/// Writes [`render_event`] lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
	fn emit(&self, event: &BookingEvent) {
		if let Some(line) = render_event(event) {
			eprintln!("{line}");
		}
	}
}

/// Reservation summary printed after a successful booking.
pub fn render_ticket(ticket: &TicketInfo) -> String {
	let mut out = String::new();
	let _ = writeln!(out, "{} {}", "訂位代號".bold(), ticket.id.green().bold());
	if !ticket.payment_deadline.is_empty() {
		let _ = writeln!(out, "繳費期限 {}", ticket.payment_deadline);
	}
	if !ticket.total_price.is_empty() {
		let _ = writeln!(out, "總票價   {}", ticket.total_price);
	}
	let _ = writeln!(
		out,
		"{} {} {} → {} {}  車次 {}",
		ticket.date, ticket.start_station, ticket.departure, ticket.dest_station, ticket.arrival, ticket.train_id
	);
	if !ticket.seats.is_empty() || !ticket.seat_class.is_empty() {
		let _ = writeln!(out, "{} {}", ticket.seat_class, ticket.seats.join("、"));
	}
	out
}

fn history_label(record: &HistoryRecord) -> String {
	let time = format_time_token(&record.outbound_time).unwrap_or_else(|| record.outbound_time.clone());
	let mut label = format!(
		"{} {} → {} {} {}",
		record.personal_id,
		record.start_station.name_zh(),
		record.dest_station.name_zh(),
		time,
		record.adult_num
	);
	if !record.phone.is_empty() {
		let _ = write!(label, " {}", record.phone);
	}
	label
}

/// Offers previous profiles; an empty answer uses none.
pub async fn pick_history(records: &[HistoryRecord], prompter: &dyn Prompter, cancel: &CancelToken) -> thsr::Result<Option<HistoryRecord>> {
	if records.is_empty() {
		return Ok(None);
	}
	let choices = records
		.iter()
		.enumerate()
		.map(|(idx, record)| PromptChoice::new((idx + 1).to_string(), history_label(record)))
		.collect();
	let spec = PromptSpec::new(Field::History, "使用歷史紀錄（Enter 略過）").with_choices(choices);
	FieldResolver::new(prompter, cancel)
		.prompt(spec, |input| {
			if input.is_empty() {
				return Ok(None);
			}
			parse_index(input, records.len()).map(|idx| Some(records[idx].clone()))
		})
		.await
}

/// Saves the captcha image and asks the user to type it.
pub struct ManualCaptchaSolver {
	prompter: Arc<dyn Prompter>,
	cancel: CancelToken,
	image_path: PathBuf,
}

impl ManualCaptchaSolver {
	pub fn new(prompter: Arc<dyn Prompter>, cancel: CancelToken, image_path: impl Into<PathBuf>) -> Self {
		Self {
			prompter,
			cancel,
			image_path: image_path.into(),
		}
	}
}

fn parse_captcha_text(input: &str) -> Result<String, String> {
	let text = input.trim().to_ascii_uppercase();
	if text.is_empty() { Err("請輸入驗證碼".to_string()) } else { Ok(text) }
}

#[async_trait]
impl CaptchaSolver for ManualCaptchaSolver {
	async fn solve(&self, image: &[u8]) -> Result<CaptchaAnswer, SolverError> {
		let path = &self.image_path;
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent).map_err(|e| SolverError(format!("cannot create {}: {e}", parent.display())))?;
		}
		std::fs::write(path, image).map_err(|e| SolverError(format!("cannot write {}: {e}", path.display())))?;

		let spec = PromptSpec::new(Field::Captcha, format!("輸入驗證碼（圖片：{}）", path.display()));
		let text = FieldResolver::new(self.prompter.as_ref(), &self.cancel)
			.prompt(spec, parse_captcha_text)
			.await
			.map_err(|e| SolverError(e.to_string()))?;
		Ok(CaptchaAnswer::Solved(text))
	}
}
