//! The booking run: settings, collaborators, the orchestrator, and the final
//! report.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use thsr::validate::format_date;
use thsr::{
	BookingOptions, BookingOrchestrator, CancelToken, CaptchaSolver, Collaborators, HistoryRecord, HistoryStore, Prompter, RunOutcome, SnatchMode,
};
use thsr_runtime::{CommandCaptchaSolver, DirSampleStore, HtmlParser, HttpConfig, HttpSessionFactory, JsonHistoryStore};
use tracing::{info, warn};

use super::ExitStatus;
use crate::cli::Cli;
use crate::config::{LoadedConfig, Settings, load_config, resolve_settings};
use crate::console::{ConsolePrompter, ConsoleSink, ManualCaptchaSolver, pick_history, render_ticket};
use crate::output::{
	BookingData, CommandError, CommandInputs, DiagnosticLevel, DryRunData, EffectiveConfig, EmptyResult, ErrorCode, OutputFormat, ResultBuilder,
	print_error_stderr, print_result,
};

const COMMAND: &str = "book";

pub const HISTORY_FILE: &str = "history.json";
pub const SAMPLE_DIR: &str = "captcha";
pub const MANUAL_CAPTCHA_FILE: &str = "captcha.png";

pub const PAYMENT_REMINDER: &str = "請使用官方管道完成付款及取票！";
pub const EXHAUSTED_MESSAGE: &str = "刷票失敗：查無可售班次";

struct Note {
	level: DiagnosticLevel,
	message: String,
	source: Option<String>,
}

/// Context shared by every envelope this run prints.
struct Report {
	started: Instant,
	format: OutputFormat,
	inputs: Option<CommandInputs>,
	config: Option<EffectiveConfig>,
	notes: Vec<Note>,
}

impl Report {
	fn new(format: OutputFormat) -> Self {
		Self {
			started: Instant::now(),
			format,
			inputs: None,
			config: None,
			notes: Vec::new(),
		}
	}

	/// Records a warning; text mode shows it immediately.
	fn warn(&mut self, message: impl Into<String>, source: Option<String>) {
		let message = message.into();
		if self.format.is_text() {
			eprintln!("{}", format!("warning: {message}").yellow());
		}
		self.notes.push(Note {
			level: DiagnosticLevel::Warning,
			message,
			source,
		});
	}

	fn builder<T: Serialize>(&self) -> ResultBuilder<T> {
		let mut builder = ResultBuilder::new(COMMAND).started_at(self.started);
		if let Some(inputs) = &self.inputs {
			builder = builder.inputs(inputs.clone());
		}
		if let Some(config) = &self.config {
			builder = builder.config(config.clone());
		}
		for note in &self.notes {
			builder = match &note.source {
				Some(source) => builder.diagnostic_with_source(note.level, &note.message, source),
				None => builder.diagnostic(note.level, &note.message),
			};
		}
		builder
	}

	fn fail(&self, code: ErrorCode, message: impl Into<String>, messages: &[String]) {
		let message = message.into();
		if self.format.is_text() {
			print_error_stderr(&CommandError {
				code,
				message,
				details: None,
			});
			return;
		}
		let builder = self.builder::<()>();
		let result: EmptyResult = if messages.is_empty() {
			builder.error(code, message).build()
		} else {
			builder.error_with_details(code, message, serde_json::json!({ "messages": messages })).build()
		};
		print_result(&result, self.format);
	}
}

fn describe_snatch(opts: &BookingOptions) -> Option<String> {
	match opts.snatch.mode? {
		SnatchMode::Off => Some("off".to_string()),
		SnatchMode::SingleDay => Some("single-day".to_string()),
		SnatchMode::DateRange { end } => Some(format!("until {}", format_date(end))),
	}
}

fn command_inputs(opts: &BookingOptions) -> CommandInputs {
	CommandInputs {
		from_station: opts.from_station.map(|s| s.name().to_string()),
		to_station: opts.to_station.map(|s| s.name().to_string()),
		date: opts.date.map(format_date),
		snatch: describe_snatch(opts),
		dry_run: opts.dry_run,
	}
}

/// The configured solver command, or manual entry when there is none.
///
/// Without a command the run falls back to one typed captcha per attempt.
fn captcha_solver(
	settings: &Settings,
	opts: &mut BookingOptions,
	prompter: Arc<dyn Prompter>,
	cancel: CancelToken,
	report: &mut Report,
) -> Arc<dyn CaptchaSolver> {
	if opts.auto_captcha {
		if let Some(solver) = settings.captcha_solver.as_deref().and_then(CommandCaptchaSolver::from_command_line) {
			let solver = solver.with_timeout(settings.solver_timeout);
			info!(target = "thsr.gate", program = solver.program(), "captcha solver configured");
			return Arc::new(solver);
		}
		opts.auto_captcha = false;
		report.warn("no captcha solver configured, falling back to manual entry", None);
	}
	Arc::new(ManualCaptchaSolver::new(prompter, cancel, settings.data_dir.join(MANUAL_CAPTCHA_FILE)))
}

async fn startup_history(history: &dyn HistoryStore, prompter: &dyn Prompter, cancel: &CancelToken, report: &mut Report) -> Option<HistoryRecord> {
	let records = match history.records() {
		Ok(records) => records,
		Err(error) => {
			warn!(target = "thsr.store", %error, "history unreadable");
			report.warn(error.to_string(), Some(HISTORY_FILE.to_string()));
			return None;
		}
	};
	match pick_history(&records, prompter, cancel).await {
		Ok(record) => record,
		Err(error) => {
			warn!(target = "thsr", %error, "history not picked");
			None
		}
	}
}

fn ensure_data_dir(dir: &Path) -> anyhow::Result<()> {
	std::fs::create_dir_all(dir).with_context(|| format!("cannot create data directory {}", dir.display()))
}

fn watch_interrupt(cancel: CancelToken) -> tokio::task::JoinHandle<()> {
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!(target = "thsr", "interrupt received");
			cancel.cancel();
		}
	})
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitStatus> {
	let mut report = Report::new(cli.format);
	let LoadedConfig { path, file, warning } = load_config(cli.config.as_deref());
	if let Some(warning) = warning {
		report.warn(warning, path.as_ref().map(|p| p.display().to_string()));
	}

	let settings = match resolve_settings(&cli, &file) {
		Ok(settings) => settings,
		Err(error) => {
			report.fail(ErrorCode::InvalidInput, error.to_string(), &[]);
			return Ok(ExitStatus::Failure);
		}
	};
	ensure_data_dir(&settings.data_dir)?;

	let mut opts = settings.options.clone();
	report.inputs = Some(command_inputs(&opts));

	let cancel = CancelToken::new();
	let interrupt = watch_interrupt(cancel.clone());

	let prompter: Arc<dyn Prompter> = Arc::new(ConsolePrompter);
	let solver = captcha_solver(&settings, &mut opts, prompter.clone(), cancel.clone(), &mut report);
	report.config = Some(EffectiveConfig {
		config_path: path,
		data_dir: settings.data_dir.clone(),
		auto_captcha: opts.auto_captcha,
		captcha_solver: settings.captcha_solver.clone(),
		http_timeout_secs: settings.http_timeout.as_secs(),
	});

	let history: Arc<dyn HistoryStore> = Arc::new(JsonHistoryStore::new(settings.data_dir.join(HISTORY_FILE)));
	let record = startup_history(history.as_ref(), prompter.as_ref(), &cancel, &mut report).await;

	let deps = Collaborators {
		sessions: Arc::new(HttpSessionFactory::new(HttpConfig {
			timeout: settings.http_timeout,
			..HttpConfig::default()
		})),
		parser: Arc::new(HtmlParser),
		solver,
		prompter,
		events: Arc::new(ConsoleSink),
		samples: Arc::new(DirSampleStore::new(settings.data_dir.join(SAMPLE_DIR))),
		history,
	};
	let orchestrator = BookingOrchestrator::new(deps).with_cancel_token(cancel.clone()).with_history(record);

	let outcome = match orchestrator.run(&mut opts).await {
		RunOutcome::Success(booked) => RunOutcome::Success(booked),
		_ if cancel.is_cancelled() => RunOutcome::Cancelled,
		other => other,
	};
	interrupt.abort();

	Ok(finish(&report, outcome))
}

fn finish(report: &Report, outcome: RunOutcome) -> ExitStatus {
	match outcome {
		RunOutcome::Success(booked) => {
			if report.format.is_text() {
				print!("{}", render_ticket(&booked.ticket));
				println!("{}", PAYMENT_REMINDER.yellow().bold());
			} else {
				let result = report.builder::<BookingData>().data(BookingData::from(booked.as_ref())).build();
				print_result(&result, report.format);
			}
			ExitStatus::Success
		}
		RunOutcome::DryRunCompleted => {
			if report.format.is_text() {
				println!("{}", "試跑完成".green());
			} else {
				print_result(&report.builder::<DryRunData>().data(DryRunData { dry_run: true }).build(), report.format);
			}
			ExitStatus::Success
		}
		RunOutcome::Exhausted => {
			if report.format.is_text() {
				eprintln!("{}", EXHAUSTED_MESSAGE.red().bold());
			} else {
				report.fail(ErrorCode::SearchExhausted, EXHAUSTED_MESSAGE, &[]);
			}
			ExitStatus::Exhausted
		}
		RunOutcome::Cancelled => {
			if report.format.is_text() {
				eprintln!("{}", "已取消".dimmed());
			} else {
				report.fail(ErrorCode::Cancelled, "cancelled", &[]);
			}
			ExitStatus::Success
		}
		RunOutcome::Fatal(error) => {
			let code = ErrorCode::for_booking_error(&error);
			if report.format.is_text() {
				eprintln!("{} {error}", "訂位失敗：".red().bold());
			} else {
				report.fail(code, error.to_string(), error.remote_messages());
			}
			ExitStatus::Failure
		}
	}
}
