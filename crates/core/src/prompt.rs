//! Field resolution shared by the console and test harnesses.
//!
//! Each resolvable field is computed by a pure function returning
//! [`Resolution::Resolved`] when configuration already answers it, or
//! [`Resolution::NeedsPrompt`] with a [`PromptSpec`] describing the question.
//! [`FieldResolver`] asks the [`Prompter`] for the latter and re-asks until the
//! answer parses.

use async_trait::async_trait;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{BookingError, Result};

/// Which value a prompt collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
	History,
	FromStation,
	ToStation,
	Date,
	Time,
	AdultCount,
	SeatPreference,
	CabinClass,
	Captcha,
	Train,
	PersonalId,
	Membership,
	Phone,
	/// Id of the n-th early-bird passenger (0-based).
	EarlyBirdId(usize),
	SnatchMode,
	SnatchEnd,
	SnatchPolling,
	SnatchInterval,
	LockTrain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptChoice {
	pub value: String,
	pub label: String,
}

impl PromptChoice {
	pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			value: value.into(),
			label: label.into(),
		}
	}
}

/// A question for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
	pub field: Field,
	pub message: String,
	/// Used when the answer is empty.
	pub default: Option<String>,
	pub choices: Vec<PromptChoice>,
	/// Why the previous answer was refused.
	pub error: Option<String>,
}

impl PromptSpec {
	pub fn new(field: Field, message: impl Into<String>) -> Self {
		Self {
			field,
			message: message.into(),
			default: None,
			choices: Vec::new(),
			error: None,
		}
	}

	pub fn with_default(mut self, default: impl Into<String>) -> Self {
		self.default = Some(default.into());
		self
	}

	pub fn with_choices(mut self, choices: Vec<PromptChoice>) -> Self {
		self.choices = choices;
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
	Resolved(T),
	NeedsPrompt(PromptSpec),
}

/// Interactive input source.
#[async_trait]
pub trait Prompter: Send + Sync {
	/// Returns the raw answer; an empty string selects the default.
	async fn ask(&self, spec: &PromptSpec) -> Result<String>;
}

/// Turns [`Resolution`]s into values, prompting when needed.
pub struct FieldResolver<'a> {
	prompter: &'a dyn Prompter,
	cancel: &'a CancelToken,
}

impl<'a> FieldResolver<'a> {
	pub fn new(prompter: &'a dyn Prompter, cancel: &'a CancelToken) -> Self {
		Self { prompter, cancel }
	}

	pub async fn resolve<T, F>(&self, resolution: Resolution<T>, parse: F) -> Result<T>
	where
		F: Fn(&str) -> std::result::Result<T, String>,
	{
		match resolution {
			Resolution::Resolved(value) => Ok(value),
			Resolution::NeedsPrompt(spec) => self.prompt(spec, parse).await,
		}
	}

	/// Asks until `parse` accepts the answer or the prompt is cancelled.
	pub async fn prompt<T, F>(&self, mut spec: PromptSpec, parse: F) -> Result<T>
	where
		F: Fn(&str) -> std::result::Result<T, String>,
	{
		loop {
			self.cancel.check()?;
			let answer = tokio::select! {
				answer = self.prompter.ask(&spec) => answer?,
				_ = self.cancel.cancelled() => return Err(BookingError::Cancelled),
			};

			let answer = answer.trim();
			let input = match (answer.is_empty(), spec.default.as_deref()) {
				(true, Some(default)) => default,
				_ => answer,
			};
			match parse(input) {
				Ok(value) => return Ok(value),
				Err(message) => {
					debug!(target = "thsr", field = ?spec.field, %message, "prompt answer refused");
					spec.error = Some(message);
				}
			}
		}
	}
}

/// Parses `y`/`yes`/`n`/`no`, case-insensitively.
pub fn parse_yes_no(input: &str) -> std::result::Result<bool, String> {
	match input.trim().to_ascii_lowercase().as_str() {
		"y" | "yes" => Ok(true),
		"n" | "no" => Ok(false),
		other => Err(format!("answer y or n, not `{other}`")),
	}
}

/// Parses a 1-based index into a list of `len` entries.
pub fn parse_index(input: &str, len: usize) -> std::result::Result<usize, String> {
	match input.trim().parse::<usize>() {
		Ok(n) if (1..=len).contains(&n) => Ok(n - 1),
		_ => Err(format!("enter a number between 1 and {len}")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fake::ScriptedPrompter;

	#[tokio::test]
	async fn resolved_fields_skip_the_prompter() {
		let prompter = ScriptedPrompter::new(Vec::<String>::new());
		let cancel = CancelToken::new();
		let resolver = FieldResolver::new(&prompter, &cancel);
		let value = resolver.resolve(Resolution::Resolved(4u8), |_| Err("unused".into())).await.unwrap();
		assert_eq!(value, 4);
		assert!(prompter.asked().is_empty());
	}

	#[tokio::test]
	async fn invalid_answers_are_reasked_with_error() {
		let prompter = ScriptedPrompter::new(["x", "", "2"]);
		let cancel = CancelToken::new();
		let resolver = FieldResolver::new(&prompter, &cancel);
		let spec = PromptSpec::new(Field::AdultCount, "adults");
		let value: u8 = resolver
			.prompt(spec, |s| s.parse::<u8>().map_err(|e| e.to_string()))
			.await
			.unwrap();
		assert_eq!(value, 2);
		let asked = prompter.asked();
		assert_eq!(asked.len(), 3);
		assert!(asked[0].error.is_none());
		assert!(asked[1].error.is_some());
	}

	#[tokio::test]
	async fn empty_answer_takes_default() {
		let prompter = ScriptedPrompter::new([""]);
		let cancel = CancelToken::new();
		let resolver = FieldResolver::new(&prompter, &cancel);
		let spec = PromptSpec::new(Field::Time, "time").with_default("10");
		let value: usize = resolver.prompt(spec, |s| s.parse().map_err(|_| "bad".to_string())).await.unwrap();
		assert_eq!(value, 10);
	}

	#[tokio::test]
	async fn cancelled_before_prompt() {
		let prompter = ScriptedPrompter::new(["1"]);
		let cancel = CancelToken::new();
		cancel.cancel();
		let resolver = FieldResolver::new(&prompter, &cancel);
		let result: Result<u8> = resolver
			.prompt(PromptSpec::new(Field::AdultCount, "adults"), |s| s.parse().map_err(|_| String::new()))
			.await;
		assert!(matches!(result, Err(BookingError::Cancelled)));
		assert!(prompter.asked().is_empty());
	}

	#[test]
	fn index_and_yes_no_parsing() {
		assert_eq!(parse_index("1", 3), Ok(0));
		assert!(parse_index("0", 3).is_err());
		assert!(parse_index("4", 3).is_err());
		assert_eq!(parse_yes_no("Y"), Ok(true));
		assert_eq!(parse_yes_no("no"), Ok(false));
		assert!(parse_yes_no("maybe").is_err());
	}
}
