//! Captcha recognition delegated to an external program.
//!
//! The program reads the image on stdin and prints one JSON object:
//!
//! ```text
//! {"text": "K7NQ", "confidence": [0.99, 0.97, 0.91, 0.88]}
//! ```
//!
//! `confidence` may also be a single number applied to every character.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thsr::captcha::judge_prediction;
use thsr::{CaptchaAnswer, CaptchaSolver, SolverError};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

pub const DEFAULT_SOLVER_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Confidence {
	PerCharacter(Vec<f32>),
	Overall(f32),
}

impl Default for Confidence {
	fn default() -> Self {
		Confidence::PerCharacter(Vec::new())
	}
}

#[derive(Debug, Clone, Deserialize)]
struct Prediction {
	text: String,
	#[serde(default)]
	confidence: Confidence,
}

impl Prediction {
	fn judge(&self) -> CaptchaAnswer {
		let scores = match &self.confidence {
			Confidence::PerCharacter(scores) => scores.clone(),
			Confidence::Overall(score) => vec![*score; self.text.trim().chars().count()],
		};
		judge_prediction(&self.text, &scores)
	}
}

#[derive(Debug, Clone)]
pub struct CommandCaptchaSolver {
	program: String,
	args: Vec<String>,
	timeout: Duration,
}

impl CommandCaptchaSolver {
	pub fn new(program: impl Into<String>) -> Self {
		Self {
			program: program.into(),
			args: Vec::new(),
			timeout: DEFAULT_SOLVER_TIMEOUT,
		}
	}

	/// Splits a configured command line on whitespace; `None` when blank.
	pub fn from_command_line(line: &str) -> Option<Self> {
		let mut parts = line.split_whitespace();
		let program = parts.next()?;
		Some(Self::new(program).with_args(parts))
	}

	pub fn with_args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args = args.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn program(&self) -> &str {
		&self.program
	}
}

#[async_trait]
impl CaptchaSolver for CommandCaptchaSolver {
	async fn solve(&self, image: &[u8]) -> Result<CaptchaAnswer, SolverError> {
		let mut child = Command::new(&self.program)
			.args(&self.args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| SolverError(format!("cannot start `{}`: {e}", self.program)))?;

		let mut stdin = child.stdin.take().ok_or_else(|| SolverError("solver stdin unavailable".to_string()))?;
		stdin
			.write_all(image)
			.await
			.map_err(|e| SolverError(format!("writing image to `{}`: {e}", self.program)))?;
		drop(stdin);

		let output = tokio::time::timeout(self.timeout, child.wait_with_output())
			.await
			.map_err(|_| SolverError(format!("`{}` timed out after {:?}", self.program, self.timeout)))?
			.map_err(|e| SolverError(format!("waiting for `{}`: {e}", self.program)))?;
		if !output.status.success() {
			return Err(SolverError(format!(
				"`{}` exited with {}: {}",
				self.program,
				output.status,
				String::from_utf8_lossy(&output.stderr).trim()
			)));
		}

		let prediction: Prediction = serde_json::from_slice(&output.stdout).map_err(|e| SolverError(format!("unreadable solver output: {e}")))?;
		let answer = prediction.judge();
		debug!(target = "thsr.gate", ?answer, "solver prediction judged");
		Ok(answer)
	}
}
