use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thsr::{BookingError, TransportError};

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

/// The result envelope returned by all commands.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub inputs: Option<CommandInputs>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub diagnostics: Vec<Diagnostic>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub config: Option<EffectiveConfig>,
}

/// Journey the run was configured with before any prompt.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommandInputs {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub from_station: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub to_station: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub date: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub snatch: Option<String>,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub dry_run: bool,
}

/// Error information for failed commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Standardized error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	InvalidInput,
	ConfigError,
	NetworkError,
	CaptchaFailed,
	RemoteError,
	NoInventory,
	TrainUnavailable,
	SearchExhausted,
	Cancelled,
	IoError,
	InternalError,
}

impl ErrorCode {
	pub fn for_booking_error(error: &BookingError) -> Self {
		match error {
			BookingError::Validation(_) | BookingError::Form(_) => ErrorCode::InvalidInput,
			BookingError::Transport(TransportError::MalformedPage(_)) => ErrorCode::RemoteError,
			BookingError::Transport(_) | BookingError::RetriesExhausted { .. } => ErrorCode::NetworkError,
			BookingError::CaptchaExhausted { .. } | BookingError::LowConfidenceExhausted { .. } => ErrorCode::CaptchaFailed,
			BookingError::Remote { .. } => ErrorCode::RemoteError,
			BookingError::NoInventory => ErrorCode::NoInventory,
			BookingError::PreferredTrainUnavailable(_) => ErrorCode::TrainUnavailable,
			BookingError::Prompt(_) => ErrorCode::IoError,
			BookingError::Cancelled => ErrorCode::Cancelled,
			BookingError::InvalidState(_) => ErrorCode::InternalError,
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
			ErrorCode::NetworkError => write!(f, "NETWORK_ERROR"),
			ErrorCode::CaptchaFailed => write!(f, "CAPTCHA_FAILED"),
			ErrorCode::RemoteError => write!(f, "REMOTE_ERROR"),
			ErrorCode::NoInventory => write!(f, "NO_INVENTORY"),
			ErrorCode::TrainUnavailable => write!(f, "TRAIN_UNAVAILABLE"),
			ErrorCode::SearchExhausted => write!(f, "SEARCH_EXHAUSTED"),
			ErrorCode::Cancelled => write!(f, "CANCELLED"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

/// Diagnostic message attached to a command result.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
	pub level: DiagnosticLevel,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
	Info,
	Warning,
	Error,
}

/// Settings a booking run actually used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub config_path: Option<PathBuf>,
	pub data_dir: PathBuf,
	pub auto_captcha: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub captcha_solver: Option<String>,
	pub http_timeout_secs: u64,
}

/// A command result with no payload data.
pub type EmptyResult = CommandResult<()>;
