//! Captcha solving seam and the confidence policy applied to predictions.

use async_trait::async_trait;
use thiserror::Error;

/// Characters the site draws captchas from.
pub const CAPTCHA_ALPHABET: &str = "2345679ACDFGHKMNPQRTVWYZ";

/// Lowest per-character confidence accepted as a guess.
pub const MIN_CONFIDENCE: f32 = 0.8;

/// What a solver made of one image.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptchaAnswer {
	Solved(String),
	/// The solver declines to guess; the gate skips to a fresh captcha.
	LowConfidence(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("captcha solver failed: {0}")]
pub struct SolverError(pub String);

#[async_trait]
pub trait CaptchaSolver: Send + Sync {
	async fn solve(&self, image: &[u8]) -> Result<CaptchaAnswer, SolverError>;
}

/// Applies the alphabet and confidence checks to a raw prediction.
///
/// `confidences` holds one score per predicted character; a missing score
/// counts as below threshold.
pub fn judge_prediction(text: &str, confidences: &[f32]) -> CaptchaAnswer {
	let text = text.trim().to_ascii_uppercase();
	if text.is_empty() {
		return CaptchaAnswer::LowConfidence("empty prediction".to_string());
	}
	if let Some(bad) = text.chars().find(|c| !CAPTCHA_ALPHABET.contains(*c)) {
		return CaptchaAnswer::LowConfidence(format!("`{bad}` is not a captcha character"));
	}
	for (idx, _) in text.chars().enumerate() {
		let score = confidences.get(idx).copied().unwrap_or(0.0);
		if score < MIN_CONFIDENCE {
			return CaptchaAnswer::LowConfidence(format!("character {} scored {score:.2}", idx + 1));
		}
	}
	CaptchaAnswer::Solved(text)
}
