//! Captcha images kept on disk for later labeling.
//!
//! Files are named `NNNNN_<label>_<hash>.png`: a sequence number continuing
//! from the highest one already in the directory (starting at 1), the confirmed text (or
//! `captcha` for a rejected guess), and 12 hex digits of the image's xxHash64.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thsr::SampleStore;
use thsr::StoreError;
use thsr::store::StoreResult;
use tracing::debug;
use twox_hash::XxHash64;

const UNLABELED: &str = "captcha";

pub fn sample_file_name(sequence: u32, label: Option<&str>, image: &[u8]) -> String {
	let label: String = label.unwrap_or_default().chars().filter(char::is_ascii_alphanumeric).collect();
	let label = if label.is_empty() { UNLABELED } else { label.as_str() };
	let hash = XxHash64::oneshot(0, image) >> 16;
	format!("{sequence:05}_{label}_{hash:012x}.png")
}

fn sequence_of(file_name: &str) -> Option<u32> {
	file_name.split_once('_')?.0.parse().ok()
}

#[derive(Debug)]
pub struct DirSampleStore {
	dir: PathBuf,
	next: Mutex<Option<u32>>,
}

impl DirSampleStore {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self {
			dir: dir.into(),
			next: Mutex::new(None),
		}
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn io_error(&self, path: &Path, source: std::io::Error) -> StoreError {
		StoreError::Io {
			path: path.display().to_string(),
			source,
		}
	}

	fn scan_next(&self) -> StoreResult<u32> {
		let entries = match fs::read_dir(&self.dir) {
			Ok(entries) => entries,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(1),
			Err(e) => return Err(self.io_error(&self.dir, e)),
		};
		let highest = entries
			.filter_map(|entry| entry.ok())
			.filter_map(|entry| sequence_of(&entry.file_name().to_string_lossy()))
			.max();
		Ok(highest.unwrap_or(0) + 1)
	}
}

impl SampleStore for DirSampleStore {
	fn save(&self, image: &[u8], label: Option<&str>) -> StoreResult<()> {
		let mut next = self.next.lock();
		let sequence = match *next {
			Some(sequence) => sequence,
			None => self.scan_next()?,
		};

		fs::create_dir_all(&self.dir).map_err(|e| self.io_error(&self.dir, e))?;
		let path = self.dir.join(sample_file_name(sequence, label, image));
		fs::write(&path, image).map_err(|e| self.io_error(&path, e))?;
		*next = Some(sequence + 1);

		debug!(target = "thsr.store", path = %path.display(), "captcha sample saved");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn names_carry_sequence_label_and_hash() {
		let name = sample_file_name(7, Some("K7NQ"), b"png");
		assert!(name.starts_with("00007_K7NQ_"), "{name}");
		assert!(name.ends_with(".png"));
		assert_eq!(name.len(), "00007_K7NQ_".len() + 12 + ".png".len());
		assert_eq!(name, sample_file_name(7, Some("K7NQ"), b"png"));
		assert_ne!(name, sample_file_name(7, Some("K7NQ"), b"other"));
	}

	#[test]
	fn rejected_guesses_are_unlabeled() {
		assert!(sample_file_name(0, None, b"x").starts_with("00000_captcha_"));
		assert!(sample_file_name(0, Some("../"), b"x").starts_with("00000_captcha_"));
	}

	#[test]
	fn sequence_prefix_parses() {
		assert_eq!(sequence_of("00042_K7NQ_abc.png"), Some(42));
		assert_eq!(sequence_of("notes.txt"), None);
	}
}
