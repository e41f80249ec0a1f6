//! Candidate dates and the interactive snatch-mode setup.

use chrono::{NaiveDate, TimeDelta};
use tracing::debug;

use super::FlowContext;
use crate::error::{Result, ValidationError};
use crate::options::{BookingOptions, DEFAULT_POLL_INTERVAL_SECS, SnatchMode};
use crate::prompt::{Field, PromptChoice, PromptSpec, parse_yes_no};
use crate::validate::{format_date, parse_date};

/// Latest snatch end date offered relative to today.
pub fn snatch_end_limit(today: NaiveDate) -> NaiveDate {
	today + TimeDelta::days(28)
}

/// Every day from `start` through `end`, inclusive.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, ValidationError> {
	if end < start {
		return Err(ValidationError::DateRange { start, end });
	}
	Ok(start.iter_days().take_while(|day| *day <= end).collect())
}

/// Dates swept by one round.
///
/// `None` stands for "the configured date, or ask"; only range mode yields
/// concrete dates, starting from the configured date or `today`.
pub fn candidate_dates(opts: &BookingOptions, today: NaiveDate) -> Result<Vec<Option<NaiveDate>>, ValidationError> {
	match opts.snatch.mode {
		Some(SnatchMode::DateRange { end }) => {
			let start = opts.date.unwrap_or(today);
			Ok(date_range(start, end)?.into_iter().map(Some).collect())
		}
		_ => Ok(vec![None]),
	}
}

/// Asks for the snatch mode when neither flags nor config chose one.
pub async fn configure_snatch_mode(ctx: &FlowContext, opts: &mut BookingOptions) -> Result<()> {
	if opts.snatch.mode.is_some() {
		return Ok(());
	}
	let resolver = ctx.resolver();

	let choices = vec![
		PromptChoice::new("1", "不啟用"),
		PromptChoice::new("2", "當天搶票（指定日期持續重試直到有票）"),
		PromptChoice::new("3", "跨日搶票（從出發日逐日搜尋到指定日期）"),
	];
	let spec = PromptSpec::new(Field::SnatchMode, "搶票模式").with_default("1").with_choices(choices);
	let picked = resolver
		.prompt(spec, |s| match s {
			"1" => Ok(0),
			"2" => Ok(1),
			"3" => Ok(2),
			_ => Err("enter 1, 2 or 3".to_string()),
		})
		.await?;

	let mode = match picked {
		1 => SnatchMode::SingleDay,
		2 => {
			let today = ctx.today;
			let last = snatch_end_limit(today);
			let spec = PromptSpec::new(Field::SnatchEnd, format!("搶票結束日期 ({} ~ {})", format_date(today), format_date(last)));
			let end = resolver
				.prompt(spec, |s| {
					let date = parse_date(s).map_err(|e| e.to_string())?;
					if date < today {
						Err("end date is before today".to_string())
					} else if date > last {
						Err(format!("end date is after {}", format_date(last)))
					} else {
						Ok(date)
					}
				})
				.await?;
			SnatchMode::DateRange { end }
		}
		_ => {
			opts.snatch.mode = Some(SnatchMode::Off);
			return Ok(());
		}
	};
	opts.snatch.mode = Some(mode);

	if opts.snatch.interval_secs.is_none() {
		let spec = PromptSpec::new(Field::SnatchPolling, "查無票時持續輪詢重試？(y/n)").with_default("n");
		if resolver.prompt(spec, parse_yes_no).await? {
			let spec = PromptSpec::new(Field::SnatchInterval, "輪詢間隔（秒）").with_default(DEFAULT_POLL_INTERVAL_SECS.to_string());
			let secs = resolver
				.prompt(spec, |s| s.parse::<u64>().ok().filter(|n| *n > 0).ok_or_else(|| "enter a positive integer".to_string()))
				.await?;
			opts.snatch.interval_secs = Some(secs);
		}
	}

	if opts.preferred_train.is_none() {
		let spec = PromptSpec::new(Field::LockTrain, "指定特定車次？(y/n)").with_default("n");
		opts.snatch.lock_train = resolver.prompt(spec, parse_yes_no).await?;
	}

	debug!(target = "thsr.schedule", ?mode, interval = ?opts.snatch.interval_secs, lock_train = opts.snatch.lock_train, "snatch mode configured");
	Ok(())
}
