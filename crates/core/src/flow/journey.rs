//! Journey parameters of the first page and their resolution order:
//! configured value, then the picked history record, then a prompt.

use chrono::{NaiveDate, TimeDelta};
use thsr_protocol::{BookingForm, CabinClass, DEFAULT_TIME_ID, MAX_TICKET_NUM, SeatPreference, Station, TIME_TABLE, TicketType, format_time_token, time_id, time_token};

use super::FlowContext;
use crate::error::{Result, TransportError};
use crate::model::{BookingPage, HistoryRecord};
use crate::options::{BookingOptions, remember};
use crate::prompt::{Field, PromptChoice, PromptSpec, Resolution};
use crate::validate::{format_date, parse_date};

/// Days ahead of today the site opens for sale.
pub const DAYS_BEFORE_BOOKING_AVAILABLE: i64 = 27;

/// Fully resolved first-page parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Journey {
	pub from: Station,
	pub to: Station,
	pub date: NaiveDate,
	pub time_id: usize,
	pub adult_count: u8,
	pub student_count: u8,
	pub seat: SeatPreference,
	pub class: CabinClass,
}

impl Journey {
	/// Fills every empty option with this journey's value.
	pub fn record_into(&self, opts: &mut BookingOptions) {
		remember(&mut opts.from_station, self.from);
		remember(&mut opts.to_station, self.to);
		remember(&mut opts.date, self.date);
		remember(&mut opts.time_id, self.time_id);
		remember(&mut opts.adult_count, self.adult_count);
		remember(&mut opts.student_count, self.student_count);
		remember(&mut opts.seat_prefer, self.seat);
		remember(&mut opts.class_type, self.class);
	}

	pub fn to_form(&self, page: &BookingPage, security_code: &str) -> Result<BookingForm, TransportError> {
		let seat_prefer = page
			.seat_options
			.get(self.seat.index())
			.or_else(|| page.seat_options.first())
			.ok_or_else(|| TransportError::MalformedPage("booking page has no seat options".to_string()))?;
		let outbound_time = time_token(self.time_id).ok_or_else(|| TransportError::MalformedPage(format!("time slot {} out of range", self.time_id)))?;

		Ok(BookingForm {
			start_station: self.from.id(),
			dest_station: self.to.id(),
			search_by: page.search_by.clone(),
			types_of_trip: page.types_of_trip,
			outbound_date: format_date(self.date),
			outbound_time: outbound_time.to_string(),
			security_code: security_code.to_string(),
			seat_prefer: seat_prefer.clone(),
			form_mark: String::new(),
			class_type: self.class.value(),
			inbound_date: None,
			inbound_time: None,
			to_train_id: None,
			back_train_id: None,
			adult_ticket_num: TicketType::Adult.amount(self.adult_count),
			child_ticket_num: TicketType::Child.amount(0),
			disabled_ticket_num: TicketType::Disabled.amount(0),
			elder_ticket_num: TicketType::Elder.amount(0),
			college_ticket_num: TicketType::College.amount(self.student_count),
		})
	}
}

fn station_choices() -> Vec<PromptChoice> {
	Station::ALL.iter().map(|s| PromptChoice::new(s.id().to_string(), s.name_zh())).collect()
}

fn parse_station(input: &str) -> std::result::Result<Station, String> {
	input.parse()
}

pub(crate) fn station_field(field: Field, configured: Option<Station>, recorded: Option<Station>, default: Station) -> Resolution<Station> {
	if let Some(station) = configured.or(recorded) {
		return Resolution::Resolved(station);
	}
	let label = if field == Field::FromStation { "啟程站" } else { "到達站" };
	Resolution::NeedsPrompt(
		PromptSpec::new(field, format!("選擇{label}"))
			.with_default(default.id().to_string())
			.with_choices(station_choices()),
	)
}

pub(crate) fn date_field(configured: Option<NaiveDate>, today: NaiveDate) -> Resolution<NaiveDate> {
	match configured {
		Some(date) => Resolution::Resolved(date),
		None => {
			let last = today + TimeDelta::days(DAYS_BEFORE_BOOKING_AVAILABLE);
			Resolution::NeedsPrompt(
				PromptSpec::new(Field::Date, format!("選擇出發日期 ({} ~ {})", format_date(today), format_date(last))).with_default(format_date(today)),
			)
		}
	}
}

pub(crate) fn time_field(configured: Option<usize>, recorded: Option<&str>) -> Resolution<usize> {
	if let Some(id) = configured.or_else(|| recorded.and_then(time_id)) {
		return Resolution::Resolved(id);
	}
	let choices = TIME_TABLE
		.iter()
		.enumerate()
		.map(|(idx, token)| PromptChoice::new((idx + 1).to_string(), format_time_token(token).unwrap_or_else(|| token.to_string())))
		.collect();
	Resolution::NeedsPrompt(
		PromptSpec::new(Field::Time, "選擇出發時間")
			.with_default(DEFAULT_TIME_ID.to_string())
			.with_choices(choices),
	)
}

fn parse_time_id(input: &str) -> std::result::Result<usize, String> {
	input
		.parse::<usize>()
		.ok()
		.filter(|id| time_token(*id).is_some())
		.ok_or_else(|| format!("enter a slot between 1 and {}", TIME_TABLE.len()))
}

pub(crate) fn adult_field(configured: Option<u8>, recorded: Option<&str>) -> Resolution<u8> {
	if let Some(count) = configured.or_else(|| recorded.and_then(|amount| TicketType::Adult.parse_amount(amount))) {
		return Resolution::Resolved(count);
	}
	Resolution::NeedsPrompt(PromptSpec::new(Field::AdultCount, format!("{}票數 (0 ~ {MAX_TICKET_NUM})", TicketType::Adult.label_zh())).with_default("1"))
}

fn parse_ticket_count(input: &str) -> std::result::Result<u8, String> {
	input
		.parse::<u8>()
		.ok()
		.filter(|n| *n <= MAX_TICKET_NUM)
		.ok_or_else(|| format!("enter a count between 0 and {MAX_TICKET_NUM}"))
}

pub(crate) fn seat_field(configured: Option<SeatPreference>) -> Resolution<SeatPreference> {
	match configured {
		Some(seat) => Resolution::Resolved(seat),
		None => {
			let choices = [SeatPreference::None, SeatPreference::Window, SeatPreference::Aisle]
				.into_iter()
				.map(|s| PromptChoice::new(s.index().to_string(), s.label_zh()))
				.collect();
			Resolution::NeedsPrompt(PromptSpec::new(Field::SeatPreference, "座位偏好").with_default("0").with_choices(choices))
		}
	}
}

pub(crate) fn class_field(configured: Option<CabinClass>) -> Resolution<CabinClass> {
	match configured {
		Some(class) => Resolution::Resolved(class),
		None => {
			let choices = [CabinClass::Standard, CabinClass::Business]
				.into_iter()
				.map(|c| PromptChoice::new(c.value().to_string(), c.label_zh()))
				.collect();
			Resolution::NeedsPrompt(PromptSpec::new(Field::CabinClass, "車廂類型").with_default("0").with_choices(choices))
		}
	}
}

/// Resolves the journey for one attempt.
///
/// `date_override` is the date being swept in range mode; it wins over the
/// configured date without replacing it.
pub async fn resolve_journey(ctx: &FlowContext, opts: &BookingOptions, date_override: Option<NaiveDate>) -> Result<Journey> {
	let resolver = ctx.resolver();
	let record: Option<&HistoryRecord> = ctx.history.as_ref();

	let from = resolver
		.resolve(station_field(Field::FromStation, opts.from_station, record.map(|r| r.start_station), Station::DEFAULT_ORIGIN), parse_station)
		.await?;
	let to = resolver
		.resolve(station_field(Field::ToStation, opts.to_station, record.map(|r| r.dest_station), Station::DEFAULT_DESTINATION), parse_station)
		.await?;
	let date = resolver
		.resolve(date_field(date_override.or(opts.date), ctx.today), |s| parse_date(s).map_err(|e| e.to_string()))
		.await?;
	let time_id = resolver
		.resolve(time_field(opts.time_id, record.map(|r| r.outbound_time.as_str())), parse_time_id)
		.await?;
	let adult_count = resolver
		.resolve(adult_field(opts.adult_count, record.map(|r| r.adult_num.as_str())), parse_ticket_count)
		.await?;
	let student_count = opts.student_count.unwrap_or(0);
	let seat = resolver
		.resolve(seat_field(opts.seat_prefer), |s| {
			s.parse::<usize>().ok().and_then(SeatPreference::from_index).ok_or_else(|| "enter 0, 1 or 2".to_string())
		})
		.await?;
	let class = resolver
		.resolve(class_field(opts.class_type), |s| {
			s.parse::<u8>().ok().and_then(CabinClass::from_value).ok_or_else(|| "enter 0 or 1".to_string())
		})
		.await?;

	Ok(Journey {
		from,
		to,
		date,
		time_id,
		adult_count,
		student_count,
		seat,
		class,
	})
}
