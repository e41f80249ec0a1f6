//! Page scraping with a small tag and attribute scanner.
//!
//! The site's markup is server-rendered Wicket output with stable ids and
//! classes, so a tokenizer over start tags plus "text after this tag" lookups
//! covers every field the flow needs.

use std::sync::LazyLock;

use regex_lite::Regex;
use thsr::model::EarlyBirdForm;
use thsr::{BookingPage, ErrorFeedback, Page, PageParser, PassengerPage, TicketInfo, Train, TransportError};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<([a-z][a-z0-9]*)\b([^>]*)>").expect("TAG_RE should compile"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#).expect("ATTR_RE should compile")
});
static ANY_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("ANY_TAG_RE should compile"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("SPACE_RE should compile"));

const BOOKING_FORM_ID: &str = "BookingS1Form";
const CAPTCHA_IMAGE_ID: &str = "BookingS1Form_homeCaptcha_passCode";
const EARLY_BIRD_TYPE_INPUT: &str = "TicketPassengerInfoInputPanel:passengerDataView:0:passengerDataView2:passengerDataTypeName";

/// One start tag with its decoded attributes.
#[derive(Debug, Clone)]
struct Tag {
	name: String,
	attrs: Vec<(String, String)>,
	start: usize,
	/// Byte offset just past the closing `>`.
	end: usize,
}

impl Tag {
	fn is(&self, name: &str) -> bool {
		self.name.eq_ignore_ascii_case(name)
	}

	fn attr(&self, key: &str) -> Option<&str> {
		self.attrs.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v.as_str())
	}

	fn has(&self, key: &str) -> bool {
		self.attrs.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
	}

	fn has_class(&self, class: &str) -> bool {
		self.attr("class").is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
	}
}

fn tags(html: &str) -> impl Iterator<Item = Tag> + '_ {
	TAG_RE.captures_iter(html).filter_map(|caps| {
		let whole = caps.get(0)?;
		Some(Tag {
			name: caps.get(1)?.as_str().to_string(),
			attrs: parse_attrs(caps.get(2).map_or("", |m| m.as_str())),
			start: whole.start(),
			end: whole.end(),
		})
	})
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
	ATTR_RE
		.captures_iter(raw)
		.filter_map(|caps| {
			let key = caps.get(1)?.as_str().to_string();
			let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)).map_or("", |m| m.as_str());
			Some((key, decode_entities(value)))
		})
		.collect()
}

fn decode_entities(s: &str) -> String {
	s.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&apos;", "'")
		.replace("&nbsp;", " ")
		.replace("&amp;", "&")
}

fn clean_text(fragment: &str) -> String {
	let stripped = ANY_TAG_RE.replace_all(fragment, " ");
	let decoded = decode_entities(&stripped);
	SPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// Non-empty text runs that follow byte offset `from`.
fn text_runs(html: &str, from: usize) -> impl Iterator<Item = String> + '_ {
	html.get(from..)
		.unwrap_or_default()
		.split('<')
		.enumerate()
		.filter_map(|(idx, chunk)| if idx == 0 { Some(chunk) } else { chunk.split_once('>').map(|(_, text)| text) })
		.map(clean_text)
		.filter(|text| !text.is_empty())
}

fn first_text_after(html: &str, tag: &Tag) -> Option<String> {
	text_runs(html, tag.end).next()
}

fn text_by_id(html: &str, id: &str) -> String {
	tags(html)
		.find(|t| t.attr("id") == Some(id))
		.and_then(|t| first_text_after(html, &t))
		.unwrap_or_default()
}

fn text_by_class(html: &str, class: &str) -> String {
	tags(html)
		.find(|t| t.has_class(class))
		.and_then(|t| first_text_after(html, &t))
		.unwrap_or_default()
}

fn input_value_by_id(html: &str, id: &str) -> Option<String> {
	tags(html)
		.find(|t| t.is("input") && t.attr("id") == Some(id))
		.and_then(|t| t.attr("value").map(str::to_string))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectOption {
	value: String,
	selected: bool,
}

fn select_options(html: &str, name: &str) -> Vec<SelectOption> {
	let Some(select) = tags(html).find(|t| t.is("select") && t.attr("name") == Some(name)) else {
		return Vec::new();
	};
	let body = &html[select.end..];
	let body = &body[..body.find("</select").unwrap_or(body.len())];
	tags(body)
		.filter(|t| t.is("option"))
		.filter_map(|t| {
			Some(SelectOption {
				value: t.attr("value")?.to_string(),
				selected: t.has("selected"),
			})
		})
		.collect()
}

/// Site-relative path of the captcha image on the first page.
pub fn captcha_image_path(html: &str) -> Option<String> {
	tags(html)
		.find(|t| t.is("img") && t.attr("id") == Some(CAPTCHA_IMAGE_ID))
		.and_then(|t| t.attr("src").map(str::to_string))
}

/// Scraper for the live site's HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl PageParser for HtmlParser {
	fn parse_booking_page(&self, page: &Page) -> Result<BookingPage, TransportError> {
		let html = page.text();
		if !tags(&html).any(|t| t.is("form") && t.attr("id") == Some(BOOKING_FORM_ID)) {
			return Err(TransportError::MalformedPage(format!("{BOOKING_FORM_ID} not found at {}", page.url)));
		}

		let seat_options = select_options(&html, "seatCon:seatRadioGroup").into_iter().map(|o| o.value).collect();
		let types_of_trip = select_options(&html, "tripCon:typesoftrip")
			.into_iter()
			.find(|o| o.selected)
			.and_then(|o| o.value.parse().ok())
			.unwrap_or(0);
		let search_by = tags(&html)
			.find(|t| t.is("input") && t.attr("name") == Some("bookingMethod") && t.has("checked"))
			.and_then(|t| t.attr("value").map(str::to_string))
			.ok_or_else(|| TransportError::MalformedPage("no checked bookingMethod".to_string()))?;

		Ok(BookingPage {
			seat_options,
			types_of_trip,
			search_by,
		})
	}

	fn parse_available_trains(&self, page: &Page) -> Vec<Train> {
		let html = page.text();
		let inputs: Vec<Tag> = tags(&html).filter(|t| t.is("input") && t.has("querycode")).collect();

		inputs
			.iter()
			.enumerate()
			.filter_map(|(idx, tag)| {
				let segment_end = inputs.get(idx + 1).map_or(html.len(), |next| next.start);
				let segment = &html[tag.end..segment_end];
				Some(Train {
					id: tag.attr("querycode")?.trim().parse().ok()?,
					departure: tag.attr("querydeparture")?.to_string(),
					arrival: tag.attr("queryarrival")?.to_string(),
					travel_time: tag.attr("queryestimatedtime").unwrap_or_default().to_string(),
					discount: discounts(segment),
					form_value: tag.attr("value")?.to_string(),
				})
			})
			.collect()
	}

	fn parse_error_feedback(&self, page: &Page) -> ErrorFeedback {
		let html = page.text();
		let mut messages: Vec<String> = Vec::new();
		for tag in tags(&html).filter(|t| t.is("span") && t.has_class("feedbackPanelERROR")) {
			let body = &html[tag.end..];
			let message = clean_text(&body[..body.find("</span").unwrap_or(body.len())]);
			if !message.is_empty() {
				messages.push(message);
			}
		}
		ErrorFeedback::new(messages)
	}

	fn parse_passenger_page(&self, page: &Page) -> PassengerPage {
		let html = page.text();
		let rows = tags(&html).filter(|t| t.has_class("superEarlyBird")).count();
		let early_bird = (rows > 0)
			.then(|| {
				tags(&html)
					.find(|t| t.is("input") && t.attr("name") == Some(EARLY_BIRD_TYPE_INPUT))
					.and_then(|t| t.attr("value").map(str::to_string))
			})
			.flatten()
			.map(|type_name| EarlyBirdForm {
				passenger_count: rows,
				type_name,
			});

		PassengerPage {
			member_radio: input_value_by_id(&html, "memberSystemRadio1"),
			non_member_radio: input_value_by_id(&html, "memberSystemRadio3"),
			early_bird,
		}
	}

	fn parse_ticket_info(&self, page: &Page) -> TicketInfo {
		let html = page.text();
		let payment_deadline = tags(&html)
			.find(|t| t.has_class("payment-status"))
			.and_then(|t| text_runs(&html, t.end).take(4).find(|run| run.chars().any(|c| c.is_ascii_digit())))
			.unwrap_or_default();
		let seats = tags(&html)
			.filter(|t| t.has_class("seat-label"))
			.filter_map(|t| first_text_after(&html, &t))
			.collect();

		TicketInfo {
			id: text_by_class(&html, "pnr-code"),
			payment_deadline,
			total_price: text_by_id(&html, "setTrainTotalPriceValue"),
			date: text_by_class(&html, "date"),
			start_station: text_by_class(&html, "departure-stn"),
			dest_station: text_by_class(&html, "arrival-stn"),
			departure: text_by_id(&html, "setTrainDeparture0"),
			arrival: text_by_id(&html, "setTrainArrival0"),
			train_id: text_by_id(&html, "setTrainCode0"),
			seat_class: text_by_class(&html, "info-data"),
			seats,
		}
	}
}

fn discounts(segment: &str) -> String {
	tags(segment)
		.filter(|t| t.has_class("early-bird") || t.has_class("student"))
		.filter_map(|t| first_text_after(segment, &t))
		.collect::<Vec<_>>()
		.join(", ")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn attributes_cover_quoted_bare_and_boolean_forms() {
		let tag = tags(r#"<input type=radio name='bookingMethod' value="radio31" checked>"#).next().unwrap();
		assert!(tag.is("INPUT"));
		assert_eq!(tag.attr("type"), Some("radio"));
		assert_eq!(tag.attr("name"), Some("bookingMethod"));
		assert_eq!(tag.attr("value"), Some("radio31"));
		assert!(tag.has("checked"));
		assert!(!tag.has("disabled"));
	}

	#[test]
	fn attribute_entities_are_decoded() {
		let html = r#"<img id="BookingS1Form_homeCaptcha_passCode" src="/IMINT/?wicket:interface=:0:passCode&amp;wicket:antiCache=17" />"#;
		assert_eq!(captcha_image_path(html).as_deref(), Some("/IMINT/?wicket:interface=:0:passCode&wicket:antiCache=17"));
	}

	#[test]
	fn text_runs_skip_markup_and_blank_runs() {
		let html = "<p class=\"pnr-code\">\n  <span>09012345</span></p><p>next</p>";
		let runs: Vec<String> = text_runs(html, 0).collect();
		assert_eq!(runs, ["09012345", "next"]);
	}

	#[test]
	fn classes_match_whole_words() {
		let tag = tags(r#"<span class="feedbackPanelERROR big">"#).next().unwrap();
		assert!(tag.has_class("feedbackPanelERROR"));
		assert!(!tag.has_class("feedback"));
	}

	#[test]
	fn missing_select_yields_no_options() {
		assert!(select_options("<form></form>", "seatCon:seatRadioGroup").is_empty());
	}
}
