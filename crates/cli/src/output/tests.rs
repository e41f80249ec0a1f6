use thsr::protocol::{Station, TIME_TABLE};
use thsr::{BookingError, TransportError};

use super::*;

#[test]
fn failed_result_serializes_error_without_data() {
	let result: EmptyResult = ResultBuilder::new("book")
		.error_with_details(ErrorCode::RemoteError, "重複訂位", serde_json::json!({ "messages": ["重複訂位"] }))
		.build();
	let json = serde_json::to_value(&result).unwrap();
	assert_eq!(json["ok"], false);
	assert_eq!(json["command"], "book");
	assert_eq!(json["error"]["code"], "REMOTE_ERROR");
	assert_eq!(json["error"]["details"]["messages"][0], "重複訂位");
	assert!(json.get("data").is_none());
	assert_eq!(json["schemaVersion"], SCHEMA_VERSION);
}

#[test]
fn ok_requires_data() {
	let result = ResultBuilder::new("stations").data(vec![StationEntry::from(Station::Taipei)]).build();
	assert!(result.ok);
	let json = serde_json::to_value(&result).unwrap();
	assert_eq!(json["data"][0]["id"], 2);
	assert_eq!(json["data"][0]["nameZh"], "台北");

	let empty: EmptyResult = ResultBuilder::new("stations").build();
	assert!(!empty.ok);
}

#[test]
fn inputs_skip_unset_fields() {
	let inputs = CommandInputs {
		from_station: Some("Taipei".into()),
		..CommandInputs::default()
	};
	let result: EmptyResult = ResultBuilder::new("book")
		.inputs(inputs)
		.diagnostic_with_source(DiagnosticLevel::Warning, "ignored", "~/.thsr.toml")
		.build();
	let json = serde_json::to_value(&result).unwrap();
	assert_eq!(json["inputs"], serde_json::json!({ "fromStation": "Taipei" }));
	assert_eq!(json["diagnostics"][0]["level"], "warning");
	assert_eq!(json["diagnostics"][0]["source"], "~/.thsr.toml");
}

#[test]
fn time_slots_carry_24_hour_times() {
	let first = TimeSlot::new(1, TIME_TABLE[0]);
	assert_eq!(first.token, "1201A");
	assert_eq!(first.time, "00:01");
	assert_eq!(TimeSlot::new(10, "930A").time, "09:30");
	assert_eq!(TimeSlot::new(20, "1230P").time, "12:30");
}

#[test]
fn booking_errors_map_to_codes() {
	assert_eq!(ErrorCode::for_booking_error(&BookingError::NoInventory), ErrorCode::NoInventory);
	assert_eq!(ErrorCode::for_booking_error(&BookingError::PreferredTrainUnavailable(611)), ErrorCode::TrainUnavailable);
	assert_eq!(
		ErrorCode::for_booking_error(&BookingError::CaptchaExhausted {
			attempts: 30,
			messages: Vec::new()
		}),
		ErrorCode::CaptchaFailed
	);
	let transport = BookingError::Transport(TransportError::Status {
		url: "https://irs.thsrc.com.tw/IMINT/".into(),
		status: 503,
	});
	assert_eq!(ErrorCode::for_booking_error(&transport), ErrorCode::NetworkError);
	assert_eq!(ErrorCode::Cancelled.to_string(), "CANCELLED");
}

#[test]
fn format_parses_case_insensitively() {
	assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
	assert_eq!(OutputFormat::default(), OutputFormat::Text);
	assert!("toon".parse::<OutputFormat>().is_err());
	assert_eq!(OutputFormat::Ndjson.to_string(), "ndjson");
}
