//! Form models posted to the three booking steps.
//!
//! Each model serializes with the site's input names; [`FormParams`] turns a
//! model into the ordered key/value pairs that are url-encoded on submit and
//! lets callers merge step-specific extras (membership, early-bird rows).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while flattening a form model.
#[derive(Debug, Error)]
pub enum FormError {
	#[error("form model must serialize to an object")]
	NotAnObject,
	#[error("unsupported value for form field `{0}`")]
	UnsupportedValue(String),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

/// First page: journey parameters and captcha answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingForm {
	#[serde(rename = "selectStartStation")]
	pub start_station: u8,
	#[serde(rename = "selectDestinationStation")]
	pub dest_station: u8,
	#[serde(rename = "bookingMethod")]
	pub search_by: String,
	#[serde(rename = "tripCon:typesoftrip")]
	pub types_of_trip: u8,
	#[serde(rename = "toTimeInputField")]
	pub outbound_date: String,
	#[serde(rename = "toTimeTable")]
	pub outbound_time: String,
	#[serde(rename = "homeCaptcha:securityCode")]
	pub security_code: String,
	#[serde(rename = "seatCon:seatRadioGroup")]
	pub seat_prefer: String,
	#[serde(rename = "BookingS1Form:hf:0", default)]
	pub form_mark: String,
	#[serde(rename = "trainCon:trainRadioGroup")]
	pub class_type: u8,
	#[serde(rename = "backTimeInputField", default, skip_serializing_if = "Option::is_none")]
	pub inbound_date: Option<String>,
	#[serde(rename = "backTimeTable", default, skip_serializing_if = "Option::is_none")]
	pub inbound_time: Option<String>,
	#[serde(rename = "toTrainIDInputField", default, skip_serializing_if = "Option::is_none")]
	pub to_train_id: Option<u32>,
	#[serde(rename = "backTrainIDInputField", default, skip_serializing_if = "Option::is_none")]
	pub back_train_id: Option<u32>,
	#[serde(rename = "ticketPanel:rows:0:ticketAmount")]
	pub adult_ticket_num: String,
	#[serde(rename = "ticketPanel:rows:1:ticketAmount")]
	pub child_ticket_num: String,
	#[serde(rename = "ticketPanel:rows:2:ticketAmount")]
	pub disabled_ticket_num: String,
	#[serde(rename = "ticketPanel:rows:3:ticketAmount")]
	pub elder_ticket_num: String,
	#[serde(rename = "ticketPanel:rows:4:ticketAmount")]
	pub college_ticket_num: String,
}

/// Second page: the chosen train's opaque radio value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainSelectionForm {
	#[serde(rename = "TrainQueryDataViewPanel:TrainGroup")]
	pub selected_train: String,
	#[serde(rename = "BookingS2Form:hf:0", default)]
	pub form_mark: String,
}

impl TrainSelectionForm {
	pub fn new(selected_train: impl Into<String>) -> Self {
		Self {
			selected_train: selected_train.into(),
			form_mark: String::new(),
		}
	}
}

/// Third page: passenger identity and membership choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerForm {
	#[serde(rename = "dummyId")]
	pub personal_id: String,
	#[serde(rename = "dummyPhone")]
	pub phone_num: String,
	#[serde(rename = "TicketMemberSystemInputPanel:TakerMemberSystemDataView:memberSystemRadioGroup")]
	pub member_radio: String,
	#[serde(rename = "BookingS3FormSP:hf:0", default)]
	pub form_mark: String,
	#[serde(rename = "idInputRadio")]
	pub id_input_radio: u8,
	#[serde(rename = "diffOver")]
	pub diff_over: u8,
	#[serde(rename = "email", default)]
	pub email: String,
	#[serde(rename = "agree")]
	pub agree: String,
	#[serde(rename = "isGoBackM", default)]
	pub go_back_m: String,
	#[serde(rename = "backHome", default)]
	pub back_home: String,
	#[serde(rename = "TgoError")]
	pub tgo_error: u8,
}

impl PassengerForm {
	/// Builds the form with the site's fixed defaults for the remaining inputs.
	pub fn new(personal_id: impl Into<String>, phone_num: impl Into<String>, member_radio: impl Into<String>) -> Self {
		Self {
			personal_id: personal_id.into(),
			phone_num: phone_num.into(),
			member_radio: member_radio.into(),
			form_mark: String::new(),
			id_input_radio: 0,
			diff_over: 1,
			email: String::new(),
			agree: "on".to_string(),
			go_back_m: String::new(),
			back_home: String::new(),
			tgo_error: 1,
		}
	}
}

const MEMBER_PANEL: &str = "TicketMemberSystemInputPanel:TakerMemberSystemDataView:memberSystemRadioGroup";

/// Extra inputs posted when booking with a membership account.
pub fn membership_params(personal_id: &str) -> FormParams {
	let mut params = FormParams::default();
	params.insert(format!("{MEMBER_PANEL}:memberShipNumber"), personal_id);
	params.insert(format!("{MEMBER_PANEL}:memberSystemShipCheckBox"), "on");
	params
}

/// Inputs for one passenger row of the early-bird form.
pub fn early_bird_passenger_params(index: usize, type_name: &str, id_number: &str) -> FormParams {
	let prefix = format!("TicketPassengerInfoInputPanel:passengerDataView:{index}:passengerDataView2");
	let mut params = FormParams::default();
	params.insert(format!("{prefix}:passengerDataLastName"), "");
	params.insert(format!("{prefix}:passengerDataFirstName"), "");
	params.insert(format!("{prefix}:passengerDataTypeName"), type_name);
	params.insert(format!("{prefix}:passengerDataIdNumber"), id_number);
	params.insert(format!("{prefix}:passengerDataInputChoice"), "0");
	params
}

/// Ordered form key/value pairs, url-encoded on submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormParams(Vec<(String, String)>);

impl FormParams {
	/// Flattens a serializable model into string pairs, skipping `null` fields.
	pub fn from_model<T: Serialize>(model: &T) -> Result<Self, FormError> {
		let Value::Object(map) = serde_json::to_value(model)? else {
			return Err(FormError::NotAnObject);
		};

		let mut pairs = Vec::with_capacity(map.len());
		for (key, value) in map {
			let value = match value {
				Value::Null => continue,
				Value::String(s) => s,
				Value::Number(n) => n.to_string(),
				Value::Bool(b) => b.to_string(),
				Value::Array(_) | Value::Object(_) => return Err(FormError::UnsupportedValue(key)),
			};
			pairs.push((key, value));
		}
		Ok(Self(pairs))
	}

	/// Sets `key`, replacing an existing value in place.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		let key = key.into();
		let value = value.into();
		match self.0.iter_mut().find(|(k, _)| *k == key) {
			Some(slot) => slot.1 = value,
			None => self.0.push((key, value)),
		}
	}

	/// Merges `other` into `self`; later values win.
	pub fn merge(&mut self, other: FormParams) {
		for (key, value) in other.0 {
			self.insert(key, value);
		}
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn as_pairs(&self) -> &[(String, String)] {
		&self.0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn booking_form() -> BookingForm {
		BookingForm {
			start_station: 2,
			dest_station: 12,
			search_by: "radio31".to_string(),
			types_of_trip: 0,
			outbound_date: "2025/05/01".to_string(),
			outbound_time: "930A".to_string(),
			security_code: "AB12".to_string(),
			seat_prefer: "radio17".to_string(),
			form_mark: String::new(),
			class_type: 0,
			inbound_date: None,
			inbound_time: None,
			to_train_id: None,
			back_train_id: None,
			adult_ticket_num: "1F".to_string(),
			child_ticket_num: "0H".to_string(),
			disabled_ticket_num: "0W".to_string(),
			elder_ticket_num: "0E".to_string(),
			college_ticket_num: "0P".to_string(),
		}
	}

	#[test]
	fn booking_form_uses_site_field_names() {
		let params = FormParams::from_model(&booking_form()).unwrap();
		assert_eq!(params.get("selectStartStation"), Some("2"));
		assert_eq!(params.get("toTimeTable"), Some("930A"));
		assert_eq!(params.get("homeCaptcha:securityCode"), Some("AB12"));
		assert_eq!(params.get("ticketPanel:rows:4:ticketAmount"), Some("0P"));
		assert_eq!(params.get("BookingS1Form:hf:0"), Some(""));
		assert!(params.get("backTimeInputField").is_none());
	}

	#[test]
	fn passenger_form_defaults() {
		let params = FormParams::from_model(&PassengerForm::new("A123456789", "", "radio44")).unwrap();
		assert_eq!(params.get("dummyId"), Some("A123456789"));
		assert_eq!(params.get("agree"), Some("on"));
		assert_eq!(params.get("TgoError"), Some("1"));
		assert_eq!(params.get("diffOver"), Some("1"));
	}

	#[test]
	fn merge_replaces_existing_keys() {
		let mut params = FormParams::from_model(&TrainSelectionForm::new("radio20")).unwrap();
		let mut extra = FormParams::default();
		extra.insert("TrainQueryDataViewPanel:TrainGroup", "radio22");
		extra.insert("extra", "1");
		params.merge(extra);
		assert_eq!(params.get("TrainQueryDataViewPanel:TrainGroup"), Some("radio22"));
		assert_eq!(params.len(), 3);
	}

	#[test]
	fn early_bird_rows_are_indexed() {
		let params = early_bird_passenger_params(1, "早鳥", "B123456780");
		assert_eq!(
			params.get("TicketPassengerInfoInputPanel:passengerDataView:1:passengerDataView2:passengerDataIdNumber"),
			Some("B123456780")
		);
		assert_eq!(params.len(), 5);
	}

	#[test]
	fn non_object_models_are_rejected() {
		assert!(matches!(FormParams::from_model(&"plain"), Err(FormError::NotAnObject)));
	}
}
