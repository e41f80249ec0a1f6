//! Passenger page: identity, membership, early-bird rows.

use thsr_protocol::{FormParams, PassengerForm, early_bird_passenger_params, membership_params};
use tracing::{info, warn};

use super::FlowContext;
use crate::error::{Result, TransportError};
use crate::events::BookingEvent;
use crate::model::{EarlyBirdForm, Page, PassengerPage};
use crate::options::{BookingOptions, remember};
use crate::prompt::{Field, PromptSpec, Resolution, parse_yes_no};
use crate::session::Session;
use crate::validate::{validate_personal_id, validate_phone};

/// Final response and the form that produced it.
#[derive(Debug, Clone)]
pub struct PassengerSubmission {
	pub response: Page,
	pub form: PassengerForm,
	/// Whether the accepted submission used membership.
	pub membership: bool,
}

pub(crate) fn personal_id_field(configured: Option<&str>, recorded: Option<&str>) -> Resolution<String> {
	match configured.or(recorded).filter(|id| !id.is_empty()) {
		Some(id) => Resolution::Resolved(id.to_string()),
		None => Resolution::NeedsPrompt(PromptSpec::new(Field::PersonalId, "輸入身分證字號")),
	}
}

pub(crate) fn phone_field(configured: Option<&str>, recorded: Option<&str>) -> Resolution<String> {
	let recorded = recorded.filter(|phone| !phone.is_empty());
	match configured.or(recorded) {
		Some(phone) => Resolution::Resolved(phone.to_string()),
		None => Resolution::NeedsPrompt(PromptSpec::new(Field::Phone, "輸入手機號碼（選填）").with_default("")),
	}
}

pub(crate) fn membership_field(configured: Option<bool>) -> Resolution<bool> {
	match configured {
		Some(flag) => Resolution::Resolved(flag),
		None => Resolution::NeedsPrompt(PromptSpec::new(Field::Membership, "使用高鐵會員身分？(y/n)").with_default("n")),
	}
}

pub struct PassengerConfirmer<'a> {
	ctx: &'a FlowContext,
}

impl<'a> PassengerConfirmer<'a> {
	pub fn new(ctx: &'a FlowContext) -> Self {
		Self { ctx }
	}

	/// Fills and posts the passenger page found in `train_response`.
	///
	/// A membership submission rejected for its credential is resent once
	/// as a non-member; that retry is never repeated.
	pub async fn confirm(&self, session: &mut Box<dyn Session>, train_response: &Page, opts: &mut BookingOptions) -> Result<PassengerSubmission> {
		let page = self.ctx.deps.parser.parse_passenger_page(train_response);
		let record = self.ctx.history.as_ref();
		let resolver = self.ctx.resolver();

		let personal_id = resolver
			.resolve(
				personal_id_field(opts.personal_id.as_deref(), record.map(|r| r.personal_id.as_str())),
				|s| validate_personal_id(s).map_err(|e| e.to_string()),
			)
			.await?;
		let personal_id = remember(&mut opts.personal_id, personal_id).clone();

		let use_membership = resolver.resolve(membership_field(opts.use_membership), parse_yes_no).await?;
		let use_membership = *remember(&mut opts.use_membership, use_membership);

		let phone = resolver
			.resolve(phone_field(opts.phone.as_deref(), record.map(|r| r.phone.as_str())), |s| {
				validate_phone(s).map_err(|e| e.to_string())
			})
			.await?;
		let phone = remember(&mut opts.phone, phone).clone();

		let early_bird = match &page.early_bird {
			Some(form) => Some(self.early_bird_params(form, &personal_id).await?),
			None => None,
		};

		let first = self.submit(session, &page, &personal_id, &phone, use_membership, early_bird.clone()).await?;
		if !use_membership {
			return Ok(first);
		}
		let feedback = self.ctx.deps.parser.parse_error_feedback(&first.response);
		if !feedback.is_membership_invalid() {
			return Ok(first);
		}

		warn!(target = "thsr.passenger", messages = ?feedback.messages(), "membership rejected, resubmitting as non-member");
		self.ctx.emit(BookingEvent::MembershipFallback);
		self.submit(session, &page, &personal_id, &phone, false, early_bird).await
	}

	async fn submit(
		&self,
		session: &mut Box<dyn Session>,
		page: &PassengerPage,
		personal_id: &str,
		phone: &str,
		membership: bool,
		early_bird: Option<FormParams>,
	) -> Result<PassengerSubmission> {
		let radio = if membership { &page.member_radio } else { &page.non_member_radio };
		let radio = radio
			.as_deref()
			.ok_or_else(|| TransportError::MalformedPage("passenger page has no membership radio".to_string()))?;

		let form = PassengerForm::new(personal_id, phone, radio);
		let mut params = FormParams::from_model(&form)?;
		if membership {
			params.merge(membership_params(personal_id));
		}
		if let Some(extra) = early_bird {
			params.merge(extra);
		}

		self.ctx.cancel.check()?;
		info!(target = "thsr.passenger", membership, "submitting passenger data");
		let response = session.submit_passenger_info(&params).await?;
		Ok(PassengerSubmission { response, form, membership })
	}

	/// One id per early-bird passenger; the first defaults to the booker.
	async fn early_bird_params(&self, form: &EarlyBirdForm, personal_id: &str) -> Result<FormParams> {
		let resolver = self.ctx.resolver();
		let mut params = FormParams::default();
		for index in 0..form.passenger_count {
			let mut spec = PromptSpec::new(Field::EarlyBirdId(index), format!("旅客 {} 身分證字號", index + 1));
			if index == 0 {
				spec = spec.with_default(personal_id);
			}
			let id = resolver.prompt(spec, |s| validate_personal_id(s).map_err(|e| e.to_string())).await?;
			params.merge(early_bird_passenger_params(index, &form.type_name, &id));
		}
		Ok(params)
	}
}
