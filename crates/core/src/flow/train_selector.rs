//! Choosing one train from the listed services.

use thsr_protocol::{FormParams, TrainSelectionForm};
use tracing::{debug, info};

use super::FlowContext;
use crate::error::{BookingError, Result, TransportError};
use crate::events::BookingEvent;
use crate::model::{Page, Train};
use crate::prompt::{Field, PromptChoice, PromptSpec, parse_index};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
	/// First train, or the exact preferred id when set.
	Automatic { preferred: Option<u32> },
	/// Ask the user; a preferred id still short-circuits the question.
	Interactive { preferred: Option<u32> },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Selection<'t> {
	Chosen(&'t Train),
	/// The date has trains, just not the wanted one.
	PreferredTrainUnavailable(u32),
}

pub struct TrainSelector<'a> {
	ctx: &'a FlowContext,
}

impl<'a> TrainSelector<'a> {
	pub fn new(ctx: &'a FlowContext) -> Self {
		Self { ctx }
	}

	/// Picks without asking. `trains` must be non-empty.
	pub fn choose_automatic(trains: &[Train], preferred: Option<u32>) -> Result<Selection<'_>> {
		let first = trains
			.first()
			.ok_or_else(|| BookingError::InvalidState("train selection called with an empty train list".to_string()))?;
		match preferred {
			Some(id) => Ok(trains
				.iter()
				.find(|t| t.id == id)
				.map_or(Selection::PreferredTrainUnavailable(id), Selection::Chosen)),
			None => Ok(Selection::Chosen(first)),
		}
	}

	/// Picks a train according to `mode`. `trains` must be non-empty.
	pub async fn select<'t>(&self, trains: &'t [Train], mode: SelectionMode) -> Result<Selection<'t>> {
		match mode {
			SelectionMode::Automatic { preferred } | SelectionMode::Interactive { preferred: preferred @ Some(_) } => {
				let selection = Self::choose_automatic(trains, preferred)?;
				match &selection {
					Selection::Chosen(train) => self.ctx.emit(BookingEvent::TrainSelected { train: (*train).clone() }),
					Selection::PreferredTrainUnavailable(id) => {
						debug!(target = "thsr", train_id = id, offered = trains.len(), "preferred train not offered");
						self.ctx.emit(BookingEvent::PreferredTrainMissing { train_id: *id });
					}
				}
				Ok(selection)
			}
			SelectionMode::Interactive { preferred: None } => self.ask(trains).await.map(Selection::Chosen),
		}
	}

	/// Lists the trains and reads a 1-based choice, defaulting to the first.
	pub async fn ask<'t>(&self, trains: &'t [Train]) -> Result<&'t Train> {
		if trains.is_empty() {
			return Err(BookingError::InvalidState("train selection called with an empty train list".to_string()));
		}
		self.ctx.emit(BookingEvent::TrainsListed { trains: trains.to_vec() });
		let choices = trains
			.iter()
			.enumerate()
			.map(|(idx, t)| PromptChoice::new((idx + 1).to_string(), format!("{} {}~{} ({}) {}", t.id, t.departure, t.arrival, t.travel_time, t.discount)))
			.collect();
		let spec = PromptSpec::new(Field::Train, "選擇車次").with_default("1").with_choices(choices);
		let idx = self.ctx.resolver().prompt(spec, |s| parse_index(s, trains.len())).await?;
		Ok(&trains[idx])
	}

	/// Posts the chosen train's radio value.
	pub async fn submit(&self, session: &mut Box<dyn Session>, train: &Train) -> Result<(Page, TrainSelectionForm), TransportError> {
		let form = TrainSelectionForm::new(train.form_value.clone());
		let params = FormParams::from_model(&form).map_err(|e| TransportError::MalformedPage(e.to_string()))?;
		info!(target = "thsr", train_id = train.id, departure = %train.departure, "confirming train");
		let response = session.submit_train_selection(&params).await?;
		Ok((response, form))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn train(id: u32) -> Train {
		Train {
			id,
			departure: "09:30".into(),
			arrival: "11:00".into(),
			travel_time: "1:30".into(),
			discount: String::new(),
			form_value: format!("radio{id}"),
		}
	}

	#[test]
	fn missing_preferred_train_is_reported() {
		let trains = [train(601), train(620)];
		let selection = TrainSelector::choose_automatic(&trains, Some(611)).unwrap();
		assert_eq!(selection, Selection::PreferredTrainUnavailable(611));
	}

	#[test]
	fn preferred_train_matches_exactly() {
		let trains = [train(601), train(620)];
		assert_eq!(TrainSelector::choose_automatic(&trains, Some(620)).unwrap(), Selection::Chosen(&trains[1]));
		assert_eq!(TrainSelector::choose_automatic(&trains, None).unwrap(), Selection::Chosen(&trains[0]));
	}

	#[test]
	fn empty_list_is_invalid_state() {
		assert!(matches!(TrainSelector::choose_automatic(&[], None), Err(BookingError::InvalidState(_))));
	}
}
