//! Booking state machine for the THSR online reservation site.
//!
//! The crate owns control flow only: a bounded captcha retry loop, train
//! choice, passenger confirmation with membership fallback, and the date and
//! round sweeps of snatch mode. Network access, HTML scraping, captcha
//! solving, console I/O and persistence are reached through the traits in
//! [`session`], [`parser`], [`captcha`], [`prompt`], [`events`] and [`store`],
//! which keeps every branch drivable from the in-memory fakes in [`fake`].
//!
//! ```ignore
//! let orchestrator = BookingOrchestrator::new(collaborators)
//!     .with_cancel_token(cancel.clone())
//!     .with_history(record);
//! match orchestrator.run(&mut options).await {
//!     RunOutcome::Success(booked) => println!("{}", booked.ticket.id),
//!     other => eprintln!("{other:?}"),
//! }
//! ```

pub mod cancel;
pub mod captcha;
pub mod error;
pub mod events;
pub mod fake;
pub mod flow;
pub mod model;
pub mod options;
pub mod parser;
pub mod prompt;
pub mod session;
pub mod store;
pub mod validate;

pub use cancel::CancelToken;
pub use captcha::{CaptchaAnswer, CaptchaSolver, SolverError};
pub use error::{BookingError, Result, TransportError, ValidationError};
pub use events::{BookingEvent, EventSink, NullSink};
pub use flow::{AttemptResult, Booked, BookingOrchestrator, Collaborators, FlowContext, RetryPolicy, RunOutcome};
pub use model::{BookingPage, ErrorFeedback, HistoryRecord, Page, PassengerPage, TicketInfo, Train};
pub use options::{BookingOptions, SnatchMode, SnatchOptions};
pub use parser::PageParser;
pub use prompt::{Field, FieldResolver, PromptChoice, PromptSpec, Prompter, Resolution};
pub use session::{Session, SessionFactory};
pub use store::{HistoryStore, NoopStore, SampleStore, StoreError};
pub use thsr_protocol as protocol;
