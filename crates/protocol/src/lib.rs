//! Wire vocabulary for the THSR booking site.
//!
//! This crate contains the serde-serializable form models posted to the
//! booking site together with the fixed vocabulary those forms use:
//! station ids, departure time slots, ticket-count codes, seat and cabin
//! options. These types represent the "protocol layer" - the shapes of data
//! as they appear in the site's HTML forms.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond formatting and (de)serialization
//! * 1:1 with the site: Field names match the site's form input names
//! * Stable: Changes only when the booking site changes its forms
//!
//! The retry/scheduling logic that fills these forms lives in `thsr-core`.

pub mod form;
pub mod station;
pub mod ticket;
pub mod time_table;

pub use form::*;
pub use station::*;
pub use ticket::*;
pub use time_table::*;
