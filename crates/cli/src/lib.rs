//! `thsr` command-line front end.
//!
//! Flags and `~/.thsr.toml` become [`thsr::BookingOptions`]; the live-site
//! collaborators from `thsr-runtime` and the console prompter and sink from
//! [`console`] are wired into a [`thsr::BookingOrchestrator`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod logging;
pub mod output;
