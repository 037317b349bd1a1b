//! Next-departure server for SL public transport.
//!
//! Answers "how many minutes until the next departure?" for a stop,
//! transport mode and line, using the SL Realtime Departures API with a
//! time-of-day dependent response cache.

pub mod cache;
pub mod clock;
pub mod config;
pub mod departures;
pub mod display;
pub mod domain;
pub mod selector;
pub mod sl;
pub mod web;
