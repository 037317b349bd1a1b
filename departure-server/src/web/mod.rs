//! Web layer for the departure service.
//!
//! Devices poll a single endpoint with their query in the URL and get
//! display frames back.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::create_router;
pub use state::AppState;
