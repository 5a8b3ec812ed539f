//! Auralis Web - HTTP server for the listening-test survey

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
//!
//! Exposes byte-range audio streaming for the browser player and a JSON API
//! for participant registration, questionnaire answers and clip ratings.

pub mod handlers;
pub mod server;

// Re-export main types
pub use server::{AppState, build_app, build_router, run_server, serve};
