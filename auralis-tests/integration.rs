//! Integration tests for Auralis
//!
//! Drive the complete HTTP application: routing, path normalisation, the
//! streaming endpoint and the survey API with export.

#[path = "style.rs"]
mod style;

#[path = "integration/support.rs"]
mod support;

#[path = "integration/stream_endpoint.rs"]
mod stream_endpoint;

#[path = "integration/survey_api.rs"]
mod survey_api;
