//! Style Enforcement Tests
//!
//! Scans the production sources of every workspace crate for patterns that
//! clippy does not reject on its own.
//!
//! - `production_code` - No panicking shortcuts or dead-code allowances

#[path = "style/production_code.rs"]
mod production_code;
