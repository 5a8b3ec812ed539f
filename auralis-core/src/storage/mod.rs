//! Storage layer for audio assets.
//!
//! Defines how an asset identifier is resolved to a file on durable storage.
//! The streaming service only depends on the [`AssetResolver`] trait; the
//! bundled [`AssetLibrary`] is a directory-backed implementation.

pub mod asset_library;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use asset_library::AssetLibrary;

/// Opaque identifier of a published audio asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(u64);

impl AssetId {
    /// Wrap a raw identifier.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

/// A stored audio clip exposed for streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Unique identifier
    pub id: AssetId,
    /// Display title
    pub title: String,
    /// Location of the clip on disk
    pub file_path: PathBuf,
}

/// Resolves asset identifiers to stored files.
///
/// Implementations own the mapping from identifier to file and are read-only
/// from the streaming service's point of view.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Looks up a single asset, returning `None` when the id is unknown.
    async fn resolve(&self, id: AssetId) -> Option<Asset>;

    /// All known assets in identifier order.
    async fn assets(&self) -> Vec<Asset>;
}
