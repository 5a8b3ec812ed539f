//! Audio asset registry for locally stored listening-test clips

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{Asset, AssetId, AssetResolver};

/// File extensions treated as audio clips when scanning a media directory.
const AUDIO_EXTENSIONS: &[&str] = &[
    "wav", "mp3", "ogg", "oga", "flac", "m4a", "aac", "opus", "webm",
];

/// In-memory registry of audio assets backed by files on disk.
///
/// Identifiers are assigned sequentially from 1 in registration order.
/// Entries are never mutated after registration; the files they point at are
/// treated as write-once.
#[derive(Debug)]
pub struct AssetLibrary {
    root: Option<PathBuf>,
    assets: RwLock<BTreeMap<AssetId, Asset>>,
}

impl Default for AssetLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLibrary {
    /// Create an empty library with no media root.
    pub fn new() -> Self {
        Self {
            root: None,
            assets: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a library from every audio file found under `dir`.
    ///
    /// Files are registered in sorted path order so that ids stay stable
    /// across restarts for an unchanged directory.
    ///
    /// # Errors
    /// - `std::io::Error` - Failed to read the top-level directory
    pub async fn scan(dir: &Path) -> Result<Self, std::io::Error> {
        let mut paths = Vec::new();
        collect_audio_files(dir, &mut paths).await?;
        paths.sort();

        let library = Self {
            root: Some(dir.to_path_buf()),
            assets: RwLock::new(BTreeMap::new()),
        };
        for path in paths {
            let title = title_from_path(&path);
            library.register(title, path).await;
        }

        Ok(library)
    }

    /// Register a file under a new identifier.
    pub async fn register(&self, title: impl Into<String>, file_path: PathBuf) -> AssetId {
        let mut assets = self.assets.write().await;
        let next = assets.keys().next_back().map_or(1, |id| id.get() + 1);
        let id = AssetId::new(next);
        let asset = Asset {
            id,
            title: title.into(),
            file_path,
        };
        debug!(
            "Registered asset {}: {} ({})",
            id,
            asset.title,
            asset.file_path.display()
        );
        assets.insert(id, asset);
        id
    }

    /// Directory the library was scanned from, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Path of an asset relative to the media root, using `/` separators.
    ///
    /// Falls back to the file name for assets registered outside the root.
    pub fn relative_path(&self, asset: &Asset) -> String {
        let relative = self
            .root
            .as_deref()
            .and_then(|root| asset.file_path.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| {
                asset
                    .file_path
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_default()
            });

        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Number of registered assets.
    pub async fn len(&self) -> usize {
        self.assets.read().await.len()
    }

    /// Whether the library has no assets.
    pub async fn is_empty(&self) -> bool {
        self.assets.read().await.is_empty()
    }
}

#[async_trait]
impl AssetResolver for AssetLibrary {
    async fn resolve(&self, id: AssetId) -> Option<Asset> {
        self.assets.read().await.get(&id).cloned()
    }

    async fn assets(&self) -> Vec<Asset> {
        self.assets.read().await.values().cloned().collect()
    }
}

/// Recursively collect audio files below `dir`.
///
/// Unreadable subdirectories are skipped with a warning; only a failure on
/// `dir` itself is reported.
fn collect_audio_files<'a>(
    dir: &'a Path,
    out: &'a mut Vec<PathBuf>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), std::io::Error>> + Send + 'a>>
{
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                if path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| name.starts_with('.'))
                {
                    continue;
                }
                if let Err(e) = collect_audio_files(&path, out).await {
                    warn!("Skipping unreadable directory {}: {}", path.display(), e);
                }
            } else if file_type.is_file() && is_audio_file(&path) {
                out.push(path);
            }
        }

        Ok(())
    })
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

/// Display title derived from the file stem.
fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled Clip")
        .replace(['.', '_'], " ")
}
