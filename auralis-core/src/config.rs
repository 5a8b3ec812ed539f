//! Centralized configuration for Auralis.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

/// Central configuration for all Auralis components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct AuralisConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub streaming: StreamingConfig,
    pub export: ExportConfig,
}

/// HTTP listener and public addressing configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Externally visible origin used when building asset URLs
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            public_base_url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Socket address string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }
}

/// Media and survey data locations.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory scanned for audio assets
    pub media_dir: PathBuf,
    /// JSON file holding the noise-sensitivity questionnaire
    pub questions_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("media/audios"),
            questions_path: None,
        }
    }
}

/// Byte streaming parameters for the audio endpoint.
///
/// Controls how much of a file is held in memory at once and how long a
/// stalled client may keep a file handle open.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Size of each chunk read from disk
    pub chunk_size: usize,
    /// Maximum time a single chunk may wait for the client to accept it
    pub stall_timeout: Duration,
    /// Number of chunks buffered between the file reader and the socket
    pub buffered_chunks: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 8192, // 8 KiB
            stall_timeout: Duration::from_secs(30),
            buffered_chunks: 4,
        }
    }
}

/// Spreadsheet export of submitted evaluations.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Whether evaluations are exported at all
    pub enabled: bool,
    /// Destination CSV file
    pub csv_path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            csv_path: PathBuf::from("csv/user_survey_analysis.csv"),
        }
    }
}

impl AuralisConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Server configuration overrides
        if let Ok(host) = std::env::var("AURALIS_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("AURALIS_PORT")
            && let Ok(port) = port.parse::<u16>()
        {
            config.server.port = port;
        }

        if let Ok(url) = std::env::var("AURALIS_PUBLIC_BASE_URL") {
            config.server.public_base_url = url;
        }

        // Storage configuration overrides
        if let Ok(dir) = std::env::var("AURALIS_MEDIA_DIR") {
            config.storage.media_dir = PathBuf::from(dir);
        }

        if let Ok(path) = std::env::var("AURALIS_QUESTIONS_PATH") {
            config.storage.questions_path = Some(PathBuf::from(path));
        }

        // Streaming configuration overrides
        if let Ok(size) = std::env::var("AURALIS_CHUNK_SIZE")
            && let Ok(size) = size.parse::<usize>()
            && size > 0
        {
            config.streaming.chunk_size = size;
        }

        if let Ok(timeout) = std::env::var("AURALIS_STALL_TIMEOUT_SECS")
            && let Ok(seconds) = timeout.parse::<u64>()
        {
            config.streaming.stall_timeout = Duration::from_secs(seconds);
        }

        // Export configuration overrides
        if let Ok(path) = std::env::var("AURALIS_CSV_PATH") {
            config.export.csv_path = PathBuf::from(path);
        }

        if let Ok(enabled) = std::env::var("AURALIS_EXPORT_ENABLED") {
            config.export.enabled = enabled.parse().unwrap_or(true);
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Export is disabled and the stall timeout is short so that tests
    /// exercising abandoned streams finish quickly.
    pub fn for_testing() -> Self {
        Self {
            streaming: StreamingConfig {
                stall_timeout: Duration::from_millis(200),
                ..Default::default()
            },
            export: ExportConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
