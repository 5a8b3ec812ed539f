//! CLI command implementations

use std::path::PathBuf;

use auralis_core::config::AuralisConfig;
use auralis_core::storage::{AssetLibrary, AssetResolver};
use auralis_core::tracing_setup::{CliLogLevel, init_tracing};
use auralis_core::Result;
use clap::{Args, Subcommand};
use tracing::info;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the survey server
    Server(ServerArgs),
    /// List the audio clips found in the media directory
    Assets {
        /// Directory to scan for audio clips
        #[arg(long)]
        media_dir: Option<PathBuf>,
    },
}

/// Flags of the `server` command; each one overrides the environment.
#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,
    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Directory scanned for audio clips
    #[arg(long)]
    pub media_dir: Option<PathBuf>,
    /// JSON file with the noise-sensitivity questionnaire
    #[arg(long)]
    pub questions: Option<PathBuf>,
    /// CSV file receiving evaluation exports
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// Disable evaluation export
    #[arg(long)]
    pub no_export: bool,
    /// Base URL used when building media and stream links
    #[arg(long)]
    pub public_base_url: Option<String>,
    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Info)]
    pub log_level: CliLogLevel,
    /// Directory for the debug log file
    #[arg(long)]
    pub logs_dir: Option<PathBuf>,
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Server(args) => start_server(args).await,
        Commands::Assets { media_dir } => list_assets(media_dir).await,
    }
}

/// Start the survey server and block until Ctrl-C.
///
/// # Errors
/// - `AuralisError::Io` - Logs or media directory unusable, address in use
/// - `AuralisError::Survey` - Questions file is missing or invalid
pub async fn start_server(args: ServerArgs) -> Result<()> {
    init_tracing(args.log_level.as_tracing_level(), args.logs_dir.as_deref())?;

    let base_url_pinned = std::env::var("AURALIS_PUBLIC_BASE_URL").is_ok();
    let config = apply_server_args(AuralisConfig::from_env(), &args, base_url_pinned);

    info!(
        "Starting Auralis on {} (public URL {})",
        config.server.bind_address(),
        config.server.base_url()
    );
    auralis_web::run_server(config).await
}

/// Layer command-line flags over `config`.
///
/// Unless a public base URL was given explicitly (flag or environment), it
/// follows the bind address.
fn apply_server_args(
    mut config: AuralisConfig,
    args: &ServerArgs,
    base_url_pinned: bool,
) -> AuralisConfig {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = &args.media_dir {
        config.storage.media_dir = dir.clone();
    }
    if let Some(path) = &args.questions {
        config.storage.questions_path = Some(path.clone());
    }
    if let Some(path) = &args.csv {
        config.export.csv_path = path.clone();
    }
    if args.no_export {
        config.export.enabled = false;
    }

    match &args.public_base_url {
        Some(url) => config.server.public_base_url = url.clone(),
        None if !base_url_pinned => {
            config.server.public_base_url = format!("http://{}", config.server.bind_address());
        }
        None => {}
    }

    config
}

/// Print every clip the server would publish.
///
/// # Errors
/// - `AuralisError::Io` - Media directory cannot be read
pub async fn list_assets(media_dir: Option<PathBuf>) -> Result<()> {
    let media_dir = media_dir.unwrap_or_else(|| AuralisConfig::from_env().storage.media_dir);
    let library = AssetLibrary::scan(&media_dir).await?;
    let assets = library.assets().await;

    if assets.is_empty() {
        println!("No audio clips found in {}", media_dir.display());
        return Ok(());
    }

    println!("Audio clips in {}:", media_dir.display());
    for asset in &assets {
        let size = tokio::fs::metadata(&asset.file_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        println!(
            "  {:>4}  {:<32}  {:>10}  {}",
            asset.id,
            asset.title,
            size,
            library.relative_path(asset)
        );
    }
    println!("{} clips", assets.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    fn server_args(argv: &[&str]) -> ServerArgs {
        let cli = TestCli::try_parse_from(std::iter::once("auralis").chain(argv.iter().copied()))
            .unwrap();
        match cli.command {
            Commands::Server(args) => args,
            Commands::Assets { .. } => panic!("expected server command"),
        }
    }

    #[test]
    fn test_flags_override_configuration() {
        let args = server_args(&[
            "server",
            "--port",
            "9000",
            "--media-dir",
            "/srv/audio",
            "--csv",
            "out/results.csv",
            "--no-export",
            "--log-level",
            "debug",
        ]);
        let config = apply_server_args(AuralisConfig::default(), &args, false);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.media_dir, PathBuf::from("/srv/audio"));
        assert_eq!(config.export.csv_path, PathBuf::from("out/results.csv"));
        assert!(!config.export.enabled);
        assert_eq!(args.log_level, CliLogLevel::Debug);
    }

    #[test]
    fn test_public_base_url_follows_bind_address() {
        let args = server_args(&["server", "--host", "0.0.0.0", "--port", "8080"]);

        let config = apply_server_args(AuralisConfig::default(), &args, false);
        assert_eq!(config.server.base_url(), "http://0.0.0.0:8080");

        let mut pinned = AuralisConfig::default();
        pinned.server.public_base_url = "https://survey.example.org/".to_string();
        let config = apply_server_args(pinned, &args, true);
        assert_eq!(config.server.base_url(), "https://survey.example.org");
    }

    #[test]
    fn test_explicit_public_base_url_wins() {
        let args = server_args(&["server", "--public-base-url", "https://lab.example.org"]);
        let config = apply_server_args(AuralisConfig::default(), &args, false);
        assert_eq!(config.server.base_url(), "https://lab.example.org");
    }
}
