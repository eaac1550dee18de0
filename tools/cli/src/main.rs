//! NexusHub CLI - Command line interface for NexusHub file storage.
//!
//! Uploads, lists and syncs files through a NexusHub server, using any of
//! the storage providers the server supports.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use nexushub_client::{ApiClient, ClientConfig, ThemeSettings, UploadFile};
use nexushub_common::{FileDescriptor, FileId, ProviderKind, SecretString};
use nexushub_storage::{
    ListOptions, ProviderCatalog, SettingsStore, StorageService, StorageServiceFactory,
    UploadOptions,
};
use nexushub_storage::settings::THEME_KEY;
use nexushub_sync::{SyncOptions, SyncStatusEvent};

#[derive(Parser)]
#[command(name = "nexushub")]
#[command(about = "NexusHub - Multi-provider file storage")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// NexusHub API base URL.
    #[arg(long, env = "NEXUSHUB_API_URL", default_value = nexushub_client::config::DEFAULT_BASE_URL)]
    api_url: String,

    /// Bearer token; overrides the stored one.
    #[arg(long, env = "NEXUSHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Settings file (default: platform config directory).
    #[arg(long, env = "NEXUSHUB_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the supported storage providers.
    Providers,

    /// Upload a file.
    Upload {
        /// File to upload.
        file: PathBuf,

        /// Storage provider (default: preferred provider).
        #[arg(short, long)]
        storage: Option<String>,

        /// Target directory on the server.
        #[arg(short, long)]
        path: Option<String>,
    },

    /// List files.
    List {
        /// Storage provider (default: preferred provider).
        #[arg(short, long)]
        storage: Option<String>,

        /// Directory to list.
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Download a file.
    Download {
        /// File id.
        id: String,

        /// Output file.
        #[arg(short, long)]
        output: PathBuf,

        /// Storage provider (default: preferred provider).
        #[arg(short, long)]
        storage: Option<String>,
    },

    /// Delete a file.
    Delete {
        /// File id.
        id: String,

        /// Storage provider (default: preferred provider).
        #[arg(short, long)]
        storage: Option<String>,
    },

    /// Print the download URL of a file.
    Url {
        /// File id.
        id: String,

        /// Storage provider (default: preferred provider).
        #[arg(short, long)]
        storage: Option<String>,
    },

    /// Push the server's files to a provider.
    Sync {
        /// Storage provider.
        #[arg(short, long)]
        storage: Option<String>,

        /// Directory to sync.
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Compare the server's files with a provider's listing.
    Compare {
        /// Storage provider.
        #[arg(short, long)]
        storage: String,

        /// Directory to compare.
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Set the preferred storage provider.
    SetDefault {
        /// Provider name.
        storage: String,
    },

    /// Override provider settings, as KEY=VALUE pairs.
    Configure {
        /// Provider name.
        storage: String,

        /// Settings to store, e.g. bucket=photos.
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Store a bearer token.
    Login {
        /// Token issued by the server.
        token: String,
    },

    /// Forget the stored bearer token.
    Logout,

    /// Show or toggle the theme.
    Theme {
        /// Switch between dark and light.
        #[arg(long)]
        toggle: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Everything a command needs, built from flags and the settings file.
struct App {
    settings: SettingsStore,
    client: Arc<ApiClient>,
    factory: StorageServiceFactory,
}

impl App {
    fn load(cli: &Cli) -> Result<Self> {
        let settings = match &cli.settings {
            Some(path) => SettingsStore::open(path)?,
            None => match SettingsStore::default_path() {
                Some(path) => SettingsStore::open(path)?,
                None => SettingsStore::in_memory(),
            },
        };

        let token = cli
            .token
            .clone()
            .map(SecretString::new)
            .or_else(|| settings.token());

        let client = ApiClient::new(ClientConfig::new(cli.api_url.clone()))
            .context("Invalid API configuration")?
            .with_token(token);
        let client = Arc::new(client);

        let factory = StorageServiceFactory::new(
            Arc::clone(&client),
            ProviderCatalog::from_env(),
            settings.storage_settings(),
        );

        Ok(Self {
            settings,
            client,
            factory,
        })
    }

    fn service(&self, storage: Option<&str>) -> Result<Arc<dyn StorageService>> {
        Ok(self.factory.get_storage_service(storage)?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Completions { shell } = &cli.command {
        generate(*shell, &mut Cli::command(), "nexushub", &mut std::io::stdout());
        return Ok(());
    }

    let mut app = App::load(&cli)?;

    match cli.command {
        Commands::Providers => cmd_providers(&app),

        Commands::Upload {
            file,
            storage,
            path,
        } => cmd_upload(&app, &file, storage.as_deref(), path).await,

        Commands::List { storage, path } => cmd_list(&app, storage.as_deref(), path).await,

        Commands::Download {
            id,
            output,
            storage,
        } => cmd_download(&app, &id, &output, storage.as_deref()).await,

        Commands::Delete { id, storage } => cmd_delete(&app, &id, storage.as_deref()).await,

        Commands::Url { id, storage } => cmd_url(&app, &id, storage.as_deref()),

        Commands::Sync { storage, path } => cmd_sync(&app, storage.as_deref(), path).await,

        Commands::Compare { storage, path } => cmd_compare(&app, &storage, path).await,

        Commands::SetDefault { storage } => cmd_set_default(&mut app, &storage),

        Commands::Configure { storage, values } => cmd_configure(&mut app, &storage, &values),

        Commands::Login { token } => cmd_login(&mut app, &token),

        Commands::Logout => cmd_logout(&mut app),

        Commands::Theme { toggle } => cmd_theme(&mut app, toggle).await,

        Commands::Completions { .. } => Ok(()),
    }
}

fn parse_id(id: &str) -> Result<FileId> {
    FileId::new(id).context("Invalid file id")
}

fn print_files(files: &[FileDescriptor]) {
    for file in files {
        let updated = file
            .updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>8}  {:<32} {:>10} bytes  {}",
            file.id.as_str(), file.file_name, file.size, updated
        );
    }
}

/// Show the supported providers.
fn cmd_providers(app: &App) -> Result<()> {
    let preferred = app.factory.resolve_name(None);

    println!("Storage providers:");
    for kind in app.factory.catalog().kinds() {
        let marker = if kind.as_str() == preferred { "*" } else { " " };
        let config = app.factory.provider_config(kind);
        println!(" {} {:<6} {}", marker, kind, config.name());

        let values = config.redacted();
        for (key, value) in values.iter().filter(|(k, _)| !matches!(k.as_str(), "name" | "type")) {
            println!("      {}: {}", key, value);
        }
    }

    Ok(())
}

/// Upload a file.
async fn cmd_upload(
    app: &App,
    file: &Path,
    storage: Option<&str>,
    path: Option<String>,
) -> Result<()> {
    let service = app.service(storage)?;
    info!("Uploading {} to {}", file.display(), service.name());

    let upload = UploadFile::from_path(file)
        .await
        .context("Failed to read file")?;
    let size = upload.len();

    let stored = service
        .upload(upload, &UploadOptions { path })
        .await
        .context("Upload failed")?;

    println!("File uploaded: {} ({} bytes)", stored.file_name, size);
    println!("  ID: {}", stored.id);
    println!("  URL: {}", service.file_url(&stored.id));

    Ok(())
}

/// List files.
async fn cmd_list(app: &App, storage: Option<&str>, path: Option<String>) -> Result<()> {
    let service = app.service(storage)?;
    let files = service
        .list_files(&ListOptions { path })
        .await
        .context("Failed to list files")?;

    if files.is_empty() {
        println!("No files.");
    } else {
        println!("Files in {}:", service.name());
        print_files(&files);
    }

    Ok(())
}

/// Download a file.
async fn cmd_download(
    app: &App,
    id: &str,
    output: &Path,
    storage: Option<&str>,
) -> Result<()> {
    let service = app.service(storage)?;
    let content = service
        .download_file(&parse_id(id)?)
        .await
        .context("Download failed")?;

    tokio::fs::write(output, &content)
        .await
        .context("Failed to write output file")?;

    println!(
        "File downloaded: {} ({} bytes)",
        output.display(),
        content.len()
    );

    Ok(())
}

/// Delete a file.
async fn cmd_delete(app: &App, id: &str, storage: Option<&str>) -> Result<()> {
    let service = app.service(storage)?;
    service
        .delete_file(&parse_id(id)?)
        .await
        .context("Delete failed")?;

    println!("File deleted: {}", id);
    Ok(())
}

/// Print a download URL.
fn cmd_url(app: &App, id: &str, storage: Option<&str>) -> Result<()> {
    let service = app.service(storage)?;
    println!("{}", service.file_url(&parse_id(id)?));
    Ok(())
}

/// Sync the server's files to a provider, printing progress.
async fn cmd_sync(app: &App, storage: Option<&str>, path: Option<String>) -> Result<()> {
    let service = app.service(storage)?;
    let options = SyncOptions { path };

    let Some(monitor) = service.sync_monitor() else {
        let report = service.sync(&options).await.context("Sync failed")?;
        println!("Sync finished: {} uploaded", report.added.len());
        return Ok(());
    };

    let mut events = monitor.subscribe();
    let progress = async move {
        while let Ok(SyncStatusEvent { status, .. }) = events.recv().await {
            println!("  [{:>3}%] {:?}", status.progress, status.status);
            if status.is_finished() {
                break;
            }
        }
    };

    let (report, ()) = tokio::join!(service.sync(&options), progress);
    let report = report.context("Sync failed")?;

    println!("Sync finished for {}:", service.name());
    println!("  Uploaded: {}", report.added.len());
    println!("  Updated:  {}", report.updated.len());
    println!("  Skipped:  {}", report.skipped);

    monitor.reset();
    Ok(())
}

/// Compare the server's files with a provider's listing.
async fn cmd_compare(app: &App, storage: &str, path: Option<String>) -> Result<()> {
    let remote_service = app.service(Some(storage))?;
    let options = ListOptions { path };

    let local = app
        .client
        .list_files(options.path.as_deref())
        .await
        .context("Failed to list server files")?;
    let remote = remote_service
        .list_files(&options)
        .await
        .context("Failed to list provider files")?;

    let diff = remote_service.compare_files(&local, &remote);
    if diff.is_empty() {
        println!("No differences.");
        return Ok(());
    }

    for (label, files) in [
        ("Only on provider", &diff.added),
        ("Only on server", &diff.removed),
        ("Newer on provider", &diff.modified),
    ] {
        if !files.is_empty() {
            println!("{}:", label);
            print_files(files);
        }
    }

    Ok(())
}

/// Set the preferred provider.
fn cmd_set_default(app: &mut App, storage: &str) -> Result<()> {
    let kind: ProviderKind = storage.parse()?;

    let mut storage_settings = app.settings.storage_settings().unwrap_or_default();
    storage_settings.default_storage = Some(kind.as_str().to_string());
    app.settings.set_storage_settings(&storage_settings)?;
    app.settings.save().context("Failed to save settings")?;

    println!("Preferred storage: {}", kind.display_name());
    Ok(())
}

/// Store provider overrides.
fn cmd_configure(app: &mut App, storage: &str, values: &[String]) -> Result<()> {
    let kind: ProviderKind = storage.parse()?;

    let mut storage_settings = app.settings.storage_settings().unwrap_or_default();
    for pair in values {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{}'", pair))?;
        storage_settings.set_override(kind, key.trim(), value.trim());
    }

    app.settings.set_storage_settings(&storage_settings)?;
    app.settings.save().context("Failed to save settings")?;

    println!("Updated {} settings", kind.display_name());
    Ok(())
}

/// Store a token.
fn cmd_login(app: &mut App, token: &str) -> Result<()> {
    if token.trim().is_empty() {
        anyhow::bail!("Token cannot be empty");
    }

    app.settings.set_token(Some(token.trim()));
    app.settings.save().context("Failed to save settings")?;
    println!("Token stored.");
    Ok(())
}

/// Forget the stored token.
fn cmd_logout(app: &mut App) -> Result<()> {
    app.settings.set_token(None);
    app.settings.save().context("Failed to save settings")?;
    println!("Token removed.");
    Ok(())
}

/// Show or toggle the theme, caching it in the settings file.
async fn cmd_theme(app: &mut App, toggle: bool) -> Result<()> {
    let mut theme = match app.client.get_theme_or_default().await {
        Ok(theme) => theme,
        Err(e) => {
            let cached: Option<ThemeSettings> = app.settings.get(THEME_KEY)?;
            let theme = cached.with_context(|| format!("Failed to load theme: {}", e))?;
            println!("Server unavailable, using cached theme.");
            theme
        }
    };

    if toggle {
        theme = app
            .client
            .save_theme(&theme.toggled())
            .await
            .context("Failed to save theme")?;
    }

    app.settings.set(THEME_KEY, &theme)?;
    app.settings.save().context("Failed to save settings")?;

    println!("Theme: {}", theme.theme_name);
    println!("  Primary: {}", theme.primary_color);
    println!("  Secondary: {}", theme.secondary_color);

    Ok(())
}
