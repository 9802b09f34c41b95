//! Boxbridge CLI - serve the web front end or run the console walkthrough.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use boxbridge_dropbox::{
    stage_file, AuthConfig, AuthManager, CreateFolderOutcome, DropboxClient, Endpoints,
    ListFolderRequest, DEFAULT_MAX_PAGES, DEMO_PAYLOAD,
};
use boxbridge_web::config::{DEFAULT_SCRATCH_FILE, DEFAULT_SESSION_TTL_MINUTES};
use boxbridge_web::{build_router, AppState, ServerConfig};

const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "boxbridge")]
#[command(about = "Boxbridge - Dropbox OAuth2 and file operations")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// App registration shared by every command.
#[derive(Args)]
struct Credentials {
    /// Dropbox app key.
    #[arg(long, env = "DROPBOX_APP_KEY")]
    app_key: String,

    /// Dropbox app secret.
    #[arg(long, env = "DROPBOX_APP_SECRET", hide_env_values = true)]
    app_secret: String,

    /// Redirect URI registered with the app.
    #[arg(long, env = "REDIRECT_URI")]
    redirect_uri: String,
}

impl Credentials {
    fn into_config(self) -> AuthConfig {
        AuthConfig {
            client_id: self.app_key,
            client_secret: self.app_secret,
            redirect_uri: self.redirect_uri,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP front end.
    Serve {
        #[command(flatten)]
        credentials: Credentials,

        /// Address to bind.
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to bind.
        #[arg(long, env = "PORT", default_value_t = 5000)]
        port: u16,

        /// Local scratch file for uploads.
        #[arg(long, env = "BOXBRIDGE_SCRATCH_FILE", default_value = DEFAULT_SCRATCH_FILE)]
        scratch_file: PathBuf,

        /// Maximum listing pages fetched per request.
        #[arg(long, env = "BOXBRIDGE_MAX_LIST_PAGES", default_value_t = DEFAULT_MAX_PAGES)]
        max_list_pages: usize,

        /// Idle minutes before a session is dropped.
        #[arg(long, env = "BOXBRIDGE_SESSION_TTL_MINUTES", default_value_t = DEFAULT_SESSION_TTL_MINUTES)]
        session_ttl_minutes: i64,

        /// Mark the session cookie `Secure` (serve behind HTTPS).
        #[arg(long, env = "BOXBRIDGE_SECURE_COOKIE")]
        secure_cookie: bool,
    },

    /// Authorize in the console, then upload, create a folder and list root.
    Walkthrough {
        #[command(flatten)]
        credentials: Credentials,

        /// Destination of the demo upload.
        #[arg(long, default_value = "/StudyStart_File.txt")]
        file_path: String,

        /// Folder to create.
        #[arg(long, default_value = "/StudyStart_Folder")]
        folder_path: String,

        /// Local scratch file for the upload.
        #[arg(long, env = "BOXBRIDGE_SCRATCH_FILE", default_value = DEFAULT_SCRATCH_FILE)]
        scratch_file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase())),
        )
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve {
            credentials,
            host,
            port,
            scratch_file,
            max_list_pages,
            session_ttl_minutes,
            secure_cookie,
        } => {
            let config = ServerConfig::new(credentials.into_config())
                .with_scratch_file(scratch_file)
                .with_max_list_pages(max_list_pages)
                .with_session_ttl(chrono::Duration::minutes(session_ttl_minutes))
                .with_secure_cookie(secure_cookie);
            cmd_serve(config, &host, port).await
        }

        Commands::Walkthrough {
            credentials,
            file_path,
            folder_path,
            scratch_file,
        } => {
            cmd_walkthrough(
                credentials.into_config(),
                &file_path,
                &folder_path,
                &scratch_file,
            )
            .await
        }
    }
}

/// Serve the web front end until the process is stopped.
async fn cmd_serve(config: ServerConfig, host: &str, port: u16) -> Result<()> {
    let state = AppState::new(config).context("Invalid server configuration")?;
    let _sweeper = Arc::clone(&state.sessions).spawn_sweeper(SWEEP_INTERVAL);

    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Run every operation once from the console.
async fn cmd_walkthrough(
    auth: AuthConfig,
    file_path: &str,
    folder_path: &str,
    scratch_file: &Path,
) -> Result<()> {
    let endpoints = Endpoints::default();
    let manager = AuthManager::new(auth, &endpoints).context("Invalid app credentials")?;
    let client = DropboxClient::new(endpoints).context("Failed to build client")?;

    let (url, _state) = manager.authorization_url();
    println!("Open this URL and authorize the app:\n\n  {}\n", url);
    if let Err(e) = open::that(&url) {
        info!("Could not open browser: {}", e);
    }

    print!("Paste the authorization code: ");
    std::io::stdout().flush()?;

    let mut code = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut code)
        .await
        .context("Failed to read authorization code")?;

    let tokens = manager
        .exchange_code(code.trim())
        .await
        .context("Token exchange failed")?;
    let token = Some(&tokens.access_token);
    println!("Authorized.");

    stage_file(scratch_file, DEMO_PAYLOAD)
        .await
        .context("Failed to write scratch file")?;
    let uploaded = client
        .upload_file(token, scratch_file, file_path)
        .await
        .context("Upload failed")?;
    println!("Uploaded: {}", serde_json::to_string_pretty(&uploaded)?);

    match client
        .create_folder(token, folder_path)
        .await
        .context("Folder creation failed")?
    {
        CreateFolderOutcome::Created(created) => {
            println!("Created folder: {}", created.metadata.name)
        }
        CreateFolderOutcome::AlreadyExists => println!("Folder already exists: {}", folder_path),
    }

    let entries = client
        .list_folder(token, &ListFolderRequest::new("/"))
        .await
        .context("Listing failed")?;

    println!("\nRoot folder ({} entries):", entries.len());
    for entry in &entries {
        let name = entry.name.as_deref().unwrap_or("");
        match &entry.file {
            Some(file) => println!(
                "  [{}] {} ({} bytes)",
                entry.tag.as_str(),
                name,
                file.size.unwrap_or(0)
            ),
            None => println!("  [{}] {}", entry.tag.as_str(), name),
        }
    }

    Ok(())
}
