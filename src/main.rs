use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linkvault::backend::{Backend, HttpAuthService, HttpRecordService, PollingChangeFeed};
use linkvault::config::Config;
use linkvault::util::domain_of;
use linkvault::{
    AuthService, LocalChangeFeed, Navigator, RetryPolicy, VaultController, VaultOptions,
};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Get the config directory path (~/.config/linkvault/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("linkvault"))
}

#[derive(Parser, Debug)]
#[command(name = "linkvault", about = "Live-synced personal bookmark vault")]
struct Args {
    /// Path to the config file (default: ~/.config/linkvault/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all bookmarks, newest first
    List,
    /// Add a bookmark
    Add { title: String, url: String },
    /// Delete a bookmark by id
    Del { id: String },
    /// Watch the vault and print changes as they arrive
    Watch,
    /// Print the provider sign-in URL
    Login {
        /// OAuth provider name
        #[arg(long, default_value = "google")]
        provider: String,
    },
}

/// Navigator for a terminal: a "redirect" is a printed hint.
struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn redirect(&self, path: &str) {
        eprintln!("Not signed in. Run `linkvault login` and set access_token (redirect target: {path})");
    }
}

fn render(controller: &VaultController) {
    let bookmarks = controller.bookmarks();
    println!("{} bookmark(s)", bookmarks.len());
    for bookmark in bookmarks.iter() {
        println!(
            "  {}  {}  [{}]  ({})",
            bookmark.id,
            bookmark.title,
            domain_of(&bookmark.url),
            bookmark.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    if let Some(message) = controller.notification() {
        println!("  * {message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    if config.backend_url.is_empty() {
        anyhow::bail!(
            "No backend_url configured. Set it in {}",
            config_path.display()
        );
    }

    // Env var takes precedence over the config file for the access token.
    let access_token = std::env::var("LINKVAULT_ACCESS_TOKEN")
        .ok()
        .or_else(|| config.access_token.clone())
        .unwrap_or_default();
    let api_key = config.api_key.clone().unwrap_or_default();

    let backend = Backend::new(
        &config.backend_url,
        SecretString::from(api_key),
        SecretString::from(access_token),
    )
    .context("Invalid backend configuration")?;

    let auth: Arc<dyn AuthService> = Arc::new(HttpAuthService::new(backend.clone()));

    // Login needs no session; handle it before the controller comes up.
    if let Command::Login { provider } = &args.command {
        let redirect = auth
            .sign_in_with_provider(provider, &config.backend_url)
            .await
            .context("Failed to build sign-in URL")?;
        println!("Open this URL in a browser to sign in:");
        println!("  {}", redirect.url);
        println!("Then put the access token in your config or LINKVAULT_ACCESS_TOKEN.");
        return Ok(());
    }

    let records = Arc::new(HttpRecordService::new(backend));
    let options = VaultOptions {
        login_path: config.login_path.clone(),
        notification_window: Duration::from_millis(config.notification_ms),
        feed_retry: RetryPolicy {
            max_attempts: config.feed_retry_attempts,
            ..RetryPolicy::default()
        },
    };

    // One-shot commands do not need a live feed; watch polls the backend.
    let watching = matches!(args.command, Command::Watch);
    let change_feed: Arc<dyn linkvault::ChangeFeed> = if watching {
        // The user id is not known until the session resolves, but the
        // backend filters rows by the token's owner anyway; an empty filter
        // id still scopes the poll correctly.
        let session = auth.get_session().await.context("Failed to query session")?;
        let user_id = session.map(|s| s.user_id).unwrap_or_default();
        Arc::new(PollingChangeFeed::new(
            records.clone(),
            user_id,
            Duration::from_secs(config.poll_interval_secs),
        ))
    } else {
        Arc::new(LocalChangeFeed::new())
    };

    let mut controller = VaultController::new(
        auth,
        records,
        change_feed,
        Arc::new(PrintNavigator),
        options,
    );

    if !controller.start().await {
        std::process::exit(1);
    }

    match args.command {
        Command::List => {
            // start() kicked off the initial refresh; wait for it to land.
            if let Some(event) = controller.next_event().await {
                controller.handle_event(event);
            }
            render(&controller);
        }
        Command::Add { title, url } => {
            controller.set_draft(title, url);
            if !controller.add_bookmark() {
                anyhow::bail!("Both a title and a URL are required");
            }
            while controller.is_adding() {
                let Some(event) = controller.next_event().await else {
                    break;
                };
                controller.handle_event(event);
            }
            render(&controller);
        }
        Command::Del { id } => {
            if !controller.delete_bookmark(&id) {
                anyhow::bail!("Delete refused (already in progress?)");
            }
            while controller.is_deleting(&id) {
                let Some(event) = controller.next_event().await else {
                    break;
                };
                controller.handle_event(event);
            }
            render(&controller);
        }
        Command::Watch => {
            println!("Watching for changes (Ctrl+C to stop)...");
            let mut tick = tokio::time::interval(Duration::from_millis(250));
            loop {
                // Arms only produce a value; the controller is free again
                // once select! returns.
                let event = tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        println!("Goodbye!");
                        break;
                    }
                    event = controller.next_event() => {
                        let Some(event) = event else { break };
                        Some(event)
                    }
                    _ = tick.tick() => None,
                };
                match event {
                    Some(event) => {
                        controller.handle_event(event);
                        controller.drain_pending_events();
                        render(&controller);
                        if !controller.is_authenticated() {
                            std::process::exit(1);
                        }
                    }
                    None => {
                        if controller.on_tick() {
                            render(&controller);
                        }
                    }
                }
            }
        }
        Command::Login { .. } => unreachable!("handled above"),
    }

    Ok(())
}
