//! Story viewer (tribe-stories) - terminal driver
//!
//! Fetches story groups from the Tribe backend, opens a viewer session and
//! drives it from stdin. Every viewer event is printed to stdout as one JSON
//! line; logs go to stderr.
//!
//! Commands: `up`, `down`, `space`, `esc`, `like`, `click <x> <width>`,
//! `loaded`, `play`, `fail [message]`, `status`, `quit`. DOM key names
//! (`ArrowUp`, `Escape`, ...) are accepted too.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tribe_common::config::{load_toml_config, resolve_base_url, resolve_csrf_token, resolve_data_dir};
use tribe_common::events::{CloseReason, EventBus, TribeEvent};
use tribe_common::reporting::{ErrorReporter, TracingReporter};
use tribe_common::store::{AppStore, OnboardingStep};
use tribe_stories::api::StoriesClient;
use tribe_stories::config::ViewerConfig;
use tribe_stories::input::{Key, PointerPress};
use tribe_stories::likes::{refresh_like_status, LikeApi};
use tribe_stories::playback::{MediaEvent, Position, StoryViewer, ViewerHandle};

/// Command-line arguments for tribe-stories
#[derive(Parser, Debug)]
#[command(name = "tribe-stories")]
#[command(about = "Headless Tribe story viewer")]
#[command(version)]
struct Args {
    /// Backend base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Config file (overrides TRIBE_CONFIG and the default location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSRF token sent with like requests
    #[arg(long, env = "TRIBE_CSRF_TOKEN")]
    csrf_token: Option<String>,

    /// Page to read the csrf-token meta tag from when no token is configured
    #[arg(long)]
    csrf_page: Option<String>,

    /// Group to open
    #[arg(short, long, default_value = "0")]
    group: usize,

    /// Story within the group to open
    #[arg(short, long, default_value = "0")]
    story: usize,

    /// Also print StoryProgress events
    #[arg(long)]
    progress: bool,

    /// Re-read like state for every story before opening
    #[arg(long)]
    refresh_likes: bool,
}

/// One parsed stdin line
#[derive(Debug, Clone, PartialEq)]
enum CliCommand {
    Key(Key),
    Click(PointerPress),
    Media(MediaEvent),
    Status,
    Quit,
}

/// How stdin stopped feeding the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputEnd {
    Eof,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing; stdout is reserved for events
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(&toml_config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let viewer_config = ViewerConfig::from_section(toml_config.section("viewer"))
        .context("Invalid viewer configuration")?;
    let base_url = resolve_base_url(args.base_url.as_deref(), &toml_config);
    let csrf_token = resolve_csrf_token(args.csrf_token.as_deref(), &toml_config);

    info!("Starting Tribe story viewer against {}", base_url);

    let mut client = StoriesClient::new(&base_url, csrf_token, viewer_config.request_timeout())
        .context("Failed to build HTTP client")?;
    if client.csrf_token().is_none() {
        if let Some(page) = &args.csrf_page {
            let token = client
                .fetch_csrf_token(page)
                .await
                .with_context(|| format!("Failed to read CSRF token from {}", page))?;
            client.set_csrf_token(Some(token));
        }
    }

    let mut groups = client.fetch_stories().await.context("Failed to fetch stories")?;
    if groups.is_empty() {
        bail!("No stories to show");
    }
    info!("Fetched {} story groups", groups.len());

    if args.refresh_likes {
        for story in groups.iter_mut().flat_map(|g| g.stories.iter_mut()) {
            if let Err(e) = refresh_like_status(&client, story).await {
                warn!(story_id = story.id, "Could not refresh like status: {}", e);
            }
        }
    }

    let store = AppStore::open(&resolve_data_dir(&toml_config)).context("Failed to open app state")?;
    if !store
        .is_onboarding_complete(OnboardingStep::StoriesIntro)
        .context("Failed to read app state")?
    {
        info!("First story session on this machine");
    }

    let events = Arc::new(EventBus::new(viewer_config.event_capacity));
    let printer = tokio::spawn(print_events(events.subscribe(), args.progress));

    let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingReporter);
    let viewer = StoryViewer::open(
        groups,
        Position::new(args.group, args.story),
        &viewer_config,
        Arc::clone(&events),
        reporter,
    )
    .context("Failed to open viewer")?;

    if let Err(e) = store.complete_onboarding(OnboardingStep::StoriesIntro) {
        warn!("Could not save onboarding state: {}", e);
    }

    let api: Arc<dyn LikeApi> = Arc::new(client);
    let handle = ViewerHandle::spawn(viewer, api);

    tokio::select! {
        result = drive(&handle, BufReader::new(tokio::io::stdin())) => {
            match result {
                Ok(Some(reason)) => info!(%reason, "Viewer closed"),
                Ok(None) => info!("Quit requested"),
                Err(e) => warn!("Input stopped: {:#}", e),
            }
        }
        _ = shutdown_signal() => {}
    }

    // Dropping the handle closes a still-running session as abandoned
    drop(handle);
    if tokio::time::timeout(Duration::from_secs(1), printer).await.is_err() {
        warn!("Event printer did not finish");
    }

    info!("Story viewer shutdown complete");
    Ok(())
}

/// Env filter used when `RUST_LOG` is unset
fn default_log_filter(level: &str) -> String {
    format!("tribe_stories={level},tribe_common={level}")
}

/// Run the viewer until it closes or the user quits
///
/// Returns `None` on `quit`; the session is still open then.
async fn drive<R>(handle: &ViewerHandle, input: R) -> Result<Option<CloseReason>>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        reason = handle.closed() => Ok(Some(reason)),
        end = read_commands(handle, input) => match end? {
            InputEnd::Quit => Ok(None),
            InputEnd::Eof => {
                info!("End of input, playing until the viewer closes");
                Ok(Some(handle.closed().await))
            }
        },
    }
}

/// Feed input lines to the viewer until EOF or `quit`
async fn read_commands<R>(handle: &ViewerHandle, input: R) -> Result<InputEnd>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        match command {
            CliCommand::Key(key) => {
                if !handle.key(key)? {
                    warn!("Key {:?} does nothing in the viewer", key);
                }
            }
            CliCommand::Click(press) => {
                if !handle.pointer(press)? {
                    warn!("Click outside the viewer");
                }
            }
            CliCommand::Media(event) => {
                let snapshot = handle.snapshot().await?;
                handle.media_event(snapshot.story.id, event)?;
            }
            CliCommand::Status => {
                let snapshot = handle.snapshot().await?;
                println!("{}", serde_json::to_string(&snapshot)?);
            }
            CliCommand::Quit => return Ok(InputEnd::Quit),
        }
    }
    Ok(InputEnd::Eof)
}

fn parse_command(line: &str) -> std::result::Result<CliCommand, String> {
    let mut parts = line.split_whitespace();
    let word = parts.next().unwrap_or_default();

    let command = match word {
        "up" => CliCommand::Key(Key::ArrowUp),
        "down" => CliCommand::Key(Key::ArrowDown),
        "space" => CliCommand::Key(Key::Space),
        "esc" => CliCommand::Key(Key::Escape),
        "like" => CliCommand::Key(Key::Char('l')),
        "click" => {
            let x = parse_number(parts.next(), "x")?;
            let viewport_width = parse_number(parts.next(), "width")?;
            CliCommand::Click(PointerPress { x, viewport_width })
        }
        "loaded" => CliCommand::Media(MediaEvent::Loaded),
        "play" => CliCommand::Media(MediaEvent::PlayStarted),
        "fail" => {
            let message = parts.collect::<Vec<_>>().join(" ");
            CliCommand::Media(MediaEvent::Failed {
                message: if message.is_empty() {
                    "media error".to_string()
                } else {
                    message
                },
            })
        }
        "status" => CliCommand::Status,
        "quit" | "q" => CliCommand::Quit,
        other => CliCommand::Key(other.parse::<Key>()?),
    };
    Ok(command)
}

fn parse_number(value: Option<&str>, name: &str) -> std::result::Result<f64, String> {
    let value = value.ok_or_else(|| format!("click: missing {}", name))?;
    value
        .parse::<f64>()
        .map_err(|_| format!("click: {} is not a number: {:?}", name, value))
}

/// Print events as JSON lines until the viewer closes
async fn print_events(mut rx: tokio::sync::broadcast::Receiver<TribeEvent>, progress: bool) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if matches!(event, TribeEvent::StoryProgress { .. }) && !progress {
                    continue;
                }
                match serde_json::to_string(&event) {
                    Ok(json) => println!("{}", json),
                    Err(e) => warn!("Failed to serialize {}: {}", event.event_type(), e),
                }
                if matches!(event, TribeEvent::ViewerClosed { .. }) {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event printer lagged, {} events skipped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
