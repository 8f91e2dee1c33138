//! CLI subcommand handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tripwire_core::feed::load_transcript;
use tripwire_core::{
    Clock, FeedClient, FeedEvent, IncidentFilter, StreamIngestor, SystemClock, TriageEvent, TriageState,
    TripwireConfig,
};

use crate::render;
use crate::{Commands, ConfigAction};

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    config: TripwireConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    match command {
        Commands::Watch { filter } => {
            let filter = filter.to_filter(&config.display);
            handle_watch(config, filter).await
        }
        Commands::Snapshot { filter, json } => {
            let filter = filter.to_filter(&config.display);
            handle_snapshot(config, filter, json).await
        }
        Commands::Replay { file, filter, json } => {
            let filter = filter.to_filter(&config.display);
            handle_replay(config, &file, filter, json)
        }
        Commands::Config { action } => handle_config(action, &config, workspace),
    }
}

fn handle_config(
    action: ConfigAction,
    config: &TripwireConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".tripwire");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            std::fs::write(&config_path, TripwireConfig::default().to_toml()?)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn handle_snapshot(
    config: TripwireConfig,
    filter: IncidentFilter,
    json: bool,
) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = FeedClient::new(config.feed, clock.clone());
    let cards = client
        .fetch_snapshot()
        .await
        .context("Snapshot fetch failed")?;

    let mut ingestor = StreamIngestor::new();
    let state = ingestor.load_snapshot(Ok(cards), config.attention);
    print_list(&state, &filter, clock.now(), json)
}

fn handle_replay(
    config: TripwireConfig,
    file: &Path,
    filter: IncidentFilter,
    json: bool,
) -> anyhow::Result<()> {
    let clock = SystemClock;
    let events = load_transcript(file, &clock)
        .with_context(|| format!("Failed to replay {}", file.display()))?;

    let mut ingestor = StreamIngestor::new();
    let mut state = TriageState::new(config.attention);
    for event in events {
        ingestor.ingest(&mut state, event);
    }
    let stats = ingestor.stats();
    info!(
        incidents = stats.incidents,
        enrichments = stats.enrichments,
        kept = state.store().len(),
        "Transcript replayed"
    );
    print_list(&state, &filter, clock.now(), json)
}

fn print_list(
    state: &TriageState,
    filter: &IncidentFilter,
    now: chrono::DateTime<chrono::Utc>,
    json: bool,
) -> anyhow::Result<()> {
    let views = state.list_view(filter, now);
    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
    } else {
        println!("{}", render::list(&views));
    }
    Ok(())
}

fn print_surface(
    state: &TriageState,
    filter: &IncidentFilter,
    now: chrono::DateTime<chrono::Utc>,
) {
    println!("{}", render::surface(state, &state.live_surface(filter, now)));
}

/// An operator keystroke read from stdin during `watch`.
#[derive(Debug, Clone, PartialEq)]
enum Interaction {
    Triage(TriageEvent),
    List,
    Help,
    Quit,
}

const WATCH_HELP: &str = "\
p         toggle pause
h / H     pointer enters / leaves the surface
i <id>    inspect an incident
c         close inspection
r         resume (clear every pause)
l         full list view
q         quit";

fn parse_interaction(line: &str) -> Option<Interaction> {
    let line = line.trim();
    let (key, arg) = match line.split_once(char::is_whitespace) {
        Some((key, arg)) => (key, arg.trim()),
        None => (line, ""),
    };
    let interaction = match key {
        "p" => Interaction::Triage(TriageEvent::TogglePause),
        "h" => Interaction::Triage(TriageEvent::Hover(true)),
        "H" => Interaction::Triage(TriageEvent::Hover(false)),
        "i" if !arg.is_empty() => Interaction::Triage(TriageEvent::Inspect(arg.to_string())),
        "c" => Interaction::Triage(TriageEvent::CloseInspect),
        "r" => Interaction::Triage(TriageEvent::Resume),
        "l" => Interaction::List,
        "?" | "help" => Interaction::Help,
        "q" | "quit" => Interaction::Quit,
        _ => return None,
    };
    Some(interaction)
}

/// Everything the `watch` loop mutates.
struct WatchSession {
    state: TriageState,
    ingestor: StreamIngestor,
    filter: IncidentFilter,
    clock: Arc<dyn Clock>,
}

impl WatchSession {
    fn print_surface(&self) {
        print_surface(&self.state, &self.filter, self.clock.now());
    }

    /// Act on one operator line. Returns `false` on quit.
    fn handle_line(&mut self, line: &str) -> bool {
        match parse_interaction(line) {
            Some(Interaction::Quit) => return false,
            Some(Interaction::Help) => println!("{WATCH_HELP}"),
            Some(Interaction::List) => {
                let views = self.state.list_view(&self.filter, self.clock.now());
                println!("{}", render::list(&views));
            }
            Some(Interaction::Triage(event)) => {
                let inspecting = match &event {
                    TriageEvent::Inspect(id) => Some(id.clone()),
                    _ => None,
                };
                self.state.apply(event);
                if let Some(id) = inspecting {
                    match self.state.inspect_json(&id) {
                        Some(raw) => println!("{raw}"),
                        None => println!("No incident with id {id}"),
                    }
                }
                self.print_surface();
            }
            None => println!("Unknown command. Type ? for help."),
        }
        true
    }

    /// Drive the session until quit or `shutdown` resolves.
    ///
    /// Closing `input` only stops reading keystrokes; the feed is followed
    /// until shutdown.
    async fn run<R>(
        &mut self,
        mut rx: mpsc::Receiver<FeedEvent>,
        input: R,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        tokio::pin!(shutdown);
        let mut lines = input.lines();
        let mut feed_open = true;
        let mut stdin_open = true;

        loop {
            tokio::select! {
                biased;

                // Keystrokes first: a pause lands before queued arrivals.
                line = lines.next_line(), if stdin_open => match line? {
                    Some(line) => {
                        if !self.handle_line(&line) {
                            break;
                        }
                    }
                    None => {
                        stdin_open = false;
                        info!("Input closed; following the feed until interrupted");
                    }
                },
                event = rx.recv(), if feed_open => match event {
                    Some(event) => {
                        self.ingestor.ingest(&mut self.state, event);
                        if !self.state.is_paused() {
                            self.print_surface();
                        }
                    }
                    None => feed_open = false,
                },
                _ = &mut shutdown => break,
            }
        }
        Ok(())
    }
}

async fn handle_watch(config: TripwireConfig, filter: IncidentFilter) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = FeedClient::new(config.feed.clone(), clock.clone());

    let mut ingestor = StreamIngestor::new();
    let state = ingestor.load_snapshot(client.fetch_snapshot().await, config.attention);
    let mut session = WatchSession {
        state,
        ingestor,
        filter,
        clock,
    };
    session.print_surface();

    let (tx, rx) = mpsc::channel(config.feed.channel_capacity);
    let feed = tokio::spawn(async move {
        match client.subscribe(tx).await {
            Ok(()) => info!("Feed closed; surface holds its last state"),
            Err(e) => warn!(error = %e, "Feed stopped; surface holds its last state"),
        }
    });
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    let result = session
        .run(rx, BufReader::new(tokio::io::stdin()), shutdown)
        .await;

    feed.abort();
    let stats = session.ingestor.stats();
    info!(
        incidents = stats.incidents,
        enrichments = stats.enrichments,
        "Watch ended"
    );
    result
}
