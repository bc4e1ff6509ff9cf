//! Terminal client: play today's letters against the persistence API, or offline.
//!
//! Usage: `wordy-play [--offline] [--api <url>]`. Type a word and press enter to submit it,
//! `:pick N` to click the N-th tray letter, `:submit` to send the clicked letters,
//! `:reset` to abandon the game and `:quit` to leave.

use std::{env, sync::Arc};

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{
    StreamExt,
    wrappers::{BroadcastStream, LinesStream},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordy_back::{
    clients::{
        api::{GameApi, HttpGameApi, OfflineGameApi},
        dictionary::{self, DictionaryOracle, WordListOracle},
    },
    config::AppConfig,
    game::tray::LetterState,
    session::{
        SessionSnapshot,
        phase::SessionPhase,
        runtime::{self, Command, GameOverSummary, SaveStatus, SessionUpdate},
    },
};

const DEFAULT_API_URL: &str = "http://localhost:3000/api";

struct Options {
    offline: bool,
    api_url: String,
}

fn parse_args() -> anyhow::Result<Options> {
    let mut options = Options {
        offline: false,
        api_url: env::var("WORDY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into()),
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--offline" => options.offline = true,
            "--api" => options.api_url = args.next().context("--api needs a URL")?,
            other => bail!("unknown argument `{other}`"),
        }
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let options = parse_args()?;
    let config = AppConfig::load();

    let (oracle, api): (Arc<dyn DictionaryOracle>, Arc<dyn GameApi>) = if options.offline {
        let oracle: Arc<dyn DictionaryOracle> = match config.dictionary.word_list_path {
            Some(_) => dictionary::from_config(&config.dictionary)?,
            None => Arc::new(WordListOracle::builtin()),
        };
        let api = OfflineGameApi::new(
            config.server.sequence_length,
            config.server.today_top_limit,
        );
        (oracle, Arc::new(api))
    } else {
        let api = HttpGameApi::new(&options.api_url).context("building API client")?;
        (dictionary::from_config(&config.dictionary)?, Arc::new(api))
    };

    let (handle, task) = runtime::spawn(config.game.clone(), oracle, api);
    let mut updates = BroadcastStream::new(handle.subscribe());
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut screen = Screen::default();

    handle.send(Command::BeginEntry).await?;
    loop {
        tokio::select! {
            line = lines.next() => {
                let Some(line) = line else { break };
                let line = line.context("reading standard input")?;
                match screen.interpret(line.trim()) {
                    Input::Quit => break,
                    Input::Commands(commands) => {
                        for command in commands {
                            handle.send(command).await?;
                        }
                    }
                    Input::Help(text) => println!("{text}"),
                }
            }
            update = updates.next() => match update {
                Some(Ok(update)) => screen.show(update),
                // Lagged behind the aging ticks; the next snapshot catches up.
                Some(Err(_)) => continue,
                None => break,
            },
        }
    }

    drop(handle);
    task.await.context("session task panicked")?;
    Ok(())
}

fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

enum Input {
    Commands(Vec<Command>),
    Help(&'static str),
    Quit,
}

/// What was last printed, so unchanged snapshots stay quiet.
#[derive(Default)]
struct Screen {
    last: Option<SessionSnapshot>,
    rendered: String,
}

impl Screen {
    fn phase(&self) -> SessionPhase {
        self.last
            .as_ref()
            .map(|snapshot| snapshot.phase)
            .unwrap_or(SessionPhase::Idle)
    }

    fn interpret(&self, line: &str) -> Input {
        match line.split_once(' ').map_or((line, ""), |(head, rest)| (head, rest.trim())) {
            (":quit", _) => Input::Quit,
            (":reset", _) => Input::Commands(vec![Command::Reset]),
            (":play", _) => Input::Commands(vec![Command::BeginEntry]),
            (":submit", _) => Input::Commands(vec![Command::SubmitWord]),
            (":pick", position) => {
                let letter = position
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|index| self.last.as_ref()?.letters.get(index));
                match letter {
                    Some(letter) => Input::Commands(vec![Command::ToggleLetter(letter.id)]),
                    None => Input::Help("usage: :pick N, with N a tray position"),
                }
            }
            _ if line.starts_with(':') => {
                Input::Help("commands: :pick N, :submit, :reset, :play, :quit")
            }
            _ => match self.phase() {
                SessionPhase::CollectingInitials => {
                    Input::Commands(vec![Command::SubmitInitials(line.to_owned())])
                }
                SessionPhase::Playing(_) => Input::Commands(vec![
                    Command::SetInput(line.to_owned()),
                    Command::SubmitWord,
                ]),
                SessionPhase::Idle | SessionPhase::GameOver => {
                    Input::Help("type :play to start a new game")
                }
                SessionPhase::Loading => Input::Help("still loading today's letters"),
            },
        }
    }

    fn show(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Snapshot(snapshot) => self.show_snapshot(snapshot),
            SessionUpdate::Rejected { reason } => println!("  ✗ {reason}"),
            SessionUpdate::Scored(event) => println!("  {event}"),
            SessionUpdate::Returned { word, reason } => {
                println!("  dictionary unavailable, {word} goes back to the tray ({reason})")
            }
            SessionUpdate::LoadFailed { reason } => {
                println!("could not start: {reason}. Type :play to try again.")
            }
            SessionUpdate::GameOver(summary) => show_summary(&summary),
        }
    }

    fn show_snapshot(&mut self, snapshot: SessionSnapshot) {
        let previous = self.phase();
        let rendered = render(&snapshot);
        if snapshot.phase != previous {
            match snapshot.phase {
                SessionPhase::CollectingInitials => println!("Enter your initials (three letters):"),
                SessionPhase::Loading => println!("Loading today's letters..."),
                SessionPhase::Idle if previous != SessionPhase::Loading => {
                    println!("Game abandoned. Type :play to start again.")
                }
                _ => {}
            }
        }
        if matches!(snapshot.phase, SessionPhase::Playing(_)) && rendered != self.rendered {
            println!("{rendered}");
        }
        self.rendered = rendered;
        self.last = Some(snapshot);
    }
}

fn render(snapshot: &SessionSnapshot) -> String {
    let tray = snapshot
        .letters
        .iter()
        .enumerate()
        .map(|(index, view)| {
            let mark = match view.state {
                LetterState::Danger => "!!",
                LetterState::Warning => "!",
                LetterState::Arriving => "+",
                LetterState::Normal => "",
            };
            let picked = if snapshot.selected.contains(&view.id) {
                "*"
            } else {
                ""
            };
            format!("{}:{}{picked}{mark}", index + 1, view.letter)
        })
        .collect::<Vec<_>>()
        .join(" ");

    let mut line = format!(
        "[{tray}]  score {}  streak x{:.1}  left {}",
        snapshot.score, snapshot.streak, snapshot.remaining
    );
    if !snapshot.input.is_empty() {
        line.push_str(&format!("  word {}", snapshot.input));
    }
    if let Some(word) = &snapshot.validating {
        line.push_str(&format!("  checking {word}..."));
    }
    line
}

fn show_summary(summary: &GameOverSummary) {
    println!();
    println!("Game over, {}! Final score: {}", summary.initials, summary.score);
    if let Some(best) = &summary.best_word {
        println!("Best word: {} ({} points)", best.word, best.score);
    }
    let history = &summary.history;
    println!(
        "Words {:+}  invalid {:+}  dropped {:+}",
        history.valid_points(),
        history.invalid_points(),
        history.drop_points()
    );
    match &summary.saved {
        SaveStatus::Saved { rank, top, .. } => {
            match rank {
                Some(rank) => println!("You placed #{rank} today."),
                None => println!("Not on today's board this time."),
            }
            for (index, game) in top.iter().enumerate() {
                println!("{:>3}. {}  {}", index + 1, game.player_initials, game.score);
            }
        }
        SaveStatus::Failed { message } => println!("Could not save the game: {message}"),
    }
    println!("Type :play for another round or :quit to leave.");
}
