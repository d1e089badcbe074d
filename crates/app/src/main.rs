use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use challenge_core::model::{
    ChallengeDifficulty, ChallengeSettings, ChallengeSettingsDraft, StudyCard,
};
use challenge_services::{
    ChallengeRunner, Clock, HistoryRecorder, RunnerEvent, SessionAction, SessionController,
    SessionOutcome, TimerTick,
};
use challenge_storage::repository::Storage;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingPath,
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDifficulty { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingPath => write!(f, "import requires a path to a JSON file"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDifficulty { raw } => write!(
                f,
                "invalid --difficulty value: {raw} (expected easy, medium, hard or expert)"
            ),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let raw = require_value(args, flag)?;
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  challenge import <cards.json> [--db <sqlite_url>]");
    eprintln!("  challenge play [--db <sqlite_url>] [--duration <secs>] [--cards <n>]");
    eprintln!("                 [--difficulty easy|medium|hard|expert] [--category <name>]...");
    eprintln!("                 [--hints] [--seed <n>]");
    eprintln!("  challenge history [--db <sqlite_url>] [--limit <n>]");
    eprintln!();
    eprintln!("Keys while playing (then Enter):");
    eprintln!("  r reveal, c correct, i incorrect, s skip, h hint, q quit");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://challenge.sqlite3");
    eprintln!("  --duration 120 (30-300), --cards 10 (5-30), --difficulty medium");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CHALLENGE_DB_URL, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Import { path: String },
    Play { settings: ChallengeSettingsDraft, seed: Option<u64> },
    History { limit: u32 },
}

#[derive(Debug)]
struct Args {
    db_url: String,
    command: Command,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Option<Self>, ArgsError> {
        let mut args = argv.into_iter();
        let Some(sub) = args.next() else {
            return Ok(None);
        };

        let mut db_url = std::env::var("CHALLENGE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://challenge.sqlite3".into(), normalize_sqlite_url);
        let mut import_path = None;
        let mut settings = ChallengeSettingsDraft::default();
        let mut seed = None;
        let mut limit = 20;

        while let Some(arg) = args.next() {
            match (sub.as_str(), arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                (_, "--help" | "-h") => return Ok(None),
                ("play", "--duration") => {
                    settings.duration_secs = parse_number(&mut args, "--duration")?;
                }
                ("play", "--cards") => {
                    settings.cards_count = parse_number(&mut args, "--cards")?;
                }
                ("play", "--difficulty") => {
                    let raw = require_value(&mut args, "--difficulty")?;
                    settings.difficulty = raw
                        .parse::<ChallengeDifficulty>()
                        .map_err(|_| ArgsError::InvalidDifficulty { raw })?;
                }
                ("play", "--category") => {
                    settings
                        .categories
                        .push(require_value(&mut args, "--category")?);
                }
                ("play", "--hints") => settings.include_hints = true,
                ("play", "--seed") => seed = Some(parse_number(&mut args, "--seed")?),
                ("history", "--limit") => limit = parse_number(&mut args, "--limit")?,
                ("import", path) if import_path.is_none() && !path.starts_with("--") => {
                    import_path = Some(arg);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match sub.as_str() {
            "import" => Command::Import {
                path: import_path.ok_or(ArgsError::MissingPath)?,
            },
            "play" => Command::Play { settings, seed },
            "history" => Command::History { limit },
            "--help" | "-h" => return Ok(None),
            _ => return Err(ArgsError::UnknownArg(sub)),
        };
        Ok(Some(Self { db_url, command }))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

fn parse_action(line: &str) -> Option<SessionAction> {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "reveal" => Some(SessionAction::Reveal),
        "c" | "correct" => Some(SessionAction::Correct),
        "i" | "incorrect" => Some(SessionAction::Incorrect),
        "s" | "skip" => Some(SessionAction::Skip),
        "h" | "hint" => Some(SessionAction::Hint),
        "q" | "quit" => Some(SessionAction::Quit),
        _ => None,
    }
}

/// Forward stdin lines as session actions until EOF or the runner hangs up.
fn spawn_input(tx: mpsc::Sender<SessionAction>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_action(&line) {
                Some(action) => {
                    if tx.send(action).await.is_err() {
                        break;
                    }
                }
                None => eprintln!("keys: r reveal, c correct, i incorrect, s skip, h hint, q quit"),
            }
        }
    })
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn print_card(controller: &SessionController) {
    let (Some(card), Some(index)) = (controller.current_card(), controller.current_index()) else {
        return;
    };
    println!();
    println!(
        "[{}/{}] {} ({}) streak {}",
        index + 1,
        controller.total_cards(),
        card.category(),
        card.difficulty(),
        controller.streak(),
    );
    println!("  Q: {}", card.question());
}

fn render(controller: &SessionController, event: &RunnerEvent) {
    match event {
        RunnerEvent::Started => print_card(controller),
        RunnerEvent::Tick(TimerTick::Running { remaining }) => {
            if *remaining % 15 == 0 || *remaining <= 5 {
                println!("  {remaining}s left");
            }
        }
        RunnerEvent::Tick(TimerTick::Expired) => println!("  time is up"),
        RunnerEvent::Tick(TimerTick::Stopped) | RunnerEvent::Finished => {}
        RunnerEvent::Applied(SessionAction::Reveal) => {
            if let Some(card) = controller.current_card() {
                println!("  A: {}", card.answer());
            }
        }
        RunnerEvent::Applied(SessionAction::Hint) => match controller.hint() {
            Ok(Some(hint)) => println!("  hint: {hint}"),
            Ok(None) => println!("  no hint available"),
            Err(_) => {}
        },
        RunnerEvent::Applied(_) => print_card(controller),
        RunnerEvent::Rejected { reason, .. } => println!("  ({reason})"),
    }
}

fn print_outcome(outcome: &SessionOutcome, best_before: Option<u32>) {
    let stats = &outcome.stats;
    println!();
    println!("Challenge finished ({:?})", outcome.reason);
    println!("  score:          {}", stats.score());
    println!(
        "  answers:        {} correct, {} incorrect, {} skipped of {}",
        stats.correct_answers(),
        stats.incorrect_answers(),
        stats.skipped_answers(),
        stats.total_cards(),
    );
    println!("  accuracy:       {:.0}%", stats.accuracy() * 100.0);
    println!("  avg response:   {:.1}s", stats.average_response_secs());
    println!("  longest streak: {}", stats.longest_streak());
    println!(
        "  time left:      {}s of {}s",
        stats.time_remaining_secs(),
        stats.duration_secs()
    );
    for id in &outcome.achievements {
        let achievement = id.definition();
        println!("  * {}: {}", achievement.name, achievement.description);
    }
    match best_before {
        Some(best) if stats.score() > best => println!("  new best score (previous {best})"),
        Some(best) => println!("  best score: {best}"),
        None => {}
    }
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn import(storage: &Storage, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let cards: Vec<StudyCard> = serde_json::from_str(&raw)?;
    for card in &cards {
        storage.cards.upsert_card(card).await?;
    }
    log::info!("imported {} cards from {path}", cards.len());
    println!("imported {} cards", cards.len());
    Ok(())
}

async fn play(
    storage: &Storage,
    draft: ChallengeSettingsDraft,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings: ChallengeSettings = draft.clamp();
    let mut previous = storage.history.list_entries(100).await?;
    previous.reverse();
    let recorder = HistoryRecorder::with_entries(previous);
    let best_before = recorder.entries().iter().map(|e| e.score()).max();

    let mut controller = SessionController::new(recorder);
    if let Some(seed) = seed {
        controller = controller.with_seed(seed);
    }

    let runner = ChallengeRunner::new(
        Clock::default(),
        Arc::clone(&storage.cards),
        Arc::clone(&storage.history),
    );
    let (tx, rx) = mpsc::channel(16);
    let input = spawn_input(tx);

    println!(
        "{} cards, {}s, {} difficulty. Type r/c/i/s/h/q and press Enter.",
        settings.cards_count(),
        settings.duration_secs(),
        settings.difficulty(),
    );
    let outcome = runner.run(&mut controller, settings, rx, render).await;
    input.abort();

    print_outcome(&outcome?, best_before);
    Ok(())
}

async fn history(storage: &Storage, limit: u32) -> Result<(), Box<dyn std::error::Error>> {
    let entries = storage.history.list_entries(limit).await?;
    if entries.is_empty() {
        println!("no challenges played yet");
        return Ok(());
    }
    for entry in entries {
        let categories = if entry.categories().is_empty() {
            "all".to_owned()
        } else {
            entry.categories().join(", ")
        };
        let achievements: Vec<&str> = entry
            .achievements()
            .iter()
            .map(|id| id.definition().name)
            .collect();
        println!(
            "{}  score {:>5}  {}/{} correct  {} {}s  [{}]  {}",
            entry.completed_at().format("%Y-%m-%d %H:%M"),
            entry.score(),
            entry.correct_answers(),
            entry.total_cards(),
            entry.difficulty(),
            entry.duration_secs(),
            categories,
            achievements.join(", "),
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match Args::parse(argv) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return Err(e.into());
        }
    };

    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    match parsed.command {
        Command::Import { path } => import(&storage, &path).await,
        Command::Play { settings, seed } => play(&storage, settings, seed).await,
        Command::History { limit } => history(&storage, limit).await,
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let code = match run().await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            2
        }
    };
    // The stdin reader may still be parked on a blocking read.
    std::process::exit(code);
}
