use std::fmt;

use eco_core::Clock;
use eco_core::model::{
    Alternative, Card, CardId, CompletedSession, Difficulty, SessionId, SessionRecord,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    cards_path: String,
    history_path: String,
    sessions: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSessions { raw: String },
    InvalidPath { flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSessions { raw } => write!(f, "invalid --sessions value: {raw}"),
            ArgsError::InvalidPath { flag } => write!(f, "{flag} cannot be empty"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut cards_path =
            std::env::var("ECO_CARDS_PATH").unwrap_or_else(|_| "data/cards.json".into());
        let mut history_path =
            std::env::var("ECO_HISTORY_PATH").unwrap_or_else(|_| "data/game_sessions.json".into());
        let mut sessions = 0;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--cards" => {
                    let value = require_value(&mut args, "--cards")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidPath { flag: "--cards" });
                    }
                    cards_path = value;
                }
                "--history" => {
                    let value = require_value(&mut args, "--history")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidPath { flag: "--history" });
                    }
                    history_path = value;
                }
                "--sessions" => {
                    let value = require_value(&mut args, "--sessions")?;
                    sessions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidSessions { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            cards_path,
            history_path,
            sessions,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --cards <path>            Card file to upsert sample cards into (default: data/cards.json)");
    eprintln!("  --history <path>          History file for sample sessions (default: data/game_sessions.json)");
    eprintln!("  --sessions <n>            Number of sample sessions to append (default: 0)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  ECO_CARDS_PATH, ECO_HISTORY_PATH");
}

fn sample_cards() -> Result<Vec<Card>, Box<dyn std::error::Error>> {
    let samples: [(u64, &str, &str, &[(&str, f64)]); 6] = [
        (
            1,
            "You're at home feeling thirsty. Where do you get water from?",
            Difficulty::EASY,
            &[("Bottled water", 20.0), ("Tap water", 10.0)],
        ),
        (
            2,
            "You need a coffee before work. Which cup do you use?",
            Difficulty::EASY,
            &[("Disposable cup", 30.0), ("Thermos", 15.0)],
        ),
        (
            3,
            "The campus cafeteria asks for a weekly menu policy.",
            Difficulty::EASY,
            &[("Plant meals", -6.0), ("Mixed menu", 6.0), ("Beef day", 18.0)],
        ),
        (
            4,
            "You're late for class. How do you travel?",
            Difficulty::MEDIUM,
            &[("Drive", 40.0), ("Bus", 15.0), ("Bike", 5.0)],
        ),
        (
            5,
            "Your phone still works but a new model is out.",
            Difficulty::MEDIUM,
            &[("Upgrade now", 70.0), ("Buy refurbished", 25.0), ("Keep it", 0.0)],
        ),
        (
            6,
            "You're planning a vacation abroad. Which transport?",
            Difficulty::HARD,
            &[("Plane", 200.0), ("Train", 50.0), ("Bus", 30.0)],
        ),
    ];

    let mut cards = Vec::with_capacity(samples.len());
    for (id, scenario, difficulty, alternatives) in samples {
        let alternatives = alternatives
            .iter()
            .map(|(label, impact)| Alternative::new(*label, *impact))
            .collect();
        cards.push(Card::new(CardId::new(id), scenario, difficulty, alternatives)?);
    }
    Ok(cards)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::json(&args.cards_path, &args.history_path);
    let cards = sample_cards()?;
    for card in &cards {
        storage.cards.upsert_card(card)?;
    }

    if args.sessions > 0 {
        let clock = Clock::default_clock();
        let mut records = storage.history.load()?;
        let mut next = records
            .iter()
            .map(|record| record.id)
            .max()
            .map_or(SessionId::FIRST, SessionId::next);
        for i in 0..args.sessions {
            let score = 25.0 + f64::from(i % 3) * 5.0;
            let session =
                CompletedSession::new(clock.now(), Difficulty::easy(), 2, score, 15.0, 45.0);
            records.push(SessionRecord::new(next, session));
            next = next.next();
        }
        storage.history.save(&records)?;
    }

    println!(
        "Seeded {} cards into {} and {} sessions into {}",
        cards.len(),
        args.cards_path,
        args.sessions,
        args.history_path
    );

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
