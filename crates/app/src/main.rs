mod cli;
mod console;

use std::io::{self, Write};
use std::sync::Arc;

use eco_core::model::GameSettings;
use services::{Clock, GameLoopService, HistoryLedger, ShuffleMode};
use storage::repository::{CardRepository, Storage};

use cli::{Cli, Command};

fn open_storage(settings: &GameSettings) -> Storage {
    log::debug!(
        "using cards {} and history {}",
        settings.cards_path().display(),
        settings.history_path().display()
    );
    Storage::json(settings.cards_path(), settings.history_path())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Cli { settings, command } = Cli::parse().map_err(|e| {
        eprintln!("{e}");
        cli::print_usage();
        e
    })?;

    let storage = open_storage(&settings);
    let ledger = HistoryLedger::new(Arc::clone(&storage.history));
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Help => cli::print_usage(),
        Command::Play => {
            let shuffle = settings
                .shuffle_seed()
                .map_or(ShuffleMode::Random, ShuffleMode::Seeded);
            let service = GameLoopService::new(
                Clock::default_clock(),
                Arc::clone(&storage.deck),
                ledger.clone(),
            )
            .with_shuffle(shuffle);
            let stdin = io::stdin();
            console::play(&service, settings.session().clone(), &mut stdin.lock(), &mut out)?;
        }
        Command::History { json } => {
            let overview = ledger.overview();
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&overview)?)?;
            } else {
                console::print_history(&mut out, &overview)?;
            }
        }
        Command::Remove { id } => {
            if ledger.remove(id) {
                writeln!(out, "Removed session {id}.")?;
            } else {
                writeln!(out, "No session with id {id}.")?;
            }
        }
        Command::ClearHistory => {
            ledger.clear();
            writeln!(out, "History cleared.")?;
        }
        Command::AddCard(card) => {
            storage.cards.upsert_card(&card)?;
            writeln!(
                out,
                "Added/updated card id={} in {}",
                card.id(),
                settings.cards_path().display()
            )?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(2);
    }
}
