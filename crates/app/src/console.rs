use std::error::Error;
use std::io::{BufRead, Write};

use eco_core::model::{Card, SessionConfig};
use services::{GameLoopService, HistoryOverview, SessionReport, StateError};

type ConsoleResult<T> = Result<T, Box<dyn Error>>;

fn print_card(output: &mut impl Write, card: &Card) -> std::io::Result<()> {
    writeln!(output)?;
    writeln!(output, "== {} ==", card.difficulty())?;
    writeln!(output, "{}", card.scenario())?;
    for (index, alternative) in card.alternatives().iter().enumerate() {
        writeln!(output, "  [{}] {}", index + 1, alternative.label())?;
    }
    Ok(())
}

pub fn print_report(output: &mut impl Write, report: &SessionReport) -> std::io::Result<()> {
    writeln!(output)?;
    writeln!(output, "Game over! Total CO2: {}", report.final_score)?;
    writeln!(
        output,
        "Achievable range: {} (best) to {} (worst)",
        report.range.best, report.range.worst
    )?;
    writeln!(output, "{}", report.tier.title())?;
    writeln!(output, "{}", report.message())?;
    match report.performance {
        Some(performance) => writeln!(output, "Performance: {performance:.1}/100")?,
        None => writeln!(output, "Performance: n/a")?,
    }
    match report.percentile {
        Some(percentile) => writeln!(output, "Percentile vs. earlier sessions: {percentile:.1}")?,
        None => writeln!(output, "Percentile: available once you have played three sessions")?,
    }
    Ok(())
}

pub fn print_history(output: &mut impl Write, overview: &HistoryOverview) -> std::io::Result<()> {
    if overview.is_empty() {
        return writeln!(output, "No sessions recorded yet.");
    }

    writeln!(
        output,
        "{:>4}  {:<19}  {:<10}  {:>6}  {:>8}  {:>8}  {:>8}  {:>6}",
        "id", "timestamp", "difficulty", "rounds", "score", "best", "worst", "perf"
    )?;
    for item in &overview.items {
        let performance = item
            .performance
            .map_or_else(|| "-".to_owned(), |value| format!("{value:.1}"));
        writeln!(
            output,
            "{:>4}  {:<19}  {:<10}  {:>6}  {:>8}  {:>8}  {:>8}  {:>6}",
            item.id.to_string(),
            item.timestamp,
            item.difficulty.as_str(),
            item.rounds,
            item.score,
            item.best_possible,
            item.worst_possible,
            performance
        )?;
    }
    if let Some(percentile) = overview.latest_percentile {
        writeln!(output, "Latest session percentile: {percentile:.1}")?;
    }
    Ok(())
}

/// Plays one session on the console.
///
/// Returns the report if the session ran to the end. Running out of cards
/// or closing the input abandons the session without recording it.
///
/// # Errors
///
/// Returns I/O errors and session errors other than invalid picks.
pub fn play(
    service: &GameLoopService,
    config: SessionConfig,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> ConsoleResult<Option<SessionReport>> {
    writeln!(output, "Welcome to EcoLogic Cards!")?;
    writeln!(
        output,
        "Difficulty: {}, rounds: {}. Lower CO2 is better.",
        config.difficulty(),
        config.max_rounds()
    )?;

    let difficulty = config.difficulty().clone();
    let mut session = service.start_session(config)?;
    if session.session_cards().is_empty() {
        writeln!(output, "No {difficulty} cards available.")?;
        return Ok(None);
    }

    loop {
        let drawn = session.draw_next().cloned();
        let card = match drawn {
            Ok(card) => card,
            Err(err) if err.state() == Some(StateError::DeckExhausted) => {
                writeln!(
                    output,
                    "\nOut of cards after {} rounds; the session was not recorded.",
                    session.progress().answered
                )?;
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        print_card(output, &card)?;

        let result = loop {
            write!(output, "> ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output, "\nInput closed; the session was abandoned.")?;
                return Ok(None);
            }

            let picked = line
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|number| number.checked_sub(1));
            let Some(index) = picked else {
                writeln!(output, "Pick a number between 1 and {}.", card.alternatives().len())?;
                continue;
            };

            match service.submit_choice(&mut session, index) {
                Ok(result) => break result,
                Err(err) if err.is_validation() => {
                    writeln!(output, "Pick a number between 1 and {}.", card.alternatives().len())?;
                }
                Err(err) => return Err(err.into()),
            }
        };

        writeln!(output, "Current CO2: {}", result.outcome.total_score)?;
        if let Some(report) = result.report {
            print_report(output, &report)?;
            return Ok(Some(report));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::analytics::FeedbackTier;
    use eco_core::model::{Alternative, CardId, CompletedSession, Difficulty, SessionId};
    use eco_core::time::{fixed_clock, fixed_now};
    use services::{HistoryLedger, ShuffleMode};
    use std::io::Cursor;
    use std::sync::Arc;
    use storage::repository::InMemoryRepository;

    fn build_card(id: u64, alternatives: &[(&str, f64)]) -> Card {
        Card::new(
            CardId::new(id),
            format!("Scenario {id}"),
            "Easy",
            alternatives
                .iter()
                .map(|(label, impact)| Alternative::new(*label, *impact))
                .collect(),
        )
        .unwrap()
    }

    fn service() -> GameLoopService {
        let repo = Arc::new(InMemoryRepository::with_cards([
            build_card(1, &[("Bike", 1.0), ("Car", 6.0)]),
            build_card(2, &[("Shower", 0.5), ("Bath", 2.0), ("Pool", 9.0)]),
        ]));
        GameLoopService::new(fixed_clock(), repo, HistoryLedger::in_memory())
            .with_shuffle(ShuffleMode::Off)
    }

    fn run(service: &GameLoopService, rounds: u32, input: &str) -> (Option<SessionReport>, String) {
        let mut output = Vec::new();
        let report = play(
            service,
            SessionConfig::new("Easy", rounds).unwrap(),
            &mut Cursor::new(input.as_bytes()),
            &mut output,
        )
        .unwrap();
        (report, String::from_utf8(output).unwrap())
    }

    #[test]
    fn plays_a_session_and_reprompts_on_bad_input() {
        let service = service();
        let (report, output) = run(&service, 2, "abc\n1\n0\n4\n2\n");

        let report = report.unwrap();
        assert_eq!(report.session_id, SessionId::FIRST);
        assert!((report.final_score - 3.0).abs() < 1e-9);
        assert_eq!(report.tier, FeedbackTier::Excellent);
        assert_eq!(output.matches("Pick a number between 1 and").count(), 3);
        assert!(output.contains("  [3] Pool"));
        assert!(output.contains("Game over! Total CO2: 3"));
        assert_eq!(service.ledger().count(), 1);
    }

    #[test]
    fn closed_input_abandons_the_session() {
        let service = service();
        let (report, output) = run(&service, 2, "1\n");
        assert!(report.is_none());
        assert!(output.contains("abandoned"));
        assert_eq!(service.ledger().count(), 0);
    }

    #[test]
    fn short_deck_is_not_recorded() {
        let service = service();
        let (report, output) = run(&service, 3, "1\n1\n");
        assert!(report.is_none());
        assert!(output.contains("Out of cards after 2 rounds"));
        assert_eq!(service.ledger().count(), 0);
    }

    #[test]
    fn empty_history_prints_placeholder() {
        let ledger = HistoryLedger::in_memory();
        let mut output = Vec::new();
        print_history(&mut output, &ledger.overview()).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "No sessions recorded yet.\n");
    }

    #[test]
    fn history_listing_marks_missing_performance() {
        let ledger = HistoryLedger::in_memory();
        ledger.append(CompletedSession::new(fixed_now(), Difficulty::easy(), 1, 4.0, 4.0, 4.0));
        let mut output = Vec::new();
        print_history(&mut output, &ledger.overview()).unwrap();

        let output = String::from_utf8(output).unwrap();
        let row = output.lines().nth(1).unwrap();
        assert!(row.starts_with("   1  2023-11-14 22:13:20  Easy"));
        assert!(row.ends_with("     -"));
    }
}
