use std::fmt;
use std::str::FromStr;

use eco_core::model::{
    Alternative, Card, CardError, CardId, GameSettings, GameSettingsDraft, GameSettingsError,
    SessionId,
};

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidNumber { source: &'static str, raw: String },
    InvalidSessionId { raw: String },
    InvalidCardId { raw: String },
    InvalidChoice { raw: String },
    MissingArgument { command: &'static str, name: &'static str },
    Settings(GameSettingsError),
    Card(CardError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidNumber { source, raw } => write!(f, "invalid {source} value: {raw}"),
            ArgsError::InvalidSessionId { raw } => write!(f, "invalid session id: {raw}"),
            ArgsError::InvalidCardId { raw } => write!(f, "invalid card id: {raw}"),
            ArgsError::InvalidChoice { raw } => {
                write!(f, "invalid choice format (use \"Text:NUMBER\"): {raw}")
            }
            ArgsError::MissingArgument { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::Settings(err) => write!(f, "invalid settings: {err}"),
            ArgsError::Card(err) => write!(f, "invalid card: {err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<GameSettingsError> for ArgsError {
    fn from(err: GameSettingsError) -> Self {
        ArgsError::Settings(err)
    }
}

impl From<CardError> for ArgsError {
    fn from(err: CardError) -> Self {
        ArgsError::Card(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    History { json: bool },
    Remove { id: SessionId },
    ClearHistory,
    AddCard(Card),
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub settings: GameSettings,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  eco-cards [play] [--difficulty <label>] [--rounds <n>] [--seed <n>]");
    eprintln!("  eco-cards history [--json]");
    eprintln!("  eco-cards remove <session-id>");
    eprintln!("  eco-cards clear-history");
    eprintln!("  eco-cards add-card <id> <scenario> <difficulty> <choice>:<co2> [<choice>:<co2> ...]");
    eprintln!();
    eprintln!("Global options:");
    eprintln!("  --cards <path>     card file (default data/cards.json)");
    eprintln!("  --history <path>   history file (default data/game_sessions.json)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ECO_CARDS_PATH, ECO_HISTORY_PATH, ECO_DIFFICULTY, ECO_ROUNDS, ECO_SEED, RUST_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: FromStr>(source: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { source, raw })
}

fn env_draft(env: &impl Fn(&str) -> Option<String>) -> Result<GameSettingsDraft, ArgsError> {
    Ok(GameSettingsDraft {
        cards_path: env("ECO_CARDS_PATH"),
        history_path: env("ECO_HISTORY_PATH"),
        difficulty: env("ECO_DIFFICULTY"),
        rounds: env("ECO_ROUNDS")
            .map(|raw| parse_number("ECO_ROUNDS", raw))
            .transpose()?,
        shuffle_seed: env("ECO_SEED")
            .map(|raw| parse_number("ECO_SEED", raw))
            .transpose()?,
    })
}

/// Parses a `label:impact` token, splitting on the last colon.
pub fn parse_choice(raw: &str) -> Result<Alternative, ArgsError> {
    let invalid = || ArgsError::InvalidChoice {
        raw: raw.to_owned(),
    };
    let (label, impact) = raw.trim().rsplit_once(':').ok_or_else(invalid)?;
    let label = label.trim();
    if label.is_empty() {
        return Err(invalid());
    }
    let impact: f64 = impact.trim().parse().map_err(|_| invalid())?;
    Ok(Alternative::new(label, impact))
}

fn parse_card(positional: Vec<String>) -> Result<Card, ArgsError> {
    let mut fields = positional.into_iter();
    let missing = |name| ArgsError::MissingArgument {
        command: "add-card",
        name,
    };

    let raw_id = fields.next().ok_or_else(|| missing("id"))?;
    let id = CardId::from_str(&raw_id).map_err(|_| ArgsError::InvalidCardId { raw: raw_id })?;
    let scenario = fields.next().ok_or_else(|| missing("scenario"))?;
    let difficulty = fields.next().ok_or_else(|| missing("difficulty"))?;
    let alternatives = fields
        .map(|token| parse_choice(&token))
        .collect::<Result<Vec<_>, _>>()?;
    if alternatives.is_empty() {
        return Err(missing("choice:co2"));
    }

    Ok(Card::new(id, scenario, difficulty, alternatives)?)
}

impl Cli {
    /// Builds settings from environment values overlaid with flags.
    ///
    /// Flags may appear before or after the subcommand.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown arguments, malformed values and
    /// settings that fail validation.
    pub fn parse_from(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut flags = GameSettingsDraft::new();
        let mut json = false;
        let mut help = false;
        let mut positional = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--cards" => flags.cards_path = Some(require_value(&mut args, "--cards")?),
                "--history" => flags.history_path = Some(require_value(&mut args, "--history")?),
                "--difficulty" => {
                    flags.difficulty = Some(require_value(&mut args, "--difficulty")?);
                }
                "--rounds" => {
                    let value = require_value(&mut args, "--rounds")?;
                    flags.rounds = Some(parse_number("--rounds", value)?);
                }
                "--seed" => {
                    let value = require_value(&mut args, "--seed")?;
                    flags.shuffle_seed = Some(parse_number("--seed", value)?);
                }
                "--json" => json = true,
                "--help" | "-h" => help = true,
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let settings = env_draft(&env)?.merge(flags).validate()?;
        if help {
            return Ok(Self {
                settings,
                command: Command::Help,
            });
        }

        let mut positional = positional.into_iter();
        let command = match positional.next().as_deref() {
            None | Some("play") => Command::Play,
            Some("history") => Command::History { json },
            Some("remove") => {
                let raw = positional.next().ok_or(ArgsError::MissingArgument {
                    command: "remove",
                    name: "session-id",
                })?;
                let id = SessionId::from_str(&raw)
                    .map_err(|_| ArgsError::InvalidSessionId { raw: raw.clone() })?;
                Command::Remove { id }
            }
            Some("clear-history") => Command::ClearHistory,
            Some("add-card") => return Ok(Self {
                settings,
                command: Command::AddCard(parse_card(positional.collect())?),
            }),
            Some(other) => return Err(ArgsError::UnknownCommand(other.to_owned())),
        };

        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }
        Ok(Self { settings, command })
    }

    /// Parses the process arguments and environment.
    ///
    /// # Errors
    ///
    /// See [`Cli::parse_from`].
    pub fn parse() -> Result<Self, ArgsError> {
        Self::parse_from(std::env::args().skip(1), |key| std::env::var(key).ok())
    }
}
