use std::fmt;

use quiz_core::model::{PlayerId, QuizId, SessionId};

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidPlayerId { raw: String },
    InvalidQuizId { raw: String },
    InvalidSessionId { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidPlayerId { raw } => write!(f, "invalid --player-id value: {raw}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw}"),
            ArgsError::InvalidSessionId { raw } => write!(f, "invalid --session value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Seed,
    Take,
}

impl Command {
    pub(crate) fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "take" => Some(Self::Take),
            _ => None,
        }
    }
}

/// Runtime configuration: environment first, flags override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Args {
    pub db_url: String,
    pub player_id: PlayerId,
    pub quiz_id: QuizId,
    pub session_id: Option<SessionId>,
    pub log_filter: String,
}

pub(crate) fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- seed [--db <sqlite_url>] [--quiz-id <id>]");
    eprintln!("  cargo run -p app -- take [--db <sqlite_url>] [--quiz-id <id>] [--player-id <id>]");
    eprintln!("                           [--session <uuid>] [-v]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://quiz.sqlite3");
    eprintln!("  --quiz-id 1 --player-id 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_QUIZ_ID, QUIZ_PLAYER_ID, QUIZ_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    pub(crate) fn from_env() -> Self {
        Self {
            db_url: std::env::var("QUIZ_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url),
            player_id: std::env::var("QUIZ_PLAYER_ID")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or_else(|| PlayerId::new(1)),
            quiz_id: std::env::var("QUIZ_QUIZ_ID")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or_else(|| QuizId::new(1)),
            session_id: None,
            log_filter: std::env::var("QUIZ_LOG").unwrap_or_else(|_| "info".into()),
        }
    }

    /// Apply command-line flags on top of `self`.
    pub(crate) fn parse(
        mut self,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    self.db_url = normalize_sqlite_url(value);
                }
                "--player-id" => {
                    let value = require_value(args, "--player-id")?;
                    self.player_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidPlayerId { raw: value.clone() })?;
                }
                "--quiz-id" => {
                    let value = require_value(args, "--quiz-id")?;
                    self.quiz_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                }
                "--session" => {
                    let value = require_value(args, "--session")?;
                    self.session_id = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidSessionId { raw: value.clone() })?,
                    );
                }
                "-v" | "--verbose" => {
                    self.log_filter = "debug".into();
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(self)
    }
}

pub(crate) fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}
