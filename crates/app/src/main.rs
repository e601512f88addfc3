use std::io;

use services::{Clock, QuizSessionService};
use storage::repository::{QuizRepository, Storage};
use tracing_subscriber::EnvFilter;

mod args;
mod seed;
mod take;

use args::{Args, ArgsError, Command, print_usage};

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let first = argv.next();
    let cmd = match first.as_deref() {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::from_env().parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing(&parsed.log_filter);

    // Open + migrate SQLite in the binary glue so core/services stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    match cmd {
        Command::Seed => {
            let quiz = seed::sample_quiz(parsed.quiz_id)?;
            storage.quizzes.upsert_quiz(&quiz).await?;
            tracing::info!(
                quiz_id = %quiz.id(),
                questions = quiz.question_count(),
                "Seeded sample quiz"
            );
            Ok(())
        }
        Command::Take => {
            let service = QuizSessionService::from_storage(Clock::default(), &storage);
            let mut session = match parsed.session_id {
                Some(id) => service.resume_session(id).await?,
                None => {
                    service
                        .start_session(parsed.player_id, parsed.quiz_id)
                        .await?
                }
            };

            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut out = io::stdout();
            take::run_session(&service, &mut session, &mut input, &mut out).await
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
