use std::io::{BufRead, Write};

use quiz_core::model::{AnswerId, ParseIdError, Session};
use services::QuizSessionService;
use services::sessions::SubmitResponseInput;

/// Parse "1, 3" or "1 3" into answer ids.
pub(crate) fn parse_selection(line: &str) -> Result<Vec<AnswerId>, ParseIdError> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

/// Walk the player through every pending response of `session`.
///
/// An empty line or end of input stops early; the session stays resumable.
pub(crate) async fn run_session<R: BufRead, W: Write>(
    service: &QuizSessionService,
    session: &mut Session,
    input: &mut R,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    writeln!(out, "{} (session {})", session.quiz().title(), session.id())?;

    while let Some(response_id) = session.next_pending().map(|r| r.id()) {
        let question = session.question_for(response_id)?;
        writeln!(out)?;
        writeln!(out, "{} [{}]", question.label(), question.format())?;
        for answer in question.answers() {
            writeln!(out, "  {}) {}", answer.id(), answer.label())?;
        }
        write!(out, "> ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 || line.trim().is_empty() {
            writeln!(out, "Paused. Resume with --session {}", session.id())?;
            return Ok(());
        }

        let answers = match parse_selection(&line) {
            Ok(answers) => answers,
            Err(err) => {
                writeln!(out, "{err}")?;
                continue;
            }
        };

        match service
            .submit(session, SubmitResponseInput::new(response_id, answers))
            .await
        {
            Ok(result) => {
                writeln!(out, "{}", if result.valid { "Correct" } else { "Wrong" })?;
            }
            Err(err) if err.is_user_error() => writeln!(out, "{err}")?,
            Err(err) => return Err(err.into()),
        }
    }

    if !session.is_finished() {
        service.finalize(session).await?;
    }
    let progress = session.progress();
    writeln!(out)?;
    writeln!(out, "Finished: {}/{} correct", progress.valid, progress.total)?;
    Ok(())
}
