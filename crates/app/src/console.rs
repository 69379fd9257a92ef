use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use exam_core::model::{AttemptSession, OptionId, QuestionStatus};
use exam_core::time::elapsed_minutes;
use services::{AttemptService, StartedAttempt};
use tokio::io::{AsyncBufReadExt, BufReader};

/// One line of input at the attempt prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptCommand {
    /// 1-based question number, as printed on the board.
    Goto(usize),
    Next,
    Select(String),
    Mark,
    Clear,
    Stats,
    Show,
    Submit,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCommandError(String);

impl std::fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseCommandError {}

impl FromStr for AttemptCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Ok(Self::Show);
        };
        let arg = parts.next();

        match (head.to_ascii_lowercase().as_str(), arg) {
            ("goto" | "g", Some(raw)) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(Self::Goto)
                .ok_or_else(|| ParseCommandError(format!("not a question number: {raw}"))),
            ("goto" | "g", None) => Err(ParseCommandError("goto needs a question number".into())),
            ("select" | "s", Some(raw)) => Ok(Self::Select(raw.to_string())),
            ("select" | "s", None) => Err(ParseCommandError("select needs an option".into())),
            ("next" | "n", _) => Ok(Self::Next),
            ("mark" | "m", _) => Ok(Self::Mark),
            ("clear" | "c", _) => Ok(Self::Clear),
            ("stats", _) => Ok(Self::Stats),
            ("show", _) => Ok(Self::Show),
            ("submit", _) => Ok(Self::Submit),
            ("help" | "?", _) => Ok(Self::Help),
            ("quit" | "q" | "exit", _) => Ok(Self::Quit),
            (other, _) => Err(ParseCommandError(format!("unknown command: {other}"))),
        }
    }
}

/// Apply a state-changing command to the session.
///
/// Commands that do not mutate (stats, show, submit, ...) are ignored here.
///
/// # Errors
///
/// Returns the attempt error for an out-of-range question or unknown option.
pub fn apply(session: &mut AttemptSession, command: &AttemptCommand) -> Result<(), exam_core::Error> {
    match command {
        AttemptCommand::Goto(number) => session.navigate_to(number.saturating_sub(1))?,
        AttemptCommand::Next => session.go_to_next(),
        AttemptCommand::Select(raw) => {
            let question_id = session.current_question().id();
            let option_id = resolve_option(session, raw);
            session.select_option(question_id, option_id)?;
        }
        AttemptCommand::Mark => session.mark_for_review(),
        AttemptCommand::Clear => session.clear_response(),
        AttemptCommand::Stats
        | AttemptCommand::Show
        | AttemptCommand::Submit
        | AttemptCommand::Help
        | AttemptCommand::Quit => {}
    }
    Ok(())
}

/// Exact option id first, then a letter (`a`, `b`, ...) for the option's position.
fn resolve_option(session: &AttemptSession, raw: &str) -> OptionId {
    let question = session.current_question();
    let exact = OptionId::new(raw);
    if question.has_option(&exact) {
        return exact;
    }

    let mut chars = raw.chars();
    if let (Some(letter), None) = (chars.next(), chars.next()) {
        if letter.is_ascii_alphabetic() {
            let index = usize::from(letter.to_ascii_lowercase() as u8 - b'a');
            if let Some(option) = question.option_at(index) {
                return option.id().clone();
            }
        }
    }
    exact
}

fn status_glyph(status: QuestionStatus) -> char {
    match status {
        QuestionStatus::Answered => '+',
        QuestionStatus::NotAnswered => 'x',
        QuestionStatus::Marked => '?',
        QuestionStatus::NotVisited => '.',
    }
}

#[must_use]
pub fn render_board(session: &AttemptSession) -> String {
    let mut out = String::new();
    for (index, (_, status)) in session.status_board().into_iter().enumerate() {
        let cursor = if index == session.current_index() { '>' } else { ' ' };
        let _ = write!(out, "{cursor}{}{} ", index + 1, status_glyph(status));
    }
    out.push_str("\n  (+ answered, x not answered, ? marked, . not visited)");
    out
}

#[must_use]
pub fn render_question(session: &AttemptSession) -> String {
    let question = session.current_question();
    let selected = session.answer_for(question.id());
    let mut out = format!(
        "Q{}. {}  [{} marks]\n",
        session.current_index() + 1,
        question.text(),
        question.marks()
    );
    for (index, option) in question.options().iter().enumerate() {
        let letter = char::from(b'a' + u8::try_from(index % 26).unwrap_or(0));
        let mark = if selected == Some(option.id()) { '*' } else { ' ' };
        let _ = writeln!(out, " {mark} {letter}) {}", option.text());
    }
    out
}

#[must_use]
pub fn render_stats(session: &AttemptSession) -> String {
    let stats = session.stats();
    format!(
        "answered {}, not answered {}, marked {}, not visited {} (of {})",
        stats.answered,
        stats.not_answered,
        stats.marked,
        stats.not_visited,
        stats.total()
    )
}

/// Stats line plus minutes spent since the attempt started.
#[must_use]
pub fn render_progress(session: &AttemptSession, now: DateTime<Utc>) -> String {
    let elapsed = elapsed_minutes(session.started_at(), now);
    format!("{}; {elapsed} min elapsed", render_stats(session))
}

const HELP: &str = "commands: goto N | next | select <a|b|..|option-id> | mark | clear | stats | show | submit | quit";

/// Drive one attempt from the terminal until it is submitted or abandoned.
///
/// # Errors
///
/// Returns an error only if standard input cannot be read.
pub async fn run_attempt(
    attempts: &AttemptService,
    started: StartedAttempt,
) -> Result<(), Box<dyn std::error::Error>> {
    let StartedAttempt {
        title,
        time_limit_minutes,
        total_marks,
        mut session,
        ..
    } = started;

    println!("{title}");
    match time_limit_minutes {
        Some(minutes) => println!("time limit {minutes} min, total marks {total_marks}"),
        None => println!("total marks {total_marks}"),
    }
    println!("{HELP}\n");
    println!("{}\n{}", render_board(&session), render_question(&session));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match line.parse::<AttemptCommand>() {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match command {
            AttemptCommand::Quit => {
                println!("attempt abandoned; nothing was submitted");
                return Ok(());
            }
            AttemptCommand::Help => println!("{HELP}"),
            AttemptCommand::Stats => {
                println!("{}", render_progress(&session, attempts.clock().now()));
            }
            AttemptCommand::Submit => match attempts.submit(&mut session).await {
                Ok(receipt) => {
                    println!(
                        "submitted {} answer(s) for attempt {}",
                        receipt.answered, receipt.attempt_id
                    );
                    return Ok(());
                }
                Err(err) => println!("submission failed: {err}; you can try again"),
            },
            other => match apply(&mut session, &other) {
                Ok(()) => println!("{}\n{}", render_board(&session), render_question(&session)),
                Err(err) => println!("{err}"),
            },
        }
    }

    println!("input closed; nothing was submitted");
    Ok(())
}
