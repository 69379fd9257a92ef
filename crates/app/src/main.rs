mod console;

use std::fmt;

use exam_core::model::{CourseId, TestId, UserId};
use services::{AppServices, AuthContext, ClientConfig, Clock, TestFilter};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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

fn parse_id<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app login   --email <address>");
    eprintln!("  app courses");
    eprintln!("  app tests   [--course-id <id>]");
    eprintln!("  app take    --test-id <id> [--student-id <id>]");
    eprintln!();
    eprintln!("Global flags:");
    eprintln!("  --api <url>     API base url (default https://app.webfuze.in/)");
    eprintln!("  --token <jwt>   access token for authenticated commands");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_API_BASE_URL, EXAM_API_TIMEOUT_SECS, EXAM_ACCESS_TOKEN, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Login,
    Courses,
    Tests,
    Take,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "login" => Some(Self::Login),
            "courses" => Some(Self::Courses),
            "tests" => Some(Self::Tests),
            "take" => Some(Self::Take),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    api: Option<String>,
    token: Option<String>,
    email: Option<String>,
    course_id: Option<CourseId>,
    test_id: Option<TestId>,
    student_id: Option<UserId>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            token: std::env::var("EXAM_ACCESS_TOKEN").ok(),
            ..Self::default()
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => parsed.api = Some(require_value(args, "--api")?),
                "--token" => parsed.token = Some(require_value(args, "--token")?),
                "--email" => parsed.email = Some(require_value(args, "--email")?),
                "--course-id" => {
                    let value = require_value(args, "--course-id")?;
                    parsed.course_id = Some(parse_id(value, "--course-id")?);
                }
                "--test-id" => {
                    let value = require_value(args, "--test-id")?;
                    parsed.test_id = Some(parse_id(value, "--test-id")?);
                }
                "--student-id" => {
                    let value = require_value(args, "--student-id")?;
                    parsed.student_id = Some(parse_id(value, "--student-id")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::from_env();
        match &self.api {
            Some(api) => config.with_base_url(api.clone()),
            None => config,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_line(prompt: &str) -> Result<String, Box<dyn std::error::Error>> {
    eprint!("{prompt}");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim().to_string())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            ArgsError::UnknownArg(first.clone())
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let auth = parsed
        .token
        .as_deref()
        .map_or_else(AuthContext::new, |token| AuthContext::with_token(token));
    let services = AppServices::new(&parsed.client_config(), auth, Clock::default())?;

    match cmd {
        Command::Login => {
            let email = parsed
                .email
                .ok_or(ArgsError::MissingFlag { flag: "--email" })?;
            let auth = services.auth();
            auth.send_otp(&email).await?;
            let otp = read_line("one-time code: ").await?;
            let outcome = auth.verify_otp(&email, &otp).await?;
            if outcome.is_new_user {
                eprintln!("welcome! a new account was created for {email}");
            }
            // Printed on stdout so it can be captured into EXAM_ACCESS_TOKEN.
            if let Some(token) = auth.context().token() {
                println!("{token}");
            }
            Ok(())
        }
        Command::Courses => {
            for course in services.courses().list_courses().await? {
                println!(
                    "{:>5}  {}  ({}, {})",
                    course.id.value(),
                    course.title,
                    course.teacher_name().unwrap_or("unknown teacher"),
                    course.price
                );
            }
            Ok(())
        }
        Command::Tests => {
            let filter = TestFilter {
                course_id: parsed.course_id,
                is_published: Some(true),
                ..TestFilter::default()
            };
            for test in services.tests().list_tests(&filter).await? {
                println!(
                    "{:>5}  {}  {}",
                    test.id.value(),
                    test.title,
                    test.time_limit
                        .map(|m| format!("{m} min"))
                        .unwrap_or_default()
                );
            }
            Ok(())
        }
        Command::Take => {
            let test_id = parsed
                .test_id
                .ok_or(ArgsError::MissingFlag { flag: "--test-id" })?;
            let student_id = match parsed.student_id {
                Some(id) => id,
                None => services
                    .auth()
                    .session_user()?
                    .id
                    .ok_or(ArgsError::MissingFlag {
                        flag: "--student-id",
                    })?,
            };

            let attempt_id = services.tests().start_attempt(test_id, student_id).await?;
            info!(%attempt_id, %test_id, %student_id, "attempt opened");
            let attempts = services.attempts();
            let started = attempts.start_attempt(attempt_id, test_id).await?;
            console::run_attempt(&attempts, started).await
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
