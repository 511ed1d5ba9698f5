use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use lms_core::model::{LearnerId, ProgressRecord, QuizAttempt};
use lms_core::scoring;
use std::collections::BTreeMap;
use storage::catalog::JsonCatalog;
use storage::repository::{ContentRepository, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    catalog_path: String,
    learner: LearnerId,
    lessons_per_course: usize,
    attempts_per_quiz: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    FlagNeedsValue(&'static str),
    UnrecognizedFlag(String),
    BadLearner(String),
    BadCount { flag: &'static str, raw: String },
    EmptyDbUrl,
    BadTimestamp(String),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::FlagNeedsValue(flag) => write!(f, "{flag} needs a value"),
            ArgsError::UnrecognizedFlag(arg) => write!(f, "unrecognized argument: {arg}"),
            ArgsError::BadLearner(raw) => {
                write!(f, "--learner wants a UUID, got: {raw}")
            }
            ArgsError::BadCount { flag, raw } => {
                write!(f, "{flag} wants a non-negative integer, got: {raw}")
            }
            ArgsError::EmptyDbUrl => write!(f, "--db must not be empty"),
            ArgsError::BadTimestamp(raw) => {
                write!(f, "--now wants an RFC3339 timestamp, got: {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &'static str) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::FlagNeedsValue(flag))
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("LMS_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut catalog_path =
            std::env::var("LMS_CATALOG").unwrap_or_else(|_| "data/courses.json".into());
        let mut learner = std::env::var("LMS_LEARNER")
            .ok()
            .and_then(|value| value.parse::<LearnerId>().ok())
            .unwrap_or_else(LearnerId::new_random);
        let mut lessons_per_course = 2_usize;
        let mut attempts_per_quiz = 1_u32;
        let mut now: Option<DateTime<Utc>> = None;

        let mut raw_args = std::env::args().skip(1);
        while let Some(arg) = raw_args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = next_value(&mut raw_args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::EmptyDbUrl);
                    }
                    db_url = value;
                }
                "--catalog" => {
                    catalog_path = next_value(&mut raw_args, "--catalog")?;
                }
                "--learner" => {
                    let value = next_value(&mut raw_args, "--learner")?;
                    learner = value
                        .parse::<LearnerId>()
                        .map_err(|_| ArgsError::BadLearner(value.clone()))?;
                }
                "--lessons" => {
                    let value = next_value(&mut raw_args, "--lessons")?;
                    lessons_per_course = value.parse::<usize>().map_err(|_| ArgsError::BadCount {
                        flag: "--lessons",
                        raw: value.clone(),
                    })?;
                }
                "--attempts" => {
                    let value = next_value(&mut raw_args, "--attempts")?;
                    attempts_per_quiz = value.parse::<u32>().map_err(|_| ArgsError::BadCount {
                        flag: "--attempts",
                        raw: value.clone(),
                    })?;
                }
                "--now" => {
                    let value = next_value(&mut raw_args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::BadTimestamp(value.clone()))?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnrecognizedFlag(arg)),
            }
        }

        Ok(Self {
            db_url,
            catalog_path,
            learner,
            lessons_per_course,
            attempts_per_quiz,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("usage: cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("options:");
    eprintln!("  --db <sqlite_url>    database to seed (default sqlite:dev.sqlite3)");
    eprintln!("  --catalog <path>     course catalog JSON (default data/courses.json)");
    eprintln!("  --learner <uuid>     learner to seed for (default: a random one)");
    eprintln!("  --lessons <n>        lessons to complete per course (default 2)");
    eprintln!("  --attempts <n>       quiz attempts to record per quiz (default 1)");
    eprintln!("  --now <rfc3339>      fixed current time for deterministic output");
    eprintln!("  -h, --help           print this help");
    eprintln!();
    eprintln!("env vars LMS_DB_URL, LMS_CATALOG and LMS_LEARNER act as defaults");
    eprintln!("for the matching flags.");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let catalog = JsonCatalog::from_file(&args.catalog_path)?;
    let content: Arc<dyn ContentRepository> = Arc::new(catalog);
    let storage = Storage::sqlite(&args.db_url, content).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let courses = storage.content.list_courses().await?;
    let mut lessons_seeded = 0_usize;
    let mut attempts_seeded = 0_u32;

    for course in &courses {
        if args.lessons_per_course > 0 && course.lesson_count() > 0 {
            let mut record = ProgressRecord::new(course.id());
            for lesson in course.lessons().iter().take(args.lessons_per_course) {
                if record.mark_complete(lesson.id()) {
                    lessons_seeded += 1;
                }
            }
            storage.progress.upsert_progress(args.learner, &record).await?;
        }

        let Some(quiz_id) = course.quiz_id() else {
            continue;
        };
        let Some(quiz) = storage.content.get_quiz(quiz_id).await? else {
            continue;
        };

        for n in 0..args.attempts_per_quiz {
            // Alternate a failing first try with a perfect retake.
            let answers: BTreeMap<_, _> = if n % 2 == 0 {
                BTreeMap::new()
            } else {
                quiz.questions()
                    .iter()
                    .map(|question| (question.id(), question.correct()))
                    .collect()
            };
            let report = scoring::score(quiz.questions(), &answers, quiz.pass_threshold());
            let started = now - Duration::days(i64::from(args.attempts_per_quiz - n));
            let attempt = QuizAttempt::from_score(
                quiz.id(),
                course.id(),
                answers,
                started,
                started + Duration::minutes(5),
                &report,
            )?;
            storage.attempts.append_attempt(args.learner, &attempt).await?;
            attempts_seeded += 1;
        }
    }

    println!(
        "Seeded learner {} with {} completed lessons and {} quiz attempts across {} courses into {}",
        args.learner,
        lessons_seeded,
        attempts_seeded,
        courses.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
