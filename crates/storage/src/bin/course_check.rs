use std::fmt;

use course_core::model::{CourseDocument, InteractionKind};
use storage::repository::Storage;
use storage::source::{CourseSource, FileCourseSource};

#[derive(Debug, Clone)]
struct Args {
    course_dir: String,
    db_url: Option<String>,
    clear: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    ClearWithoutDb,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::ClearWithoutDb => write!(f, "--clear needs --db"),
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
        let mut course_dir =
            std::env::var("COURSE_DIR").unwrap_or_else(|_| "courses/demo".into());
        let mut db_url = std::env::var("COURSE_DB_URL").ok();
        let mut clear = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--course" => {
                    course_dir = require_value(&mut args, "--course")?;
                }
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(value);
                }
                "--clear" => clear = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if clear && db_url.is_none() {
            return Err(ArgsError::ClearWithoutDb);
        }

        Ok(Self {
            course_dir,
            db_url,
            clear,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin course_check -- [options]");
    eprintln!();
    eprintln!("Validates every language variant of a course and reports saved progress.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --course <dir>            Course directory (default: courses/demo)");
    eprintln!("  --db <sqlite_url>         Also report the saved snapshot in this database");
    eprintln!("  --clear                   Delete the saved snapshot (requires --db)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  COURSE_DIR, COURSE_DB_URL");
}

fn describe(document: &CourseDocument) {
    let questions = document
        .pages()
        .filter(|p| p.page.kind().is_question())
        .count();
    let results = document
        .pages()
        .filter(|p| p.page.kind() == InteractionKind::AssessmentResult)
        .count();
    println!(
        "  [{}] {}: {} topics, {} pages, {} questions, {} assessment results",
        document.language(),
        document.title(),
        document.topics().len(),
        document.page_count(),
        questions,
        results
    );
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let source = FileCourseSource::new(&args.course_dir);
    let languages = source.variants().await?;
    if languages.is_empty() {
        return Err(format!("no language variants under {}", args.course_dir).into());
    }

    println!("Course at {}", args.course_dir);
    let mut course_id = None;
    for language in &languages {
        let document = source.load_document(language).await?;
        describe(&document);
        match &course_id {
            None => course_id = Some(document.id().clone()),
            Some(id) if id != document.id() => {
                return Err(format!(
                    "variant {language} declares course {} but {} was expected",
                    document.id(),
                    id
                )
                .into());
            }
            Some(_) => {}
        }
    }

    let (Some(db_url), Some(course_id)) = (args.db_url, course_id) else {
        return Ok(());
    };
    let storage = Storage::sqlite(&db_url).await?;
    match storage.snapshots.load_snapshot(&course_id).await? {
        Some(snapshot) => {
            let completed = snapshot.progress.iter().filter(|(_, e)| e.completed).count();
            println!(
                "Saved progress for {course_id}: topic {} page {}, {completed} pages completed, saved {}",
                snapshot.position.topic_index, snapshot.position.page_index, snapshot.saved_at
            );
        }
        None => println!("No saved progress for {course_id}"),
    }
    if args.clear {
        storage.snapshots.clear_snapshot(&course_id).await?;
        println!("Cleared saved progress for {course_id}");
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
