use std::fmt;
use std::io::Write as _;
use std::sync::Arc;

use services::{Clock, CoursePlayer, EngineError, LogReportingSink, PlayerError, Transition};
use storage::repository::Storage;
use storage::source::FileCourseSource;
use tokio::io::{AsyncBufReadExt, BufReader};

mod commands;
mod render;

use commands::{Command, CommandError, HELP, parse_command};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLanguage { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLanguage { raw } => write!(f, "invalid --lang value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--course <dir>] [--lang <code>] [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --course courses/demo");
    eprintln!("  --lang en");
    eprintln!("  --db sqlite://course_player.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DIR, COURSE_LANG, COURSE_DB_URL, RUST_LOG");
}

#[derive(Debug)]
struct Args {
    course_dir: String,
    language: String,
    db_url: String,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut course_dir = std::env::var("COURSE_DIR").unwrap_or_else(|_| "courses/demo".into());
        let mut language = std::env::var("COURSE_LANG").unwrap_or_else(|_| "en".into());
        let mut db_url = std::env::var("COURSE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://course_player.sqlite3".into(), normalize_sqlite_url);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--course" => course_dir = require_value(args, "--course")?,
                "--lang" => {
                    let value = require_value(args, "--lang")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidLanguage { raw: value });
                    }
                    language = value;
                }
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            course_dir,
            language,
            db_url,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
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

//
// ─── REPL ──────────────────────────────────────────────────────────────────────
//

fn current_page_id(player: &CoursePlayer) -> Result<course_core::model::PageId, PlayerError> {
    let current = player
        .engine()
        .current_page()
        .map_err(EngineError::from)?;
    Ok(current.page.id().clone())
}

fn print_transition(player: &CoursePlayer, transition: Transition, seed: u64) {
    match transition {
        Transition::Moved { .. } => print!("{}", render::render_page(player.engine(), seed)),
        Transition::Blocked => {
            let config = player.engine().document().config();
            println!("{}", config.label("locked").unwrap_or("Locked"));
        }
        Transition::AtBoundary => println!("(nowhere further to go)"),
        Transition::CourseCompleted => {
            println!("Course complete!");
            println!("{}", render::render_status(player.engine()));
        }
    }
}

async fn execute(player: &mut CoursePlayer, command: Command, seed: u64) -> Result<(), PlayerError> {
    match command {
        Command::Next => {
            let transition = player.go_next().await?;
            print_transition(player, transition, seed);
        }
        Command::Back => {
            let transition = player.go_back().await?;
            print_transition(player, transition, seed);
        }
        Command::Goto { topic, page } => {
            let transition = player.go_to_page(&topic, &page).await?;
            print_transition(player, transition, seed);
        }
        Command::Submit(answer) => {
            let page = current_page_id(player)?;
            let outcome = player.submit_answer(&page, answer).await?;
            let config = player.engine().document().config();
            println!("=> {}", render::feedback_text(config, outcome.feedback));
        }
        Command::Retry => {
            let page = current_page_id(player)?;
            player.retry(&page)?;
            print!("{}", render::render_page(player.engine(), seed));
        }
        Command::Done => {
            let page = current_page_id(player)?;
            player.mark_complete(&page).await?;
            print!("{}", render::render_page(player.engine(), seed));
        }
        Command::Media => {
            let page = current_page_id(player)?;
            match player.media_finished(&page).await? {
                Some(transition) => print_transition(player, transition, seed),
                None => print!("{}", render::render_page(player.engine(), seed)),
            }
        }
        Command::Audio(enabled) => {
            player.set_audio_enabled(enabled).await?;
            print!("{}", render::render_page(player.engine(), seed));
        }
        Command::Lang(code) => {
            player.set_language(&code).await?;
            print!("{}", render::render_page(player.engine(), seed));
        }
        Command::Menu => {
            if player.toggle_menu()? {
                print!("{}", render::render_menu(player.engine()));
            }
        }
        Command::Transcript => {
            player.toggle_transcript()?;
            print!("{}", render::render_page(player.engine(), seed));
        }
        Command::Status => println!("{}", render::render_status(player.engine())),
        Command::Resume => {
            player.resume().await?;
            print!("{}", render::render_page(player.engine(), seed));
        }
        Command::Restart => {
            player.restart().await?;
            print!("{}", render::render_page(player.engine(), seed));
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite here so the library crates stay free of file-system setup.
    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;
    let source = Arc::new(FileCourseSource::new(&args.course_dir));
    let clock = Clock::default();
    let seed = u64::from(clock.now().timestamp_subsec_nanos());

    let mut player = CoursePlayer::load(
        source,
        &storage,
        Box::new(LogReportingSink),
        &args.language,
        clock,
    )
    .await?;
    log::info!("course loaded from {} ({})", args.course_dir, args.language);

    println!("{}", player.engine().document().title());
    if player.resume_available() {
        let config = player.engine().document().config();
        println!("{}", render::describe_error(config, &PlayerError::ResumePending));
    } else {
        print!("{}", render::render_page(player.engine(), seed));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        if let Err(err) = execute(&mut player, command, seed).await {
            let config = player.engine().document().config();
            println!("{}", render::describe_error(config, &err));
        }
    }

    player.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
