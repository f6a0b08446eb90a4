use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

use drillday::catalog::Catalog;
use drillday::progress::{Progress, track_difficulty};
use drillday::review::Quality;
use drillday::{Error, Result, error, scheduler, web};

const USAGE: &str = "\
Usage: drillday <command> [args...] [options]
Commands:
  today                        Show today's exercises
  grade <exercise-id> <1-5>    Record an answer and reschedule its review
  lesson <lesson-id>           Mark a lesson as completed
  serve                        Start the JSON API (default port 3000)
Options:
  --catalog DIR      Catalog directory with tracks.csv and exercises.csv (default: catalog)
  --progress FILE    Learner progress file (default: progress.json)
  --date YYYY-MM-DD  Use this date instead of today
  --json             Print today's list as JSON
  -p PORT            Port for serve
Set RUST_LOG to change log verbosity.";

#[derive(Debug)]
struct Options {
    args: Vec<String>,
    catalog: PathBuf,
    progress: PathBuf,
    date: Option<NaiveDate>,
    port: u16,
    json: bool,
}

impl Options {
    fn parse(raw: &[String]) -> std::result::Result<Options, String> {
        let mut opts = Options {
            args: Vec::new(),
            catalog: PathBuf::from("catalog"),
            progress: PathBuf::from("progress.json"),
            date: None,
            port: 3000,
            json: false,
        };
        let mut iter = raw.iter();
        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| format!("{flag} needs a value"))
            };
            match arg.as_str() {
                "--catalog" => opts.catalog = PathBuf::from(value("--catalog")?),
                "--progress" => opts.progress = PathBuf::from(value("--progress")?),
                "--date" => {
                    let v = value("--date")?;
                    opts.date = Some(error::parse_date(&v).map_err(|e| e.to_string())?);
                }
                "-p" | "--port" => {
                    let v = value("-p")?;
                    opts.port = v.parse().map_err(|_| format!("Invalid port: {v}"))?;
                }
                "--json" => opts.json = true,
                _ => opts.args.push(arg.clone()),
            }
        }
        Ok(opts)
    }

    fn today(&self) -> NaiveDate {
        self.date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// `RUST_LOG` directives when set and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> ExitCode {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    }

    let opts = match Options::parse(&args[2..]) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match args[1].as_str() {
        "today" => today(&opts),
        "grade" => grade(&opts),
        "lesson" => lesson(&opts),
        "serve" => serve(opts),
        "-h" | "--help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!("Commands: today, grade, lesson, serve");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn today(opts: &Options) -> Result<()> {
    let catalog = Catalog::load_dir(&opts.catalog)?;
    let progress = Progress::load(&opts.progress)?;
    let date = opts.today();

    let active = progress.active_tracks(&catalog);
    let list = scheduler::daily_exercises(
        &catalog,
        &active,
        &progress.completed_drills,
        &progress.reviews_due(date),
        &progress.completed_lessons,
        date,
    );

    if opts.json {
        let out = serde_json::to_string_pretty(&list).map_err(|source| Error::Json {
            path: PathBuf::from("<stdout>"),
            source,
        })?;
        println!("{out}");
        return Ok(());
    }

    println!("Exercises for {date}:");
    for track in &active {
        let tier = track_difficulty(&catalog, track, &progress.completed_lessons);
        println!("  track {track}: {tier}");
    }
    println!();
    if list.is_empty() {
        println!("No exercises available for your tracks.");
        return Ok(());
    }
    for (i, daily) in list.iter().enumerate() {
        let ex = &daily.exercise;
        println!(
            "  {}. [{}] {} ({}, {}) {}",
            i + 1,
            daily.provenance,
            ex.id,
            ex.track,
            ex.difficulty,
            ex.title
        );
    }
    Ok(())
}

fn grade(opts: &Options) -> Result<()> {
    let [exercise_id, quality] = opts.args.as_slice() else {
        return Err(Error::Usage(
            "Usage: drillday grade <exercise-id> <1-5>".to_string(),
        ));
    };
    let quality: u8 = quality
        .parse()
        .map_err(|_| Error::Usage(format!("quality must be a number from 1 to 5, got '{quality}'")))?;
    let quality = Quality::new(quality)?;

    let catalog = Catalog::load_dir(&opts.catalog)?;
    let exercise = catalog
        .get(exercise_id)
        .ok_or_else(|| Error::UnknownExercise(exercise_id.clone()))?;

    let mut progress = Progress::load(&opts.progress)?;
    let item = progress.record_answer(exercise, quality, opts.today()).clone();
    progress.save(&opts.progress)?;

    println!(
        "{}: next review {} (every {} days, ease {:.2}, streak {})",
        item.exercise_id, item.next_review_date, item.interval, item.ease_factor, item.repetitions
    );
    Ok(())
}

fn lesson(opts: &Options) -> Result<()> {
    let [lesson_id] = opts.args.as_slice() else {
        return Err(Error::Usage("Usage: drillday lesson <lesson-id>".to_string()));
    };
    let mut progress = Progress::load(&opts.progress)?;
    if progress.complete_lesson(lesson_id) {
        progress.save(&opts.progress)?;
        println!("Completed lesson {lesson_id}.");
    } else {
        println!("Lesson {lesson_id} was already complete.");
    }
    Ok(())
}

fn serve(opts: Options) -> Result<()> {
    let catalog = Catalog::load_dir(&opts.catalog)?;
    let runtime = tokio::runtime::Runtime::new().map_err(Error::Server)?;
    runtime.block_on(web::serve(catalog, opts.progress, opts.port))
}
