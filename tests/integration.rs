use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;

use drillday::catalog::{Catalog, Difficulty};
use drillday::progress::{Progress, detect_active_tracks, track_difficulty};
use drillday::review::{Quality, create_review_item, calculate_next_review};
use drillday::scheduler::{DAILY_COUNT, DailyExercise, Provenance, daily_exercises};

fn write_catalog(dir: &Path) {
    let mut f = std::fs::File::create(dir.join("tracks.csv")).unwrap();
    writeln!(f, "track,lesson").unwrap();
    for lesson in ["app-router", "data-fetching", "caching"] {
        writeln!(f, "nextjs,{lesson}").unwrap();
    }
    for lesson in ["modules", "streams", "workers"] {
        writeln!(f, "nodejs,{lesson}").unwrap();
    }
    writeln!(f, "python,basics").unwrap();

    let mut f = std::fs::File::create(dir.join("exercises.csv")).unwrap();
    writeln!(f, "id,track,difficulty,title,prompt").unwrap();
    let rows = [
        ("next-1", "nextjs", "beginner"),
        ("next-2", "nextjs", "beginner"),
        ("next-3", "nextjs", "intermediate"),
        ("next-4", "nextjs", "intermediate"),
        ("next-5", "nextjs", "advanced"),
        ("node-1", "nodejs", "beginner"),
        ("node-2", "nodejs", "beginner"),
        ("node-3", "nodejs", "intermediate"),
        ("node-4", "nodejs", "advanced"),
        ("py-1", "python", "beginner"),
    ];
    for (id, track, difficulty) in rows {
        writeln!(f, "{id},{track},{difficulty},Title {id},Solve {id}").unwrap();
    }
}

fn plan(catalog: &Catalog, progress: &Progress, date: NaiveDate) -> Vec<DailyExercise> {
    let active = progress.active_tracks(catalog);
    daily_exercises(
        catalog,
        &active,
        &progress.completed_drills,
        &progress.reviews_due(date),
        &progress.completed_lessons,
        date,
    )
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn new_learner_gets_five_from_default_tracks() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    let catalog = Catalog::load_dir(dir.path()).unwrap();
    let progress = Progress::default();

    assert_eq!(
        detect_active_tracks(&catalog, &progress.completed_lessons),
        vec!["nextjs", "nodejs"]
    );

    let list = plan(&catalog, &progress, date(2024, 1, 1));
    assert_eq!(list.len(), DAILY_COUNT);
    let ids: HashSet<&str> = list.iter().map(|d| d.exercise.id.as_str()).collect();
    assert_eq!(ids.len(), list.len());
    assert!(list.iter().all(|d| d.exercise.track != "python"));
    assert_eq!(list[4].provenance, Provenance::Stretch);

    assert_eq!(list, plan(&catalog, &progress, date(2024, 1, 1)));
}

#[test]
fn answered_exercise_resurfaces_as_review_when_due() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    let catalog = Catalog::load_dir(dir.path()).unwrap();
    let progress_path = dir.path().join("progress.json");

    let day1 = date(2024, 5, 1);
    let mut progress = Progress::load(&progress_path).unwrap();
    progress.complete_lesson("app-router");
    let exercise = catalog.get("next-1").unwrap();
    let item = progress
        .record_answer(exercise, Quality::new(4).unwrap(), day1)
        .clone();
    assert_eq!(item.next_review_date, date(2024, 5, 2));
    progress.save(&progress_path).unwrap();

    let progress = Progress::load(&progress_path).unwrap();
    assert_eq!(progress.active_tracks(&catalog), vec!["nextjs"]);

    // Same day: not due, and already completed so not offered as new either.
    let today = plan(&catalog, &progress, day1);
    assert!(today.iter().all(|d| d.provenance != Provenance::Review
        || d.exercise.id == "next-1"));
    assert!(
        today
            .iter()
            .filter(|d| d.exercise.id == "next-1")
            .all(|d| d.provenance == Provenance::Review)
    );

    // Next day: due, so it leads the list as a review.
    let tomorrow = plan(&catalog, &progress, date(2024, 5, 2));
    assert_eq!(tomorrow[0].exercise.id, "next-1");
    assert_eq!(tomorrow[0].provenance, Provenance::Review);
    assert!(tomorrow.len() <= DAILY_COUNT);
}

#[test]
fn tier_rises_with_completed_lessons() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    let catalog = Catalog::load_dir(dir.path()).unwrap();
    let mut progress = Progress::default();

    progress.complete_lesson("modules");
    assert_eq!(
        track_difficulty(&catalog, "nodejs", &progress.completed_lessons),
        Difficulty::Beginner
    );
    progress.complete_lesson("streams");
    assert_eq!(
        track_difficulty(&catalog, "nodejs", &progress.completed_lessons),
        Difficulty::Intermediate
    );
    progress.complete_lesson("workers");
    assert_eq!(
        track_difficulty(&catalog, "nodejs", &progress.completed_lessons),
        Difficulty::Advanced
    );

    // Only nodejs is active; it has four exercises in total.
    let list = plan(&catalog, &progress, date(2024, 2, 29));
    assert_eq!(list.len(), 4);
    assert!(list.iter().all(|d| d.exercise.track == "nodejs"));
}

#[test]
fn review_cycle_follows_early_schedule() {
    let start = date(2024, 1, 1);
    let mut item = create_review_item("next-1", "nextjs", Quality::new(5).unwrap(), start);
    assert_eq!(item.interval, 1);
    assert_eq!(item.repetitions, 1);
    assert!((item.ease_factor - 2.6).abs() < 1e-9);
    assert_eq!(item.next_review_date, date(2024, 1, 2));

    let mut intervals = vec![item.interval];
    for _ in 0..4 {
        let update = calculate_next_review(&item, Quality::new(5).unwrap(), item.next_review_date);
        item.apply(update);
        intervals.push(item.interval);
    }
    assert_eq!(intervals, vec![1, 3, 7, 14, 30]);

    let lapse = calculate_next_review(&item, Quality::new(1).unwrap(), item.next_review_date);
    assert_eq!(lapse.repetitions, 0);
    assert_eq!(lapse.interval, 1);
    assert!(lapse.ease_factor >= 1.3);
}
