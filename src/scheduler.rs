use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::catalog::{Catalog, Difficulty, Exercise};
use crate::progress::{self, track_difficulty};
use crate::review::ReviewItem;
use crate::rng::{date_seed, make_rng, shuffle};

pub const DAILY_COUNT: usize = 5;
/// Review and new items together fill this many slots before the stretch pick.
const CORE_COUNT: usize = 4;
const MAX_REVIEWS: usize = 2;
const SEED_SALT: &str = "-drills";

/// Why an exercise was picked for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Review,
    New,
    Stretch,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provenance::Review => "review",
            Provenance::New => "new",
            Provenance::Stretch => "stretch",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyExercise {
    pub exercise: Exercise,
    pub provenance: Provenance,
}

/// Seed for a day's selection, `YYYY-MM-DD` plus the drill salt.
pub fn daily_seed(date: NaiveDate) -> u32 {
    date_seed(&format!("{}{SEED_SALT}", date.format("%Y-%m-%d")))
}

struct Selection<'a> {
    picked: Vec<DailyExercise>,
    used: HashSet<&'a str>,
}

impl<'a> Selection<'a> {
    fn remaining(&self, target: usize) -> usize {
        target.saturating_sub(self.picked.len())
    }

    fn take(&mut self, pool: Vec<&'a Exercise>, count: usize, provenance: Provenance) -> usize {
        let mut taken = 0;
        for exercise in pool {
            if taken == count {
                break;
            }
            if self.used.insert(exercise.id.as_str()) {
                self.picked.push(DailyExercise {
                    exercise: exercise.clone(),
                    provenance,
                });
                taken += 1;
            }
        }
        taken
    }
}

/// Picks up to [`DAILY_COUNT`] exercises for `date`.
///
/// Phases run in order: due reviews (at most two), new material at or below
/// each track's tier up to four items, one stretch item from the next tier,
/// previously done exercises as review filler, then anything left. One RNG
/// seeded from the date drives every shuffle, so the same inputs on the same
/// day give the same list. An exercise id is never picked twice and a thin
/// catalog yields a shorter list.
pub fn daily_exercises(
    catalog: &Catalog,
    active_tracks: &[String],
    completed_drills: &BTreeSet<String>,
    reviews_due: &[ReviewItem],
    completed_lessons: &BTreeSet<String>,
    date: NaiveDate,
) -> Vec<DailyExercise> {
    let mut rng = make_rng(daily_seed(date));

    let active_tracks = if active_tracks.is_empty() {
        progress::default_tracks()
    } else {
        active_tracks.to_vec()
    };
    let is_active = |exercise: &Exercise| active_tracks.iter().any(|t| *t == exercise.track);

    let mut sel = Selection {
        picked: Vec::with_capacity(DAILY_COUNT),
        used: HashSet::new(),
    };

    // Reviews
    let review_pool: Vec<&Exercise> = reviews_due
        .iter()
        .filter_map(|r| catalog.get(&r.exercise_id))
        .filter(|e| is_active(*e))
        .collect();
    if review_pool.len() < reviews_due.len() {
        tracing::debug!(
            dropped = reviews_due.len() - review_pool.len(),
            "skipped reviews outside the catalog or active tracks"
        );
    }
    let taken = sel.take(shuffle(&review_pool, &mut rng), MAX_REVIEWS, Provenance::Review);
    tracing::debug!(candidates = review_pool.len(), taken, "review phase");

    // New material at or below the track's tier
    let tiers: HashMap<&str, Difficulty> = active_tracks
        .iter()
        .map(|t| (t.as_str(), track_difficulty(catalog, t, completed_lessons)))
        .collect();
    let tier_of = |exercise: &Exercise| tiers.get(exercise.track.as_str()).copied();

    let new_pool: Vec<&Exercise> = catalog
        .exercises()
        .iter()
        .filter(|e| !sel.used.contains(e.id.as_str()))
        .filter(|e| !completed_drills.contains(&e.id))
        .filter(|e| tier_of(*e).is_some_and(|tier| e.difficulty <= tier))
        .collect();
    let want = sel.remaining(CORE_COUNT);
    let taken = sel.take(shuffle(&new_pool, &mut rng), want, Provenance::New);
    tracing::debug!(candidates = new_pool.len(), taken, "new material phase");

    // One stretch item from the next tier up
    if sel.remaining(DAILY_COUNT) > 0 {
        let stretch_pool: Vec<&Exercise> = catalog
            .exercises()
            .iter()
            .filter(|e| !sel.used.contains(e.id.as_str()))
            .filter(|e| tier_of(*e).is_some_and(|tier| e.difficulty == tier.next()))
            .collect();
        let taken = sel.take(shuffle(&stretch_pool, &mut rng), 1, Provenance::Stretch);
        tracing::debug!(candidates = stretch_pool.len(), taken, "stretch phase");
    }

    // Filler: exercises already done, tagged as review
    if sel.remaining(DAILY_COUNT) > 0 {
        let seen_pool: Vec<&Exercise> = catalog
            .exercises()
            .iter()
            .filter(|e| !sel.used.contains(e.id.as_str()))
            .filter(|e| is_active(*e) && completed_drills.contains(&e.id))
            .collect();
        let want = sel.remaining(DAILY_COUNT);
        let taken = sel.take(shuffle(&seen_pool, &mut rng), want, Provenance::Review);
        tracing::debug!(candidates = seen_pool.len(), taken, "seen filler phase");
    }

    // Filler: anything left in the active tracks
    if sel.remaining(DAILY_COUNT) > 0 {
        let any_pool: Vec<&Exercise> = catalog
            .exercises()
            .iter()
            .filter(|e| !sel.used.contains(e.id.as_str()))
            .filter(|e| is_active(*e))
            .collect();
        let want = sel.remaining(DAILY_COUNT);
        let taken = sel.take(shuffle(&any_pool, &mut rng), want, Provenance::New);
        tracing::debug!(candidates = any_pool.len(), taken, "any filler phase");
    }

    tracing::debug!(%date, picked = sel.picked.len(), "daily exercises selected");
    sel.picked
}
