use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, DEFAULT_TRACKS, Difficulty, Exercise};
use crate::error::{Error, Result};
use crate::review::{self, Quality, ReviewItem};

const ADVANCED_THRESHOLD: f64 = 0.67;
const INTERMEDIATE_THRESHOLD: f64 = 0.34;

/// Tracks with at least one completed lesson, in catalog order. A learner with
/// no activity gets [`DEFAULT_TRACKS`].
pub fn detect_active_tracks(catalog: &Catalog, completed_lessons: &BTreeSet<String>) -> Vec<String> {
    let active: Vec<String> = catalog
        .tracks()
        .iter()
        .filter(|t| t.lessons.iter().any(|l| completed_lessons.contains(l)))
        .map(|t| t.id.clone())
        .collect();
    if active.is_empty() {
        default_tracks()
    } else {
        active
    }
}

pub fn default_tracks() -> Vec<String> {
    DEFAULT_TRACKS.iter().map(|t| t.to_string()).collect()
}

/// Tier from the share of a track's lessons completed. Unknown or empty
/// tracks are `Beginner`.
pub fn track_difficulty(
    catalog: &Catalog,
    track_id: &str,
    completed_lessons: &BTreeSet<String>,
) -> Difficulty {
    let Some(track) = catalog.track(track_id) else {
        return Difficulty::Beginner;
    };
    if track.lessons.is_empty() {
        return Difficulty::Beginner;
    }
    let done = track
        .lessons
        .iter()
        .filter(|l| completed_lessons.contains(*l))
        .count();
    let pct = done as f64 / track.lessons.len() as f64;
    if pct >= ADVANCED_THRESHOLD {
        Difficulty::Advanced
    } else if pct >= INTERMEDIATE_THRESHOLD {
        Difficulty::Intermediate
    } else {
        Difficulty::Beginner
    }
}

/// A learner's progress record as stored in the progress file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub completed_lessons: BTreeSet<String>,
    #[serde(default)]
    pub completed_drills: BTreeSet<String>,
    #[serde(default)]
    pub reviews: Vec<ReviewItem>,
}

impl Progress {
    /// Loads a progress file. A missing file is a new learner.
    pub fn load(path: &Path) -> Result<Progress> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no progress file, starting fresh");
                return Ok(Progress::default());
            }
            Err(source) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&data).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, data).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn active_tracks(&self, catalog: &Catalog) -> Vec<String> {
        detect_active_tracks(catalog, &self.completed_lessons)
    }

    pub fn reviews_due(&self, today: NaiveDate) -> Vec<ReviewItem> {
        self.reviews
            .iter()
            .filter(|r| r.is_due(today))
            .cloned()
            .collect()
    }

    pub fn review_for(&self, exercise_id: &str) -> Option<&ReviewItem> {
        self.reviews.iter().find(|r| r.exercise_id == exercise_id)
    }

    /// Records an answer: updates the exercise's review item (creating it on
    /// first answer) and marks the exercise as done.
    pub fn record_answer(
        &mut self,
        exercise: &Exercise,
        quality: Quality,
        today: NaiveDate,
    ) -> &ReviewItem {
        self.completed_drills.insert(exercise.id.clone());

        let index = match self
            .reviews
            .iter()
            .position(|r| r.exercise_id == exercise.id)
        {
            Some(i) => {
                let update = review::calculate_next_review(&self.reviews[i], quality, today);
                self.reviews[i].apply(update);
                i
            }
            None => {
                self.reviews.push(review::create_review_item(
                    &exercise.id,
                    &exercise.track,
                    quality,
                    today,
                ));
                self.reviews.len() - 1
            }
        };
        &self.reviews[index]
    }

    /// Returns false if the lesson was already complete.
    pub fn complete_lesson(&mut self, lesson_id: &str) -> bool {
        self.completed_lessons.insert(lesson_id.to_string())
    }
}
