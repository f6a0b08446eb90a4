use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tracks handed to the scheduler when a learner has no activity yet.
pub const DEFAULT_TRACKS: [&str; 2] = ["nextjs", "nodejs"];

pub const TRACKS_FILE: &str = "tracks.csv";
pub const EXERCISES_FILE: &str = "exercises.csv";

/// Difficulty tier, ordered `Beginner < Intermediate < Advanced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// One tier up, capped at `Advanced`.
    pub fn next(self) -> Difficulty {
        match self {
            Difficulty::Beginner => Difficulty::Intermediate,
            Difficulty::Intermediate | Difficulty::Advanced => Difficulty::Advanced,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub track: String,
    pub difficulty: Difficulty,
    pub title: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub lessons: Vec<String>,
}

/// Read-only exercise and track catalog.
///
/// Exercises and tracks keep the order they were supplied in; that order is
/// what "catalog order" means for track detection and candidate pools.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
    exercises: Vec<Exercise>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog. Later exercises reusing an earlier id are dropped.
    pub fn new(tracks: Vec<Track>, exercises: Vec<Exercise>) -> Self {
        let mut index = HashMap::new();
        let mut kept = Vec::with_capacity(exercises.len());
        for exercise in exercises {
            if index.contains_key(&exercise.id) {
                tracing::warn!(id = %exercise.id, "duplicate exercise id, skipping");
                continue;
            }
            index.insert(exercise.id.clone(), kept.len());
            kept.push(exercise);
        }
        Catalog {
            tracks,
            exercises: kept,
            index,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.index.get(id).map(|&i| &self.exercises[i])
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Loads `tracks.csv` and `exercises.csv` from a catalog directory.
    pub fn load_dir(dir: &Path) -> Result<Catalog> {
        let tracks = load_tracks(&dir.join(TRACKS_FILE))?;
        let exercises = load_exercises(&dir.join(EXERCISES_FILE))?;
        tracing::info!(
            tracks = tracks.len(),
            exercises = exercises.len(),
            dir = %dir.display(),
            "loaded catalog"
        );
        Ok(Catalog::new(tracks, exercises))
    }
}

fn get_field(record: &csv::StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").trim().to_string()
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    let file = std::fs::File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new().flexible(true).from_reader(file))
}

fn csv_error(path: &Path, source: csv::Error) -> Error {
    Error::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

/// Reads `track,lesson` rows. Tracks keep first-appearance order and lessons
/// keep file order within their track.
pub fn load_tracks(path: &Path) -> Result<Vec<Track>> {
    let mut reader = open_reader(path)?;
    let mut tracks: Vec<Track> = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let track = get_field(&record, 0);
        let lesson = get_field(&record, 1);
        if track.is_empty() || lesson.is_empty() {
            return Err(Error::Catalog {
                path: PathBuf::from(path),
                line: record_line(&record),
                message: "track and lesson are required".to_string(),
            });
        }
        match tracks.iter_mut().find(|t| t.id == track) {
            Some(t) => t.lessons.push(lesson),
            None => tracks.push(Track {
                id: track,
                lessons: vec![lesson],
            }),
        }
    }
    Ok(tracks)
}

/// Reads `id,track,difficulty,title,prompt` rows.
pub fn load_exercises(path: &Path) -> Result<Vec<Exercise>> {
    let mut reader = open_reader(path)?;
    let mut exercises = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let line = record_line(&record);
        let catalog_error = |message: String| Error::Catalog {
            path: PathBuf::from(path),
            line,
            message,
        };

        let id = get_field(&record, 0);
        let track = get_field(&record, 1);
        if id.is_empty() || track.is_empty() {
            return Err(catalog_error("id and track are required".to_string()));
        }
        let difficulty = get_field(&record, 2)
            .parse::<Difficulty>()
            .map_err(catalog_error)?;

        exercises.push(Exercise {
            id,
            track,
            difficulty,
            title: get_field(&record, 3),
            prompt: expand_newlines(&get_field(&record, 4)),
        });
    }
    Ok(exercises)
}

pub fn expand_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}
