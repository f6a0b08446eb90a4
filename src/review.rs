// SM-2 style review interval engine.
//
// A fixed early schedule of 1, 3, 7, 14, 30 days, then growth by the ease
// factor once five consecutive passes are on record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const INITIAL_EASE: f64 = 2.5;
pub const MIN_EASE: f64 = 1.3;
pub const PASSING_QUALITY: u8 = 3;

const EARLY_INTERVALS: [u32; 5] = [1, 3, 7, 14, 30];
/// Longest gap between reviews, roughly a century.
pub const MAX_INTERVAL: u32 = 36_500;

/// A learner's self-assessed recall, 1 (blackout) through 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub fn new(n: u8) -> Result<Quality> {
        if (1..=5).contains(&n) {
            Ok(Quality(n))
        } else {
            Err(Error::InvalidQuality(n))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= PASSING_QUALITY
    }
}

impl TryFrom<u8> for Quality {
    type Error = Error;

    fn try_from(n: u8) -> Result<Quality> {
        Quality::new(n)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> u8 {
        q.0
    }
}

/// One exercise under spaced repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub exercise_id: String,
    pub track_id: String,
    pub next_review_date: NaiveDate,
    pub interval: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
}

impl ReviewItem {
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review_date <= today
    }

    pub fn apply(&mut self, update: ReviewUpdate) {
        self.next_review_date = update.next_review_date;
        self.interval = update.interval;
        self.ease_factor = update.ease_factor;
        self.repetitions = update.repetitions;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewUpdate {
    pub next_review_date: NaiveDate,
    pub interval: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
}

fn next_ease(ease: f64, quality: Quality) -> f64 {
    let miss = 5.0 - f64::from(quality.value());
    f64::max(MIN_EASE, ease + (0.1 - miss * (0.08 + miss * 0.02)))
}

/// Computes the next schedule for `item` after an answer of `quality` on `today`.
///
/// Past the early schedule the interval grows by the ease factor the item
/// carried into this review, and the ease factor is then adjusted. Intervals
/// are capped at [`MAX_INTERVAL`] and the due date saturates at `NaiveDate::MAX`.
pub fn calculate_next_review(item: &ReviewItem, quality: Quality, today: NaiveDate) -> ReviewUpdate {
    let (interval, repetitions) = if quality.is_pass() {
        let interval = match EARLY_INTERVALS.get(item.repetitions as usize) {
            Some(&days) => days,
            None => (f64::from(item.interval) * item.ease_factor).round() as u32,
        };
        (interval.min(MAX_INTERVAL), item.repetitions.saturating_add(1))
    } else {
        (1, 0)
    };
    let ease_factor = next_ease(item.ease_factor, quality);
    let next_review_date = today
        .checked_add_days(chrono::Days::new(u64::from(interval)))
        .unwrap_or(NaiveDate::MAX);

    tracing::debug!(
        exercise = %item.exercise_id,
        quality = quality.value(),
        old_interval = item.interval,
        interval,
        ease_factor,
        repetitions,
        "scheduled review"
    );

    ReviewUpdate {
        next_review_date,
        interval,
        ease_factor,
        repetitions,
    }
}

/// First review of an exercise; runs through the same path as every later one.
pub fn create_review_item(
    exercise_id: &str,
    track_id: &str,
    quality: Quality,
    today: NaiveDate,
) -> ReviewItem {
    let mut item = ReviewItem {
        exercise_id: exercise_id.to_string(),
        track_id: track_id.to_string(),
        next_review_date: today,
        interval: 0,
        ease_factor: INITIAL_EASE,
        repetitions: 0,
    };
    let update = calculate_next_review(&item, quality, today);
    item.apply(update);
    item
}
