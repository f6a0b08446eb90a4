use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::catalog::{Catalog, Difficulty};
use crate::error::{self, Error};
use crate::progress::{Progress, track_difficulty};
use crate::review::{Quality, ReviewItem};
use crate::scheduler::{self, DailyExercise};

// -- App state --

pub struct ServerState {
    pub catalog: Catalog,
    pub progress: Progress,
    pub progress_path: PathBuf,
}

pub type SharedState = Arc<Mutex<ServerState>>;

// -- Errors --

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidQuality(_) | Error::InvalidDate(_) => StatusCode::BAD_REQUEST,
            Error::UnknownExercise(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// -- Handlers --

#[derive(Deserialize)]
pub struct DailyQuery {
    pub date: Option<String>,
}

pub async fn daily(
    State(state): State<SharedState>,
    Query(query): Query<DailyQuery>,
) -> ApiResult<Vec<DailyExercise>> {
    let date = request_date(query.date.as_deref())?;
    let st = state.lock().await;
    let active = st.progress.active_tracks(&st.catalog);
    let list = scheduler::daily_exercises(
        &st.catalog,
        &active,
        &st.progress.completed_drills,
        &st.progress.reviews_due(date),
        &st.progress.completed_lessons,
        date,
    );
    Ok(Json(list))
}

#[derive(Serialize)]
pub struct TrackStatus {
    pub id: String,
    pub difficulty: Difficulty,
}

pub async fn tracks(State(state): State<SharedState>) -> ApiResult<Vec<TrackStatus>> {
    let st = state.lock().await;
    let list = st
        .progress
        .active_tracks(&st.catalog)
        .into_iter()
        .map(|id| {
            let difficulty = track_difficulty(&st.catalog, &id, &st.progress.completed_lessons);
            TrackStatus { id, difficulty }
        })
        .collect();
    Ok(Json(list))
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub exercise_id: String,
    pub quality: u8,
    #[serde(default)]
    pub date: Option<String>,
}

fn request_date(date: Option<&str>) -> error::Result<NaiveDate> {
    match date {
        Some(s) => error::parse_date(s),
        None => Ok(today()),
    }
}

pub async fn review_submit(
    State(state): State<SharedState>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<ReviewItem> {
    let quality = Quality::new(req.quality)?;
    let date = request_date(req.date.as_deref())?;
    let mut guard = state.lock().await;
    let st = &mut *guard;
    let exercise = st
        .catalog
        .get(&req.exercise_id)
        .ok_or_else(|| Error::UnknownExercise(req.exercise_id.clone()))?;
    let item = st.progress.record_answer(exercise, quality, date).clone();
    st.progress.save(&st.progress_path)?;
    Ok(Json(item))
}

#[derive(Serialize)]
pub struct LessonStatus {
    pub lesson_id: String,
    pub newly_completed: bool,
}

pub async fn lesson_complete(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<LessonStatus> {
    let mut st = state.lock().await;
    let newly_completed = st.progress.complete_lesson(&id);
    if newly_completed {
        st.progress.save(&st.progress_path)?;
    }
    Ok(Json(LessonStatus {
        lesson_id: id,
        newly_completed,
    }))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/daily", get(daily))
        .route("/api/tracks", get(tracks))
        .route("/api/review", post(review_submit))
        .route("/api/lessons/{id}/complete", post(lesson_complete))
        .with_state(state)
}

// -- Public entry point --

pub async fn serve(catalog: Catalog, progress_path: PathBuf, port: u16) -> error::Result<()> {
    let progress = Progress::load(&progress_path)?;
    let state = Arc::new(Mutex::new(ServerState {
        catalog,
        progress,
        progress_path,
    }));

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(Error::Server)?;
    tracing::info!("serving at http://localhost:{port}");
    axum::serve(listener, router(state))
        .await
        .map_err(Error::Server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Exercise, Track};
    use crate::scheduler::Provenance;

    fn state(dir: &tempfile::TempDir) -> SharedState {
        let catalog = Catalog::new(
            vec![Track {
                id: "nextjs".into(),
                lessons: vec!["n1".into(), "n2".into()],
            }],
            vec![
                Exercise {
                    id: "nb1".into(),
                    track: "nextjs".into(),
                    difficulty: Difficulty::Beginner,
                    title: "Pages".into(),
                    prompt: String::new(),
                },
                Exercise {
                    id: "ni1".into(),
                    track: "nextjs".into(),
                    difficulty: Difficulty::Intermediate,
                    title: "Layouts".into(),
                    prompt: String::new(),
                },
            ],
        );
        Arc::new(Mutex::new(ServerState {
            catalog,
            progress: Progress::default(),
            progress_path: dir.path().join("progress.json"),
        }))
    }

    #[tokio::test]
    async fn daily_with_explicit_date() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(&dir);
        let query = DailyQuery {
            date: Some("2024-01-01".into()),
        };
        let Json(list) = daily(State(st), Query(query)).await.ok().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].exercise.id, "nb1");
        assert_eq!(list[0].provenance, Provenance::New);
        assert_eq!(list[1].provenance, Provenance::Stretch);
    }

    #[tokio::test]
    async fn daily_rejects_bad_date() {
        let dir = tempfile::tempdir().unwrap();
        let query = DailyQuery {
            date: Some("yesterday".into()),
        };
        let resp = daily(State(state(&dir)), Query(query))
            .await
            .err()
            .unwrap()
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn review_submit_saves_progress() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(&dir);
        let req = ReviewRequest {
            exercise_id: "nb1".into(),
            quality: 5,
            date: Some("2024-01-01".into()),
        };
        let Json(item) = review_submit(State(st.clone()), Json(req)).await.ok().unwrap();
        assert_eq!(item.interval, 1);
        assert_eq!(item.repetitions, 1);
        assert_eq!(item.next_review_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());

        let saved = Progress::load(&dir.path().join("progress.json")).unwrap();
        assert!(saved.completed_drills.contains("nb1"));
        assert_eq!(saved.reviews.len(), 1);
    }

    #[tokio::test]
    async fn review_submit_error_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(&dir);

        let bad_quality = ReviewRequest {
            exercise_id: "nb1".into(),
            quality: 0,
            date: None,
        };
        let resp = review_submit(State(st.clone()), Json(bad_quality))
            .await
            .err()
            .unwrap()
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let unknown = ReviewRequest {
            exercise_id: "ghost".into(),
            quality: 4,
            date: None,
        };
        let resp = review_submit(State(st.clone()), Json(unknown))
            .await
            .err()
            .unwrap()
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let bad_date = ReviewRequest {
            exercise_id: "nb1".into(),
            quality: 4,
            date: Some("tomorrow".into()),
        };
        let resp = review_submit(State(st), Json(bad_date))
            .await
            .err()
            .unwrap()
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn review_request_date_is_optional() {
        let req: ReviewRequest =
            serde_json::from_str(r#"{"exercise_id":"nb1","quality":3}"#).unwrap();
        assert!(req.date.is_none());
    }

    #[tokio::test]
    async fn graded_review_is_due_on_its_date() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(&dir);
        let req = ReviewRequest {
            exercise_id: "nb1".into(),
            quality: 4,
            date: Some("2024-03-10".into()),
        };
        review_submit(State(st.clone()), Json(req)).await.ok().unwrap();

        let query = DailyQuery {
            date: Some("2024-03-11".into()),
        };
        let Json(list) = daily(State(st), Query(query)).await.ok().unwrap();
        assert_eq!(list[0].exercise.id, "nb1");
        assert_eq!(list[0].provenance, Provenance::Review);
    }

    #[tokio::test]
    async fn lesson_complete_changes_tier() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(&dir);
        let Json(status) = lesson_complete(State(st.clone()), Path("n1".into()))
            .await
            .ok()
            .unwrap();
        assert!(status.newly_completed);

        let Json(list) = tracks(State(st.clone())).await.ok().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "nextjs");
        assert_eq!(list[0].difficulty, Difficulty::Intermediate);

        let Json(again) = lesson_complete(State(st), Path("n1".into()))
            .await
            .ok()
            .unwrap();
        assert!(!again.newly_completed);
    }
}
