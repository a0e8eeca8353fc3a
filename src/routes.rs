use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Local, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::article::{Article, Category, FeedResult};
use crate::clock::format_published;
use crate::desk::NewsDesk;
use crate::error::{CategoryError, FetchError};

pub struct AppState {
    pub desk: NewsDesk,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub id: Category,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    pub published_label: String,
}

impl From<&Article> for ArticleView {
    fn from(article: &Article) -> Self {
        Self {
            published_label: format_published(&article.published_at.with_timezone(&Local)),
            article: article.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub category: Category,
    pub label: String,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
    pub important: Vec<ArticleView>,
    pub latest: Vec<ArticleView>,
    pub popular: Vec<ArticleView>,
}

impl FeedResponse {
    fn build(desk: &NewsDesk, feed: &FeedResult) -> Self {
        let buckets = desk.partition(feed);
        let views = |articles: &[Article]| -> Vec<ArticleView> {
            articles.iter().map(ArticleView::from).collect()
        };

        Self {
            category: feed.category,
            label: feed.category.label(),
            fetched_at: feed.fetched_at,
            stale: feed.stale,
            important: views(buckets.important),
            latest: views(buckets.latest),
            popular: views(buckets.popular),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PreferenceBody {
    pub dark_mode: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// Custom error type
#[derive(Debug)]
pub enum AppError {
    Category(CategoryError),
    Fetch(FetchError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Category(err) => (StatusCode::NOT_FOUND, err.to_string()),
            AppError::Fetch(err) => (
                StatusCode::BAD_GATEWAY,
                format!("Could not load headlines: {}", err),
            ),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<CategoryError> for AppError {
    fn from(err: CategoryError) -> Self {
        AppError::Category(err)
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::Fetch(err)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/categories", get(categories))
        .route("/api/feed/:category", get(feed))
        .route("/api/feed/:category/invalidate", post(invalidate))
        .route("/api/preference", get(get_preference).put(put_preference))
        .route("/api/preference/toggle", post(toggle_preference))
        .route("/api/clock", get(clock))
        .with_state(state)
}

// Route handlers
pub async fn health() -> impl IntoResponse {
    "OK"
}

pub async fn categories() -> Json<Vec<CategoryInfo>> {
    Json(
        Category::ALL
            .into_iter()
            .map(|id| CategoryInfo {
                id,
                label: id.label(),
            })
            .collect(),
    )
}

pub async fn feed(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<Json<FeedResponse>, AppError> {
    let category: Category = category.parse()?;
    let feed = state.desk.get_feed(category).await?;

    if feed.stale {
        warn!("Serving stale '{}' feed from {}", category, feed.fetched_at);
    }

    Ok(Json(FeedResponse::build(&state.desk, &feed)))
}

pub async fn invalidate(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<StatusCode, AppError> {
    let category: Category = category.parse()?;
    state.desk.invalidate(category);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_preference(State(state): State<Arc<AppState>>) -> Json<PreferenceBody> {
    Json(PreferenceBody {
        dark_mode: state.desk.preference().await,
    })
}

pub async fn put_preference(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PreferenceBody>,
) -> Json<PreferenceBody> {
    state.desk.set_preference(body.dark_mode).await;
    Json(body)
}

pub async fn toggle_preference(State(state): State<Arc<AppState>>) -> Json<PreferenceBody> {
    Json(PreferenceBody {
        dark_mode: state.desk.toggle_preference().await,
    })
}

pub async fn clock(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = state.desk.clock_stream().map(|tick| {
        Ok(Event::default()
            .event("tick")
            .id(tick.at.timestamp().to_string())
            .data(tick.formatted))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
