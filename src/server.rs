//! Read-only HTTP API over the saved daily documents.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::source::{fivechan, fourchan};
use crate::storage::MarkdownStore;

/// API source name, document category, display name.
const SOURCES: &[(&str, &str, &str)] = &[
    ("4chan", fourchan::CATEGORY, "4chan"),
    ("5chan", fivechan::CATEGORY, "5ch"),
];

#[derive(Clone)]
struct AppState {
    store: Arc<MarkdownStore>,
}

#[derive(Debug, Deserialize)]
struct ContentQuery {
    date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub title: String,
    pub content: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResponse {
    pub items: Vec<ContentItem>,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            Self::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            Self::Internal(err) => {
                tracing::error!(err = %format!("{err:#}"), "content request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned())
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

pub fn router(store: MarkdownStore) -> Router {
    let state = AppState {
        store: Arc::new(store),
    };
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/content/:source", get(get_content))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, store: MarkdownStore) -> anyhow::Result<()> {
    let app = router(store);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {addr}: {err}"))?;
    tracing::info!(addr = %addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

async fn get_content(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(query): Query<ContentQuery>,
) -> Result<Json<ContentResponse>, ApiError> {
    let selected: Vec<&(&str, &str, &str)> = if source == "all" {
        SOURCES.iter().collect()
    } else {
        let found: Vec<_> = SOURCES.iter().filter(|(name, _, _)| *name == source).collect();
        if found.is_empty() {
            return Err(ApiError::NotFound(format!("source '{source}' not found")));
        }
        found
    };

    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("invalid date format: {raw}")))?,
        None => chrono::Local::now().date_naive(),
    };

    let items = load_items(&state.store, &selected, date).await?;
    if !items.is_empty() {
        return Ok(Json(ContentResponse { items }));
    }

    let mut latest: Option<NaiveDate> = None;
    for (_, category, _) in &selected {
        if let Some(last) = state.store.list_dates(category).await?.last().copied() {
            latest = latest.max(Some(last));
        }
    }
    let Some(latest) = latest else {
        return Err(ApiError::NotFound(
            "no content available; run the explorers first".to_owned(),
        ));
    };
    tracing::debug!(requested = %date, latest = %latest, "falling back to latest available date");

    let items = load_items(&state.store, &selected, latest).await?;
    Ok(Json(ContentResponse { items }))
}

async fn load_items(
    store: &MarkdownStore,
    selected: &[&(&str, &str, &str)],
    date: NaiveDate,
) -> anyhow::Result<Vec<ContentItem>> {
    let mut items = Vec::new();
    for (name, category, display) in selected {
        if let Some(content) = store.load(category, date).await? {
            items.push(ContentItem {
                title: format!("{display} - {}", date.format("%Y-%m-%d")),
                content,
                source: (*name).to_owned(),
            });
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt as _;

    use super::*;

    async fn get(app: Router, uri: &str) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.starts_with(b"{") {
            serde_json::from_slice(&bytes)?
        } else {
            serde_json::Value::Null
        };
        Ok((status, value))
    }

    async fn seeded_store() -> anyhow::Result<(tempfile::TempDir, MarkdownStore)> {
        let temp = tempfile::tempdir()?;
        let store = MarkdownStore::new(temp.path());
        let day1 = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        store.save("# four day1", fourchan::CATEGORY, day1).await?;
        store.save("# four day2", fourchan::CATEGORY, day2).await?;
        store.save("# five day1", fivechan::CATEGORY, day1).await?;
        Ok((temp, store))
    }

    #[tokio::test]
    async fn returns_document_for_date() -> anyhow::Result<()> {
        let (_temp, store) = seeded_store().await?;
        let (status, body) = get(router(store), "/api/content/4chan?date=2025-03-01").await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({ "items": [
                { "title": "4chan - 2025-03-01", "content": "# four day1", "source": "4chan" }
            ]})
        );
        Ok(())
    }

    #[tokio::test]
    async fn all_collects_every_source() -> anyhow::Result<()> {
        let (_temp, store) = seeded_store().await?;
        let (status, body) = get(router(store), "/api/content/all?date=2025-03-01").await?;

        assert_eq!(status, StatusCode::OK);
        let sources: Vec<&str> = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["source"].as_str().unwrap())
            .collect();
        assert_eq!(sources, vec!["4chan", "5chan"]);
        Ok(())
    }

    #[tokio::test]
    async fn missing_date_falls_back_to_latest() -> anyhow::Result<()> {
        let (_temp, store) = seeded_store().await?;
        let (status, body) = get(router(store), "/api/content/5chan?date=2030-01-01").await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["title"], "5ch - 2025-03-01");
        Ok(())
    }

    #[tokio::test]
    async fn errors_map_to_status_codes() -> anyhow::Result<()> {
        let (_temp, store) = seeded_store().await?;
        let app = router(store);

        let (status, _) = get(app.clone(), "/api/content/4chan?date=03-01-2025").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get(app, "/api/content/reddit").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let empty = tempfile::tempdir()?;
        let (status, body) = get(
            router(MarkdownStore::new(empty.path())),
            "/api/content/all?date=2025-03-01",
        )
        .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("no content"));
        Ok(())
    }

    #[tokio::test]
    async fn healthz_is_ok() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let response = router(MarkdownStore::new(temp.path()))
            .oneshot(Request::builder().uri("/healthz").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }
}
