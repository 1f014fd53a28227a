//! The sample application's pipeline: a home view and a small widget API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

const INDEX_VIEW: &str = include_str!("../../assets/views/index.html");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Widget {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewWidget {
    pub name: String,
}

/// In-memory widget storage.
#[derive(Clone, Default)]
pub struct WidgetStore {
    widgets: Arc<DashMap<u64, Widget>>,
    next_id: Arc<AtomicU64>,
}

impl WidgetStore {
    pub fn create(&self, name: String) -> Widget {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let widget = Widget { id, name };
        self.widgets.insert(id, widget.clone());
        widget
    }

    pub fn get(&self, id: u64) -> Option<Widget> {
        self.widgets.get(&id).map(|w| w.clone())
    }

    pub fn list(&self) -> Vec<Widget> {
        let mut all: Vec<Widget> = self.widgets.iter().map(|w| w.value().clone()).collect();
        all.sort_by_key(|w| w.id);
        all
    }

    pub fn remove(&self, id: u64) -> bool {
        self.widgets.remove(&id).is_some()
    }
}

/// Routes served behind the host's static and realtime handlers.
pub fn router(store: WidgetStore) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/home/index", get(home))
        .route("/api/widgets", get(list_widgets).post(create_widget))
        .route("/api/widgets/{id}", get(get_widget).delete(delete_widget))
        .with_state(store)
        .layer(TraceLayer::new_for_http())
}

async fn home() -> Html<String> {
    Html(INDEX_VIEW.replace("{{name}}", "Home"))
}

async fn list_widgets(State(store): State<WidgetStore>) -> Json<Vec<Widget>> {
    Json(store.list())
}

async fn create_widget(State(store): State<WidgetStore>, Json(new): Json<NewWidget>) -> impl IntoResponse {
    if new.name.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Widget name must not be empty").into_response();
    }
    let widget = store.create(new.name);
    tracing::info!(widget_id = widget.id, "Widget created");
    (StatusCode::CREATED, Json(widget)).into_response()
}

async fn get_widget(State(store): State<WidgetStore>, Path(id): Path<u64>) -> impl IntoResponse {
    match store.get(id) {
        Some(widget) => Json(widget).into_response(),
        None => (StatusCode::NOT_FOUND, format!("No widget {}", id)).into_response(),
    }
}

async fn delete_widget(State(store): State<WidgetStore>, Path(id): Path<u64>) -> StatusCode {
    if store.remove(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
