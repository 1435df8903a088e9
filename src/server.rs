use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use log::{debug, warn};
use pokesuri_events::{
    CalendarController, EventCategory, EventSet, PageConfig, VisibilityFilter,
};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::{
    preview::fetch_preview_image,
    worker::{CacheWorker, FetchRequest, Network},
};

pub struct AppState {
    pub events: Arc<EventSet>,
    pub page: PageConfig,
    /// Absent when the site is read from a local directory.
    pub origin: Option<Url>,
    pub worker: Option<Arc<CacheWorker>>,
    pub network: Arc<dyn Network>,
    pub client: Client,
    pub preview_timeout: Duration,
}

type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/events", get(handle_events))
        .route("/api/events/:id", get(handle_event))
        .route("/api/calendar", get(handle_calendar))
        .route("/api/visibility", get(handle_visibility))
        .route("/api/preview", get(handle_preview))
        .route("/calendar.ics", get(handle_ics))
        .fallback(handle_site)
        .with_state(state)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn controller(state: &AppState) -> CalendarController {
    CalendarController::new(Arc::clone(&state.events), state.page.clone(), today())
}

fn bad_request(message: impl ToString) -> Response {
    (StatusCode::BAD_REQUEST, message.to_string()).into_response()
}

#[derive(Deserialize)]
struct EventsQuery {
    category: Option<String>,
    q: Option<String>,
}

async fn handle_events(State(state): State<SharedState>, Query(query): Query<EventsQuery>) -> Response {
    let category = match query.category.as_deref().map(str::parse::<EventCategory>) {
        Some(Ok(category)) => category,
        Some(Err(err)) => return bad_request(err),
        None => EventCategory::All,
    };

    let mut controller = controller(&state);
    controller.set_category(category);
    controller.set_search(query.q.unwrap_or_default());

    Json(controller.event_list(today())).into_response()
}

async fn handle_event(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    match controller(&state).open_detail(&id, None) {
        Some(view) => Json(view).into_response(),
        None => (StatusCode::NOT_FOUND, format!("no event `{id}`")).into_response(),
    }
}

async fn handle_calendar(State(state): State<SharedState>) -> Response {
    Json(controller(&state).widget_options()).into_response()
}

#[derive(Deserialize)]
struct VisibilityQuery {
    filter: Option<String>,
}

async fn handle_visibility(
    State(state): State<SharedState>,
    Query(query): Query<VisibilityQuery>,
) -> Response {
    let filter = match query.filter.as_deref().map(str::parse::<VisibilityFilter>) {
        Some(Ok(filter)) => filter,
        Some(Err(err)) => return bad_request(err),
        None => VisibilityFilter::All,
    };

    Json(controller(&state).apply_visibility_filter(filter)).into_response()
}

#[derive(Deserialize)]
struct PreviewQuery {
    url: String,
}

#[derive(Serialize)]
struct Preview {
    image: Option<String>,
}

async fn handle_preview(
    State(state): State<SharedState>,
    Query(query): Query<PreviewQuery>,
) -> Response {
    // Only links the calendar itself shows are looked up.
    if !state.events.knows_link(&query.url) {
        return (StatusCode::NOT_FOUND, "unknown link").into_response();
    }

    let Ok(url) = Url::parse(&query.url) else {
        return bad_request("invalid `url` query parameter");
    };

    let image = fetch_preview_image(&state.client, &url, state.preview_timeout).await;
    Json(Preview { image }).into_response()
}

async fn handle_ics(State(state): State<SharedState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/calendar; charset=utf-8")],
        state.events.to_ics(env!("CARGO_PKG_NAME")).to_string(),
    )
        .into_response()
}

/// Everything else is the static site, answered by the cache worker or
/// passed straight through to the origin.
async fn handle_site(State(state): State<SharedState>, request: Request) -> Response {
    let Some(origin) = &state.origin else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let (parts, _) = request.into_parts();

    // Any authority in the target (absolute-form, HTTP/2) names this server,
    // so only the path is kept and requests never leave the origin.
    let path = parts
        .uri
        .path_and_query()
        .map_or("/", |path_and_query| path_and_query.as_str());

    let Ok(url) = origin.join(path) else {
        return bad_request("invalid request target");
    };

    if url.origin() != origin.origin() {
        return bad_request("invalid request target");
    }

    let request = FetchRequest {
        mode: FetchRequest::mode_of(&parts.method, &parts.headers),
        method: parts.method,
        url,
        headers: parts.headers,
    };

    if let Some(worker) = &state.worker {
        if let Some(response) = worker.fetch(request.clone()).await {
            return response.into_response();
        }
    }

    debug!("Passing {} {} through", request.method, request.url);
    match state.network.fetch(&request).await {
        Ok(response) => response.into_response(),
        Err(err) => {
            warn!("{err}");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}
