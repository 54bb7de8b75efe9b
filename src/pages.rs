//! Static pages and the health check.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{debug, instrument};

use crate::{session::Session, state::AppState, web::render};

const HOME: &str = "<section class=\"hero\">\n<h1>Fitness Studio</h1>\n\
<p>Train with our coaches, follow the weekly schedule and cook from the studio recipe book.</p>\n\
<p><a class=\"main-button\" href=\"/workouts\">See workouts</a> \
<a class=\"main-button\" href=\"/recipes\">Browse recipes</a></p>\n</section>\n";

const SCHEDULE: &str = "<h1>Schedule</h1>\n<table>\n\
<tr><th>Day</th><th>Class</th><th>Time</th></tr>\n\
<tr><td>Monday</td><td>Cardio</td><td>07:00 - 08:00</td></tr>\n\
<tr><td>Tuesday</td><td>Strength</td><td>18:00 - 19:00</td></tr>\n\
<tr><td>Wednesday</td><td>Yoga</td><td>19:00 - 20:00</td></tr>\n\
<tr><td>Thursday</td><td>HIIT</td><td>18:00 - 18:45</td></tr>\n\
<tr><td>Saturday</td><td>Open gym</td><td>10:00 - 14:00</td></tr>\n</table>\n";

const ABOUT: &str = "<h1>About us</h1>\n\
<p>A neighbourhood studio where certified coaches plan every session and share \
the recipes they cook between workouts.</p>\n";

const CONTACT: &str = "<h1>Contact</h1>\n\
<p>Drop by the front desk during opening hours or write to the studio office.</p>\n";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/pages/:page", get(show))
        .route("/health", get(health))
}

#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> Response {
    render(&state, &session, "Home", HOME).await.into_response()
}

/// Only the known pages render; anything else is a 404.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(page): Path<String>,
) -> Response {
    let (title, body) = match page.as_str() {
        "schedule" => ("Schedule", SCHEDULE),
        "about" => ("About", ABOUT),
        "contact" => ("Contact", CONTACT),
        _ => {
            debug!("unknown page requested");
            let html = render(&state, &session, "Not found", "<h1>Page not found</h1>\n").await;
            return (StatusCode::NOT_FOUND, html).into_response();
        }
    };
    render(&state, &session, title, body).await.into_response()
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, body::Body, http::Request};
    use tower::ServiceExt;

    async fn get(uri: &str) -> (StatusCode, String) {
        let app = crate::app::build_app(AppState::fake());
        let res = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn known_pages_render() {
        for page in ["/", "/pages/schedule", "/pages/about", "/pages/contact"] {
            let (status, html) = get(page).await;
            assert_eq!(status, StatusCode::OK, "{page}");
            assert!(html.contains("<nav>"));
        }
    }

    #[tokio::test]
    async fn unknown_page_is_404() {
        let (status, html) = get("/pages/..%2Fsecrets").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(html.contains("Page not found"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }
}
