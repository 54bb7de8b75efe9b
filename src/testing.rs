//! Helpers for driving the router in tests.

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::AppState;

/// Creates a session, optionally logged in, and returns its id with a live token.
pub fn session_with_token(state: &AppState, user: Option<Uuid>) -> (String, String) {
    let id = state.sessions.create();
    let token = state
        .sessions
        .update(&id, |data| {
            data.user_id = user;
            state.csrf.issue_at(data, OffsetDateTime::now_utc())
        })
        .unwrap();
    (id, token)
}

/// The session id a response sets, if it sets one.
pub fn session_cookie_id(res: &Response) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|c| c.strip_prefix("fitness_session="))
        .and_then(|c| c.split(';').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// A url-encoded POST carrying the `fitness_session` cookie.
pub fn form_request(uri: &str, session_id: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, format!("fitness_session={session_id}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str, session_id: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, format!("fitness_session={session_id}"))
        .body(Body::empty())
        .unwrap()
}
