//! Glue shared by the HTML handlers: page chrome and flash-then-redirect.

use axum::response::{Html, Redirect};
use tracing::warn;

use crate::error::AppError;
use crate::session::Session;
use crate::state::AppState;
use crate::views::{self, Nav};

pub const CSRF_FAILED: &str = "CSRF validation failed.";

/// Wraps `body` in the layout, consuming the pending flash messages.
pub async fn render(state: &AppState, session: &Session, title: &str, body: &str) -> Html<String> {
    let user_name = match session.user_id() {
        Some(id) => state.credentials.find_public(id).await.map(|u| u.name),
        None => None,
    };
    let logout_form = user_name
        .as_ref()
        .map(|_| views::post_button("/logout", "Log out", &state.csrf.hidden_input(session)));
    let nav = Nav {
        user_name,
        logout_form,
    };
    views::page(title, &nav, &session.take_flash(), body)
}

pub fn redirect_ok(session: &Session, to: &str, message: impl Into<String>) -> Redirect {
    session.flash_success(message);
    Redirect::to(to)
}

pub fn redirect_err(session: &Session, to: &str, err: impl Into<AppError>) -> Redirect {
    let err = err.into();
    if matches!(err, AppError::Auth(_)) {
        warn!(error = %err, "request not authorized");
    }
    session.flash_error(err.flash_message());
    Redirect::to(to)
}

pub fn redirect_csrf(session: &Session, to: &str) -> Redirect {
    warn!("csrf validation failed");
    session.flash_error(CSRF_FAILED);
    Redirect::to(to)
}

/// Where an authorization failure sends the user.
pub fn auth_target(err: &AppError, fallback: &'static str) -> &'static str {
    match err {
        AppError::Auth(crate::error::AuthError::Unauthenticated) => "/login",
        _ => fallback,
    }
}
