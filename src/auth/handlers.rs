use axum::{
    extract::State,
    http::Method,
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::dto::{LoginForm, RegisterForm, TokenOnlyForm},
    session::Session,
    state::AppState,
    views,
    web::{redirect_csrf, redirect_err, redirect_ok, render},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
}

#[instrument(skip(state, session))]
pub async fn register_page(State(state): State<AppState>, session: Session) -> Html<String> {
    let csrf_input = state.csrf.hidden_input(&session);
    let body = format!(
        "<h2>Register</h2>\n<form method=\"POST\" action=\"/register\">\n{csrf_input}\n{}{}{}\
         <button type=\"submit\">Register</button>\n</form>\n\
         <p>Already have an account? <a href=\"/login\">Log in</a></p>\n",
        views::text_input("name", "Name", "", "required"),
        views::text_input("email", "Email", "", "required"),
        password_input(),
    );
    render(&state, &session, "Register", &body).await
}

#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    method: Method,
    Form(form): Form<RegisterForm>,
) -> Redirect {
    if !state
        .csrf
        .validate_request(&session, &method, form.csrf_token.as_deref())
    {
        return redirect_csrf(&session, "/register");
    }
    match state
        .credentials
        .create_user(&form.name, &form.email, &form.password)
        .await
    {
        Ok(registered) => redirect_ok(&session, "/login", registered.message),
        Err(e) => redirect_err(&session, "/register", e),
    }
}

#[instrument(skip(state, session))]
pub async fn login_page(State(state): State<AppState>, session: Session) -> Html<String> {
    let csrf_input = state.csrf.hidden_input(&session);
    let body = format!(
        "<h2>Log in</h2>\n<form method=\"POST\" action=\"/login\">\n{csrf_input}\n{}{}\
         <button type=\"submit\">Log in</button>\n</form>\n\
         <p>No account yet? <a href=\"/register\">Register</a></p>\n",
        views::text_input("email", "Email", "", "required"),
        password_input(),
    );
    render(&state, &session, "Log in", &body).await
}

#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    method: Method,
    Form(form): Form<LoginForm>,
) -> Redirect {
    if !state
        .csrf
        .validate_request(&session, &method, form.csrf_token.as_deref())
    {
        return redirect_csrf(&session, "/login");
    }
    match state.credentials.verify_login(&form.email, &form.password).await {
        Ok(user) => {
            session.log_in(user.id);
            redirect_ok(&session, "/", format!("Welcome back, {}!", user.name))
        }
        Err(e) => redirect_err(&session, "/login", e),
    }
}

#[instrument(skip(state, session, form))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    method: Method,
    Form(form): Form<TokenOnlyForm>,
) -> Redirect {
    if !state
        .csrf
        .validate_request(&session, &method, form.csrf_token.as_deref())
    {
        return redirect_csrf(&session, "/");
    }
    if let Some(user_id) = session.user_id() {
        info!(%user_id, "user logged out");
    }
    session.log_out();
    redirect_ok(&session, "/login", "You have been logged out.")
}

fn password_input() -> &'static str {
    "<label for=\"password\">Password</label>\n\
     <input type=\"password\" id=\"password\" name=\"password\" minlength=\"8\" required>\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::to_bytes,
        http::{header, StatusCode},
    };
    use tower::ServiceExt;

    use crate::auth::repo::MemoryUserStore;
    use crate::error::AuthError;
    use crate::testing::{form_request, get_request, session_cookie_id, session_with_token};

    fn fresh_token(state: &AppState, sid: &str) -> String {
        state
            .sessions
            .update(sid, |d| state.csrf.issue_at(d, time::OffsetDateTime::now_utc()))
            .unwrap()
    }

    fn flash(state: &AppState, sid: &str) -> (Option<String>, Option<String>) {
        state
            .sessions
            .get(sid, |s| (s.success_message.clone(), s.error_message.clone()))
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn register_then_login_then_logout() {
        let users = Arc::new(MemoryUserStore::new());
        let state = AppState::fake_with_users(users.clone());
        let app = crate::app::build_app(state.clone());

        let (sid, token) = session_with_token(&state, None);
        let res = app
            .clone()
            .oneshot(form_request(
                "/register",
                &sid,
                &format!("csrf_token={token}&name=Dana&email=Dana%40Example.com&password=longenough"),
            ))
            .await
            .unwrap();
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/login");
        assert_eq!(users.len(), 1);
        assert_eq!(
            flash(&state, &sid).0.as_deref(),
            Some("Registration successful! Welcome, Dana.")
        );

        let token = fresh_token(&state, &sid);
        let res = app
            .clone()
            .oneshot(form_request(
                "/login",
                &sid,
                &format!("csrf_token={token}&email=dana%40example.com&password=longenough"),
            ))
            .await
            .unwrap();
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/");
        let logged_in = session_cookie_id(&res).unwrap();
        assert_ne!(logged_in, sid);
        assert!(!state.sessions.contains(&sid));
        assert!(state.sessions.get(&logged_in, |d| d.user_id).flatten().is_some());

        let res = app
            .clone()
            .oneshot(get_request("/", &logged_in))
            .await
            .unwrap();
        let html = String::from_utf8(to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec())
            .unwrap();
        assert!(html.contains("Welcome back, Dana!"));
        assert!(html.contains("action=\"/logout\""));

        let token = fresh_token(&state, &logged_in);
        let res = app
            .oneshot(form_request("/logout", &logged_in, &format!("csrf_token={token}")))
            .await
            .unwrap();
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/login");
        assert!(!state.sessions.contains(&logged_in));
        let anonymous = session_cookie_id(&res).unwrap();
        assert_ne!(anonymous, logged_in);
        assert!(state.sessions.get(&anonymous, |d| d.user_id).flatten().is_none());
        assert_eq!(
            flash(&state, &anonymous).0.as_deref(),
            Some("You have been logged out.")
        );
        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn planted_session_id_is_not_kept_at_login() {
        let state = AppState::fake();
        state
            .credentials
            .create_user("Finn", "finn@example.com", "longenough")
            .await
            .unwrap();
        let app = crate::app::build_app(state.clone());

        let (planted, token) = session_with_token(&state, None);
        let res = app
            .oneshot(form_request(
                "/login",
                &planted,
                &format!("csrf_token={token}&email=finn%40example.com&password=longenough"),
            ))
            .await
            .unwrap();
        let issued = session_cookie_id(&res).unwrap();
        assert_ne!(issued, planted);
        assert!(!state.sessions.contains(&planted));
        assert!(state.sessions.get(&issued, |d| d.user_id).flatten().is_some());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let users = Arc::new(MemoryUserStore::new());
        let state = AppState::fake_with_users(users);
        state
            .credentials
            .create_user("Eve", "eve@example.com", "correct-horse")
            .await
            .unwrap();
        let app = crate::app::build_app(state.clone());

        let (a, token_a) = session_with_token(&state, None);
        app.clone()
            .oneshot(form_request(
                "/login",
                &a,
                &format!("csrf_token={token_a}&email=eve%40example.com&password=wrong-pass"),
            ))
            .await
            .unwrap();
        let (b, token_b) = session_with_token(&state, None);
        app.oneshot(form_request(
            "/login",
            &b,
            &format!("csrf_token={token_b}&email=nobody%40example.com&password=wrong-pass"),
        ))
        .await
        .unwrap();

        let expected = AuthError::InvalidCredentials.to_string();
        assert_eq!(flash(&state, &a).1, Some(expected.clone()));
        assert_eq!(flash(&state, &b).1, Some(expected));
        assert!(state.sessions.get(&a, |d| d.user_id).flatten().is_none());
    }

    #[tokio::test]
    async fn register_without_token_is_rejected() {
        let users = Arc::new(MemoryUserStore::new());
        let state = AppState::fake_with_users(users.clone());
        let app = crate::app::build_app(state.clone());

        let (sid, _) = session_with_token(&state, None);
        let res = app
            .oneshot(form_request(
                "/register",
                &sid,
                "name=Mallory&email=m%40example.com&password=longenough",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(users.len(), 0);
        assert_eq!(flash(&state, &sid).1.as_deref(), Some(crate::web::CSRF_FAILED));
    }

    #[tokio::test]
    async fn login_page_embeds_token() {
        let state = AppState::fake();
        let app = crate::app::build_app(state.clone());
        let (sid, token) = session_with_token(&state, None);

        let res = app.oneshot(get_request("/login", &sid)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let html = String::from_utf8(to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec())
            .unwrap();
        assert!(html.contains(&format!("name=\"csrf_token\" value=\"{token}\"")));
    }
}
