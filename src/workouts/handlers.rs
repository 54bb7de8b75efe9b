use axum::{
    extract::{Path, State},
    http::Method,
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{
        dto::TokenOnlyForm,
        policy::{require_admin_session, require_authenticated, require_owner},
    },
    error::AppError,
    session::Session,
    state::AppState,
    views::{self, escape},
    web::{auth_target, redirect_csrf, redirect_err, redirect_ok, render},
    workouts::{
        dto::{format_date, WorkoutForm},
        repo_types::{Workout, WorkoutListItem, WorkoutType},
        services::NOT_FOUND,
    },
};

const LIST: &str = "/workouts";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/workouts", get(list_workouts).post(store_workout))
        .route("/workouts/new", get(new_workout))
        .route("/workouts/:id", post(update_workout))
        .route("/workouts/:id/edit", get(edit_workout))
        .route("/workouts/:id/delete", post(delete_workout))
}

#[instrument(skip(state, session))]
pub async fn list_workouts(State(state): State<AppState>, session: Session) -> Html<String> {
    let viewer = session.user_id();
    let is_admin = match viewer {
        Some(id) => state.credentials.is_admin(id).await,
        None => false,
    };
    let body = match state.workouts.list().await {
        Ok(items) => {
            let csrf_input = viewer
                .map(|_| state.csrf.hidden_input(&session))
                .unwrap_or_default();
            workout_list(&items, viewer, is_admin, &csrf_input)
        }
        Err(e) => {
            session.flash_error(e.flash_message());
            String::new()
        }
    };
    render(&state, &session, "Workouts", &body).await
}

#[instrument(skip(state, session))]
pub async fn new_workout(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, Redirect> {
    if let Err(e) = require_admin_session(&state.credentials, &session).await {
        let to = auth_target(&e, LIST);
        return Err(redirect_err(&session, to, e));
    }
    let types = match state.workouts.workout_types().await {
        Ok(types) => types,
        Err(e) => return Err(redirect_err(&session, LIST, e)),
    };
    let body = workout_form(None, &types, &state.csrf.hidden_input(&session));
    Ok(render(&state, &session, "Add workout", &body).await)
}

#[instrument(skip(state, session, form))]
pub async fn store_workout(
    State(state): State<AppState>,
    session: Session,
    method: Method,
    Form(form): Form<WorkoutForm>,
) -> Redirect {
    if !state
        .csrf
        .validate_request(&session, &method, form.csrf_token.as_deref())
    {
        return redirect_csrf(&session, LIST);
    }
    let user_id = match require_admin_session(&state.credentials, &session).await {
        Ok(id) => id,
        Err(e) => {
            let to = auth_target(&e, LIST);
            return redirect_err(&session, to, e);
        }
    };
    let input = match form.validate() {
        Ok(input) => input,
        Err(e) => return redirect_err(&session, "/workouts/new", e),
    };
    match state.workouts.create(&input, user_id).await {
        Ok(created) => redirect_ok(&session, LIST, created.message),
        Err(e @ AppError::Validation(_)) => redirect_err(&session, "/workouts/new", e),
        Err(e) => redirect_err(&session, LIST, e),
    }
}

#[instrument(skip(state, session))]
pub async fn edit_workout(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, Redirect> {
    let loaded = async {
        let workout = owned_workout(&state, &session, id).await?;
        let types = state.workouts.workout_types().await?;
        Ok::<_, AppError>((workout, types))
    };
    let (workout, types) = match loaded.await {
        Ok(pair) => pair,
        Err(e) => {
            let to = auth_target(&e, LIST);
            return Err(redirect_err(&session, to, e));
        }
    };
    let body = workout_form(Some(&workout), &types, &state.csrf.hidden_input(&session));
    Ok(render(&state, &session, "Edit workout", &body).await)
}

#[instrument(skip(state, session, form))]
pub async fn update_workout(
    State(state): State<AppState>,
    session: Session,
    method: Method,
    Path(id): Path<Uuid>,
    Form(form): Form<WorkoutForm>,
) -> Redirect {
    if !state
        .csrf
        .validate_request(&session, &method, form.csrf_token.as_deref())
    {
        return redirect_csrf(&session, LIST);
    }
    if let Err(e) = owned_workout(&state, &session, id).await {
        let to = auth_target(&e, LIST);
        return redirect_err(&session, to, e);
    }
    let input = match form.validate() {
        Ok(input) => input,
        Err(e) => return redirect_err(&session, &format!("/workouts/{id}/edit"), e),
    };
    match state.workouts.update(id, &input).await {
        Ok(outcome) => redirect_ok(&session, LIST, outcome.message),
        Err(e @ AppError::Validation(_)) => {
            redirect_err(&session, &format!("/workouts/{id}/edit"), e)
        }
        Err(e) => redirect_err(&session, LIST, e),
    }
}

#[instrument(skip(state, session, form))]
pub async fn delete_workout(
    State(state): State<AppState>,
    session: Session,
    method: Method,
    Path(id): Path<Uuid>,
    Form(form): Form<TokenOnlyForm>,
) -> Redirect {
    if !state
        .csrf
        .validate_request(&session, &method, form.csrf_token.as_deref())
    {
        return redirect_csrf(&session, LIST);
    }
    if let Err(e) = owned_workout(&state, &session, id).await {
        let to = auth_target(&e, LIST);
        return redirect_err(&session, to, e);
    }
    match state.workouts.delete(id).await {
        Ok(outcome) => redirect_ok(&session, LIST, outcome.message),
        Err(e) => redirect_err(&session, LIST, e),
    }
}

async fn owned_workout(state: &AppState, session: &Session, id: Uuid) -> Result<Workout, AppError> {
    let user_id = require_authenticated(session)?;
    let workout = state
        .workouts
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    require_owner(&workout, user_id)?;
    Ok(workout)
}

fn workout_list(
    items: &[WorkoutListItem],
    viewer: Option<Uuid>,
    is_admin: bool,
    csrf_input: &str,
) -> String {
    let mut out = String::from("<h1>Workouts</h1>\n");
    if is_admin {
        out.push_str("<p><a class=\"main-button\" href=\"/workouts/new\">Add workout</a></p>\n");
    }
    if items.is_empty() {
        out.push_str("<p>No workouts yet.</p>\n");
        return out;
    }
    out.push_str(
        "<table>\n<tr><th>Date</th><th>Type</th><th>Trainer</th><th>Minutes</th>\
         <th>Intensity</th><th>kcal</th><th>Description</th><th></th></tr>\n",
    );
    for item in items {
        let w = &item.workout;
        let controls = if viewer == Some(w.user_id) {
            format!(
                "<a href=\"/workouts/{}/edit\">Edit</a> {}",
                w.id,
                views::post_button(&format!("/workouts/{}/delete", w.id), "Delete", csrf_input)
            )
        } else {
            String::new()
        };
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            format_date(w.date),
            escape(&item.workout_type_name),
            escape(&item.user_name),
            w.duration_min,
            w.intensity,
            w.calories_burned,
            escape(w.description.as_deref().unwrap_or("")),
            controls
        ));
    }
    out.push_str("</table>\n");
    out
}

fn workout_form(workout: Option<&Workout>, types: &[WorkoutType], csrf_input: &str) -> String {
    let action = match workout {
        Some(w) => format!("/workouts/{}", w.id),
        None => LIST.to_string(),
    };
    let heading = if workout.is_some() { "Edit workout" } else { "Add workout" };
    let selected_type = workout.map(|w| w.workout_type_id);

    let mut out = format!(
        "<h2>{heading}</h2>\n<form method=\"POST\" action=\"{}\">\n{csrf_input}\n",
        escape(&action)
    );
    out.push_str("<label for=\"workout_type_id\">Type *</label>\n<select id=\"workout_type_id\" name=\"workout_type_id\" required>\n");
    out.push_str("<option value=\"\">Choose...</option>\n");
    for t in types {
        out.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>\n",
            t.id,
            if selected_type == Some(t.id) { " selected" } else { "" },
            escape(&t.name)
        ));
    }
    out.push_str("</select>\n");
    out.push_str(&views::date_input(
        "date",
        "Date *",
        &workout.map(|w| format_date(w.date)).unwrap_or_default(),
    ));
    out.push_str(&views::textarea(
        "description",
        "Description",
        workout.and_then(|w| w.description.as_deref()).unwrap_or(""),
        3,
    ));
    out.push_str(&views::number_input(
        "duration_min",
        "Duration (minutes)",
        workout.map_or(0, |w| w.duration_min),
    ));
    out.push_str(&views::number_input(
        "intensity",
        "Intensity",
        workout.map_or(0, |w| w.intensity),
    ));
    out.push_str(&views::number_input(
        "calories_burned",
        "Calories burned",
        workout.map_or(0, |w| w.calories_burned),
    ));
    out.push_str(&views::textarea(
        "notes",
        "Notes",
        workout.and_then(|w| w.notes.as_deref()).unwrap_or(""),
        3,
    ));
    out.push_str(&format!(
        "<button type=\"submit\">{}</button> <a href=\"{LIST}\">Cancel</a>\n</form>\n",
        if workout.is_some() { "Update" } else { "Add" }
    ));
    out
}
