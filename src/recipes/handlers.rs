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
    recipes::{
        dto::{RecipeForm, TITLE_MAX_CHARS},
        repo_types::{Recipe, RecipeListItem},
        services::NOT_FOUND,
    },
    session::Session,
    state::AppState,
    views::{self, escape},
    web::{auth_target, redirect_csrf, redirect_err, redirect_ok, render},
};

const LIST: &str = "/recipes";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(store_recipe))
        .route("/recipes/new", get(new_recipe))
        .route("/recipes/:id", post(update_recipe))
        .route("/recipes/:id/edit", get(edit_recipe))
        .route("/recipes/:id/delete", post(delete_recipe))
}

#[instrument(skip(state, session))]
pub async fn list_recipes(State(state): State<AppState>, session: Session) -> Html<String> {
    let viewer = session.user_id();
    let is_admin = match viewer {
        Some(id) => state.credentials.is_admin(id).await,
        None => false,
    };
    let body = match state.recipes.list(viewer).await {
        Ok(items) => {
            let csrf_input = viewer
                .map(|_| state.csrf.hidden_input(&session))
                .unwrap_or_default();
            recipe_list(&items, viewer, is_admin, &csrf_input)
        }
        Err(e) => {
            session.flash_error(e.flash_message());
            String::new()
        }
    };
    render(&state, &session, "Recipes", &body).await
}

#[instrument(skip(state, session))]
pub async fn new_recipe(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, Redirect> {
    if let Err(e) = require_admin_session(&state.credentials, &session).await {
        let to = auth_target(&e, LIST);
        return Err(redirect_err(&session, to, e));
    }
    let body = recipe_form(None, &state.csrf.hidden_input(&session));
    Ok(render(&state, &session, "Add recipe", &body).await)
}

#[instrument(skip(state, session, form))]
pub async fn store_recipe(
    State(state): State<AppState>,
    session: Session,
    method: Method,
    Form(form): Form<RecipeForm>,
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
        Err(e) => return redirect_err(&session, "/recipes/new", e),
    };
    match state.recipes.create(&input, user_id).await {
        Ok(created) => redirect_ok(&session, LIST, created.message),
        Err(e) => redirect_err(&session, LIST, e),
    }
}

#[instrument(skip(state, session))]
pub async fn edit_recipe(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, Redirect> {
    let recipe = match owned_recipe(&state, &session, id).await {
        Ok(recipe) => recipe,
        Err(e) => {
            let to = auth_target(&e, LIST);
            return Err(redirect_err(&session, to, e));
        }
    };
    let body = recipe_form(Some(&recipe), &state.csrf.hidden_input(&session));
    Ok(render(&state, &session, "Edit recipe", &body).await)
}

#[instrument(skip(state, session, form))]
pub async fn update_recipe(
    State(state): State<AppState>,
    session: Session,
    method: Method,
    Path(id): Path<Uuid>,
    Form(form): Form<RecipeForm>,
) -> Redirect {
    if !state
        .csrf
        .validate_request(&session, &method, form.csrf_token.as_deref())
    {
        return redirect_csrf(&session, LIST);
    }
    if let Err(e) = owned_recipe(&state, &session, id).await {
        let to = auth_target(&e, LIST);
        return redirect_err(&session, to, e);
    }
    let input = match form.validate() {
        Ok(input) => input,
        Err(e) => return redirect_err(&session, &format!("/recipes/{id}/edit"), e),
    };
    match state.recipes.update(id, &input).await {
        Ok(outcome) => redirect_ok(&session, LIST, outcome.message),
        Err(e) => redirect_err(&session, LIST, e),
    }
}

#[instrument(skip(state, session, form))]
pub async fn delete_recipe(
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
    if let Err(e) = owned_recipe(&state, &session, id).await {
        let to = auth_target(&e, LIST);
        return redirect_err(&session, to, e);
    }
    match state.recipes.delete(id).await {
        Ok(outcome) => redirect_ok(&session, LIST, outcome.message),
        Err(e) => redirect_err(&session, LIST, e),
    }
}

/// Loads the recipe and checks that the session user owns it.
async fn owned_recipe(state: &AppState, session: &Session, id: Uuid) -> Result<Recipe, AppError> {
    let user_id = require_authenticated(session)?;
    let recipe = state
        .recipes
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    require_owner(&recipe, user_id)?;
    Ok(recipe)
}

fn recipe_list(
    items: &[RecipeListItem],
    viewer: Option<Uuid>,
    is_admin: bool,
    csrf_input: &str,
) -> String {
    let mut out = String::from("<h1>Recipes</h1>\n");
    if is_admin {
        out.push_str("<p><a class=\"main-button\" href=\"/recipes/new\">Add recipe</a></p>\n");
    }
    if items.is_empty() {
        out.push_str("<p>No recipes yet.</p>\n");
    }
    for item in items {
        let r = &item.recipe;
        out.push_str("<article class=\"recipe\">\n");
        out.push_str(&format!("<h3>{}</h3>\n", escape(&r.title)));
        out.push_str(&format!(
            "<p class=\"meta\">by {} &middot; {} kcal{}</p>\n",
            escape(&item.author_name),
            r.total_calories,
            if r.is_public { "" } else { " &middot; private" }
        ));
        if let Some(d) = &r.description {
            out.push_str(&format!("<p>{}</p>\n", escape(d)));
        }
        if let Some(s) = &r.steps {
            out.push_str(&format!("<pre class=\"steps\">{}</pre>\n", escape(s)));
        }
        if viewer == Some(r.created_by) {
            out.push_str(&format!(
                "<a href=\"/recipes/{}/edit\">Edit</a> {}\n",
                r.id,
                views::post_button(&format!("/recipes/{}/delete", r.id), "Delete", csrf_input)
            ));
        }
        out.push_str("</article>\n");
    }
    out
}

fn recipe_form(recipe: Option<&Recipe>, csrf_input: &str) -> String {
    let action = match recipe {
        Some(r) => format!("/recipes/{}", r.id),
        None => LIST.to_string(),
    };
    let heading = if recipe.is_some() { "Edit recipe" } else { "Add recipe" };
    let checked = recipe.map_or(true, |r| r.is_public);

    let mut out = format!(
        "<h2>{heading}</h2>\n<form method=\"POST\" action=\"{}\">\n{csrf_input}\n",
        escape(&action)
    );
    out.push_str(&views::text_input(
        "title",
        "Title *",
        recipe.map_or("", |r| r.title.as_str()),
        &format!("maxlength=\"{TITLE_MAX_CHARS}\" required"),
    ));
    out.push_str(&views::textarea(
        "description",
        "Description",
        recipe.and_then(|r| r.description.as_deref()).unwrap_or(""),
        4,
    ));
    out.push_str(&views::textarea(
        "steps",
        "Steps",
        recipe.and_then(|r| r.steps.as_deref()).unwrap_or(""),
        10,
    ));
    out.push_str(&views::number_input(
        "total_calories",
        "Total calories (kcal)",
        recipe.map_or(0, |r| r.total_calories),
    ));
    out.push_str(&format!(
        "<label><input type=\"checkbox\" name=\"is_public\"{}> Public recipe</label>\n",
        if checked { " checked" } else { "" }
    ));
    out.push_str(&format!(
        "<button type=\"submit\">{}</button> <a href=\"{LIST}\">Cancel</a>\n</form>\n",
        if recipe.is_some() { "Update" } else { "Add" }
    ));
    out
}
