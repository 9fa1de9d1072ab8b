use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{RecipeDetails, RecipeListQuery, RecipePayload, RecipeShort};
use super::repo;
use super::repo_types::RecipeFilter;
use super::services;
use super::shopping::{self, ShoppingList};
use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::{AppJson, AppResult},
    pagination::{Page, PageParams},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route("/recipes/download_shopping_cart", get(download_shopping_cart))
        .route(
            "/recipes/:id",
            get(get_recipe)
                .put(update_recipe)
                .patch(update_recipe)
                .delete(delete_recipe),
        )
        .route("/recipes/:id/favorite", post(add_favorite).delete(remove_favorite))
        .route("/recipes/:id/shopping_cart", post(add_to_cart).delete(remove_from_cart))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(q): Query<RecipeListQuery>,
) -> AppResult<Json<Page<RecipeDetails>>> {
    let window = PageParams { page: q.page, limit: q.limit }.resolve(state.config.page_size);
    // favorite/cart filters only narrow the list for a known viewer
    let filter = RecipeFilter {
        author: q.author,
        tag_slugs: q.tag_slugs(),
        favorited_by: viewer.filter(|_| q.is_favorited == Some(true)),
        in_cart_of: viewer.filter(|_| q.is_in_cart == Some(true)),
    };

    let count = repo::count_recipes(&state.db, &filter).await?;
    let rows = repo::list_recipes(&state.db, viewer, &filter, window.limit, window.offset()).await?;
    let results = services::recipe_details(&state, viewer, rows).await?;
    Ok(Json(Page::new(window, count, results)))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<RecipeDetails>> {
    Ok(Json(services::get_recipe_details(&state, viewer, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<RecipePayload>,
) -> AppResult<Response> {
    let recipe_id = services::create_recipe(&state, user_id, payload).await?;
    let details = services::get_recipe_details(&state, Some(user_id), recipe_id).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/recipes/{recipe_id}"))],
        Json(details),
    )
        .into_response())
}

#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<RecipePayload>,
) -> AppResult<Json<RecipeDetails>> {
    services::update_recipe(&state, user_id, id, payload).await?;
    Ok(Json(services::get_recipe_details(&state, Some(user_id), id).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    services::delete_recipe(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<RecipeShort>)> {
    let recipe = services::toggle_favorite(&state.db, user_id, id, true).await?;
    Ok((StatusCode::CREATED, Json(services::short_card(&state, recipe).await?)))
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    services::toggle_favorite(&state.db, user_id, id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<RecipeShort>)> {
    let recipe = services::toggle_cart(&state.db, user_id, id, true).await?;
    Ok((StatusCode::CREATED, Json(services::short_card(&state, recipe).await?)))
}

#[instrument(skip(state))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    services::toggle_cart(&state.db, user_id, id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `shopping_list.txt` attachment, or 204 when the cart is empty.
#[instrument(skip(state))]
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Response> {
    match services::build_shopping_list(&state.db, user_id).await? {
        ShoppingList::Empty => {
            info!(user_id = %user_id, "shopping list requested with empty cart");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        ShoppingList::Items(items) => Ok(shopping_list_response(&items)),
    }
}

fn shopping_list_response(items: &[shopping::ShoppingItem]) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"shopping_list.txt\"",
            ),
        ],
        shopping::render(items),
    )
        .into_response()
}
