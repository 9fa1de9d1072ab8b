use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::repo;
use super::repo_types::{Ingredient, Tag};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct IngredientSearch {
    pub name: Option<String>,
}

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags))
        .route("/tags/:id", get(get_tag))
        .route("/ingredients", get(list_ingredients))
        .route("/ingredients/:id", get(get_ingredient))
}

#[instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(repo::list_tags(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_tag(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Tag>> {
    repo::get_tag(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("tag not found"))
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(q): Query<IngredientSearch>,
) -> AppResult<Json<Vec<Ingredient>>> {
    let prefix = q.name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(Json(repo::list_ingredients(&state.db, prefix).await?))
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Ingredient>> {
    repo::get_ingredient(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("ingredient not found"))
}
