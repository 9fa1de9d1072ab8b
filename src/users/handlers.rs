use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{SubscriptionCard, SubscriptionsQuery, UserListQuery, DEFAULT_RECIPES_LIMIT};
use super::repo;
use super::repo_types::Profile;
use super::services::{subscription_cards, toggle_subscription};
use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    catalog::repo::escape_like,
    error::{AppError, AppResult},
    pagination::{Page, PageParams},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/subscriptions", get(list_subscriptions))
        .route("/users/:id", get(get_user))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route(
        "/users/:id/subscribe",
        axum::routing::post(subscribe).delete(unsubscribe),
    )
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(q): Query<UserListQuery>,
) -> AppResult<Json<Page<Profile>>> {
    let window = PageParams { page: q.page, limit: q.limit }.resolve(state.config.page_size);
    let pattern = q
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{}%", escape_like(&s.to_lowercase())));

    let count = repo::count_profiles(&state.db, pattern.as_deref()).await?;
    let users = repo::list_profiles(
        &state.db,
        viewer,
        pattern.as_deref(),
        window.limit,
        window.offset(),
    )
    .await?;
    Ok(Json(Page::new(window, count, users)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Profile>> {
    repo::get_profile(&state.db, viewer, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("user not found"))
}

#[instrument(skip(state))]
pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<SubscriptionCard>)> {
    toggle_subscription(&state.db, user_id, author_id, true).await?;

    let author = repo::get_profile(&state.db, Some(user_id), author_id)
        .await?
        .ok_or_else(|| AppError::not_found("author not found"))?;
    let card = subscription_cards(&state, vec![author], DEFAULT_RECIPES_LIMIT)
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("author not found"))?;
    Ok((StatusCode::CREATED, Json(card)))
}

#[instrument(skip(state))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    toggle_subscription(&state.db, user_id, author_id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SubscriptionsQuery>,
) -> AppResult<Json<Page<SubscriptionCard>>> {
    let window = PageParams { page: q.page, limit: q.limit }.resolve(state.config.page_size);
    let count = repo::count_subscriptions(&state.db, user_id).await?;
    let authors =
        repo::list_subscribed_authors(&state.db, user_id, window.limit, window.offset()).await?;
    let cards = subscription_cards(
        &state,
        authors,
        q.recipes_limit.unwrap_or(DEFAULT_RECIPES_LIMIT),
    )
    .await?;
    Ok(Json(Page::new(window, count, cards)))
}
