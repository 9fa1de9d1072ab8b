use std::collections::HashMap;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::dto::SubscriptionCard;
use super::repo;
use super::repo_types::Profile;
use crate::error::{AppError, AppResult};
use crate::recipes;
use crate::state::AppState;

pub fn ensure_not_self(follower: Uuid, author: Uuid) -> AppResult<()> {
    if follower == author {
        return Err(AppError::SelfReference);
    }
    Ok(())
}

/// Follow (`add`) or unfollow `author_id`.
pub async fn toggle_subscription(
    db: &PgPool,
    follower: Uuid,
    author_id: Uuid,
    add: bool,
) -> AppResult<()> {
    if add {
        ensure_not_self(follower, author_id)?;
    }
    if !repo::user_exists(db, author_id).await? {
        return Err(AppError::not_found("author not found"));
    }

    if add {
        if repo::subscription_exists(db, follower, author_id).await? {
            return Err(AppError::duplicate("already subscribed to this author"));
        }
        // unique_subscribing still decides a concurrent race
        repo::insert_subscription(db, follower, author_id).await?;
        info!(user_id = %follower, author_id = %author_id, "subscribed");
    } else {
        if repo::delete_subscription(db, follower, author_id).await? == 0 {
            return Err(AppError::not_found("not subscribed to this author"));
        }
        info!(user_id = %follower, author_id = %author_id, "unsubscribed");
    }
    Ok(())
}

/// Attach recipe previews and counts to each followed author, keeping order.
pub async fn subscription_cards(
    st: &AppState,
    authors: Vec<Profile>,
    recipes_limit: i64,
) -> AppResult<Vec<SubscriptionCard>> {
    let ids: Vec<Uuid> = authors.iter().map(|a| a.id).collect();

    let previews = recipes::repo::latest_by_authors(&st.db, &ids, recipes_limit.max(0)).await?;
    let mut by_author: HashMap<Uuid, Vec<_>> = HashMap::new();
    for card in recipes::services::short_cards(st, previews).await? {
        by_author.entry(card.0).or_default().push(card.1);
    }
    let counts: HashMap<Uuid, i64> = recipes::repo::count_by_authors(&st.db, &ids)
        .await?
        .into_iter()
        .collect();

    Ok(authors
        .into_iter()
        .map(|author| SubscriptionCard {
            recipes: by_author.remove(&author.id).unwrap_or_default(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            author,
        })
        .collect())
}
