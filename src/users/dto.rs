use serde::{Deserialize, Serialize};

use super::repo_types::Profile;
use crate::recipes::dto::RecipeShort;

pub const DEFAULT_RECIPES_LIMIT: i64 = 3;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub recipes_limit: Option<i64>,
}

/// Followed author with a preview of their newest recipes.
#[derive(Debug, Serialize)]
pub struct SubscriptionCard {
    #[serde(flatten)]
    pub author: Profile,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}
