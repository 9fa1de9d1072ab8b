use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::repo_types::Tag;
use crate::users::repo_types::Profile;

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmountInput {
    pub id: i64,
    pub amount: i32,
}

/// Body of `POST /recipes` and `PUT|PATCH /recipes/:id`.
/// Everything is optional here so that a missing field is reported by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePayload {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    /// `data:image/<type>;base64,<payload>`
    pub image: Option<String>,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<IngredientAmountInput>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientLine {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetails {
    pub id: i64,
    pub author: Profile,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<IngredientLine>,
    pub is_favorited: bool,
    pub is_in_cart: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
}

/// Compact card used in favorites, cart and subscription responses.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeShort {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub author: Option<Uuid>,
    /// Comma-separated tag slugs.
    pub tags: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub is_favorited: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub is_in_cart: Option<bool>,
}

impl RecipeListQuery {
    pub fn tag_slugs(&self) -> Option<Vec<String>> {
        let slugs: Vec<String> = self
            .tags
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        (!slugs.is_empty()).then_some(slugs)
    }
}

/// Accepts `1`/`0` as well as `true`/`false`.
fn flag<'de, D>(de: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("1") | Some("true") | Some("True") => Ok(Some(true)),
        Some("0") | Some("false") | Some("False") => Ok(Some(false)),
        Some(other) => Err(serde::de::Error::custom(format!("invalid flag {other}"))),
    }
}
