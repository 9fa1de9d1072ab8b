use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Recipe row plus the per-viewer flags computed at read time.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: OffsetDateTime,
    pub is_favorited: bool,
    pub is_in_cart: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecipeShortRow {
    pub id: i64,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecipeTagRow {
    pub recipe_id: i64,
    pub id: i64,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct AmountRow {
    pub recipe_id: i64,
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Scalar columns written on create and update.
#[derive(Debug, Clone)]
pub struct RecipeFields {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    pub tag_slugs: Option<Vec<String>>,
    pub favorited_by: Option<Uuid>,
    pub in_cart_of: Option<Uuid>,
}

/// User-to-recipe join tables toggled by add/remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Favorites,
    Cart,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Favorites => "favorites",
            Collection::Cart => "carts",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Collection::Favorites => "favorites",
            Collection::Cart => "shopping cart",
        }
    }
}
