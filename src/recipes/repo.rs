use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{
    AmountRow, Collection, RecipeFields, RecipeFilter, RecipeRow, RecipeShortRow, RecipeTagRow,
};
use super::shopping::CartIngredientRow;

// $1 is the viewer; NULL makes both flags false.
const RECIPE_COLUMNS: &str = r#"
    r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date,
    EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $1::uuid) AS is_favorited,
    EXISTS (SELECT 1 FROM carts c WHERE c.recipe_id = r.id AND c.user_id = $1::uuid) AS is_in_cart
"#;

/// WHERE clause for [`RecipeFilter`], numbering its four placeholders from `first`.
fn filter_clause(first: usize) -> String {
    let (author, tags, fav, cart) = (first, first + 1, first + 2, first + 3);
    format!(
        r#"
        WHERE (${author}::uuid IS NULL OR r.author_id = ${author})
          AND (${tags}::text[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(${tags})))
          AND (${fav}::uuid IS NULL OR EXISTS (
                SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ${fav}))
          AND (${cart}::uuid IS NULL OR EXISTS (
                SELECT 1 FROM carts c WHERE c.recipe_id = r.id AND c.user_id = ${cart}))
        "#
    )
}

// ---- Writes (transactional) ----

pub async fn insert_recipe_tx(
    tx: &mut Transaction<'_, Postgres>,
    author_id: Uuid,
    fields: &RecipeFields,
    image_key: &str,
) -> anyhow::Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(author_id)
    .bind(&fields.name)
    .bind(image_key)
    .bind(&fields.text)
    .bind(fields.cooking_time)
    .fetch_one(&mut **tx)
    .await
    .context("insert recipe")?;
    Ok(id)
}

/// Lock the recipe row for the rest of the transaction; returns `(author_id, image)`.
pub async fn lock_recipe_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
) -> sqlx::Result<Option<(Uuid, String)>> {
    sqlx::query_as::<_, (Uuid, String)>(
        "SELECT author_id, image FROM recipes WHERE id = $1 FOR UPDATE",
    )
    .bind(recipe_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Overwrite scalar columns. `image_key = None` keeps the current image.
pub async fn update_recipe_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    fields: &RecipeFields,
    image_key: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE recipes
           SET name = $2, text = $3, cooking_time = $4, image = COALESCE($5, image)
         WHERE id = $1
        "#,
    )
    .bind(recipe_id)
    .bind(&fields.name)
    .bind(&fields.text)
    .bind(fields.cooking_time)
    .bind(image_key)
    .execute(&mut **tx)
    .await
    .context("update recipe")?;
    Ok(())
}

pub async fn insert_tags_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    tag_ids: &[i64],
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO recipe_tags (recipe_id, tag_id) SELECT $1, UNNEST($2::bigint[])",
    )
    .bind(recipe_id)
    .bind(tag_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Insert one `amount_ingredients` row per pair, in the given order.
pub async fn insert_amounts_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    amounts: &[(i64, i32)],
) -> sqlx::Result<()> {
    let ingredient_ids: Vec<i64> = amounts.iter().map(|(id, _)| *id).collect();
    let values: Vec<i32> = amounts.iter().map(|(_, amount)| *amount).collect();
    sqlx::query(
        r#"
        INSERT INTO amount_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, t.ingredient_id, t.amount
          FROM UNNEST($2::bigint[], $3::int[]) WITH ORDINALITY AS t(ingredient_id, amount, ord)
         ORDER BY t.ord
        "#,
    )
    .bind(recipe_id)
    .bind(&ingredient_ids)
    .bind(&values)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn clear_tags_tx(tx: &mut Transaction<'_, Postgres>, recipe_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn clear_amounts_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM amount_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn delete_recipe_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

// ---- Queries ----

pub async fn get_recipe(
    db: &PgPool,
    recipe_id: i64,
    viewer: Option<Uuid>,
) -> sqlx::Result<Option<RecipeRow>> {
    sqlx::query_as::<_, RecipeRow>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $2"
    ))
    .bind(viewer)
    .bind(recipe_id)
    .fetch_optional(db)
    .await
}

pub async fn list_recipes(
    db: &PgPool,
    viewer: Option<Uuid>,
    filter: &RecipeFilter,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<RecipeRow>> {
    sqlx::query_as::<_, RecipeRow>(&format!(
        r#"
        SELECT {RECIPE_COLUMNS}
          FROM recipes r
        {}
         ORDER BY r.pub_date DESC, r.id DESC
         LIMIT $6 OFFSET $7
        "#,
        filter_clause(2)
    ))
    .bind(viewer)
    .bind(filter.author)
    .bind(filter.tag_slugs.as_deref())
    .bind(filter.favorited_by)
    .bind(filter.in_cart_of)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_recipes(db: &PgPool, filter: &RecipeFilter) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM recipes r {}",
        filter_clause(1)
    ))
    .bind(filter.author)
    .bind(filter.tag_slugs.as_deref())
    .bind(filter.favorited_by)
    .bind(filter.in_cart_of)
    .fetch_one(db)
    .await
}

pub async fn get_recipe_short(db: &PgPool, recipe_id: i64) -> sqlx::Result<Option<RecipeShortRow>> {
    sqlx::query_as::<_, RecipeShortRow>(
        "SELECT id, author_id, name, image, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(recipe_id)
    .fetch_optional(db)
    .await
}

/// Newest `per_author` recipes of each author.
pub async fn latest_by_authors(
    db: &PgPool,
    author_ids: &[Uuid],
    per_author: i64,
) -> sqlx::Result<Vec<RecipeShortRow>> {
    sqlx::query_as::<_, RecipeShortRow>(
        r#"
        SELECT id, author_id, name, image, cooking_time
          FROM (
                SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, r.pub_date,
                       ROW_NUMBER() OVER (PARTITION BY r.author_id
                                          ORDER BY r.pub_date DESC, r.id DESC) AS rn
                  FROM recipes r
                 WHERE r.author_id = ANY($1)
               ) ranked
         WHERE rn <= $2
         ORDER BY author_id, pub_date DESC, id DESC
        "#,
    )
    .bind(author_ids)
    .bind(per_author)
    .fetch_all(db)
    .await
}

pub async fn count_by_authors(db: &PgPool, author_ids: &[Uuid]) -> sqlx::Result<Vec<(Uuid, i64)>> {
    sqlx::query_as::<_, (Uuid, i64)>(
        r#"
        SELECT author_id, COUNT(*)
          FROM recipes
         WHERE author_id = ANY($1)
         GROUP BY author_id
        "#,
    )
    .bind(author_ids)
    .fetch_all(db)
    .await
}

pub async fn tags_for(db: &PgPool, recipe_ids: &[i64]) -> sqlx::Result<Vec<RecipeTagRow>> {
    sqlx::query_as::<_, RecipeTagRow>(
        r#"
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
          FROM recipe_tags rt
          JOIN tags t ON t.id = rt.tag_id
         WHERE rt.recipe_id = ANY($1)
         ORDER BY t.id DESC
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
}

pub async fn amounts_for(db: &PgPool, recipe_ids: &[i64]) -> sqlx::Result<Vec<AmountRow>> {
    sqlx::query_as::<_, AmountRow>(
        r#"
        SELECT ai.recipe_id, i.id, i.name, i.measurement_unit, ai.amount
          FROM amount_ingredients ai
          JOIN ingredients i ON i.id = ai.ingredient_id
         WHERE ai.recipe_id = ANY($1)
         ORDER BY ai.id
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
}

// ---- Favorites / cart ----

pub async fn membership_exists(
    db: &PgPool,
    collection: Collection,
    user_id: Uuid,
    recipe_id: i64,
) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND recipe_id = $2)",
        collection.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(db)
    .await
}

pub async fn insert_membership(
    db: &PgPool,
    collection: Collection,
    user_id: Uuid,
    recipe_id: i64,
) -> sqlx::Result<()> {
    sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2)",
        collection.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(db)
    .await?;
    Ok(())
}

/// Returns the number of rows removed (0 or 1).
pub async fn delete_membership(
    db: &PgPool,
    collection: Collection,
    user_id: Uuid,
    recipe_id: i64,
) -> sqlx::Result<u64> {
    let res = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        collection.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected())
}

/// Every ingredient amount of every recipe in the cart, oldest cart entry first.
pub async fn cart_ingredients(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<CartIngredientRow>> {
    sqlx::query_as::<_, CartIngredientRow>(
        r#"
        SELECT i.name, i.measurement_unit, ai.amount::bigint AS amount
          FROM carts c
          JOIN amount_ingredients ai ON ai.recipe_id = c.recipe_id
          JOIN ingredients i ON i.id = ai.ingredient_id
         WHERE c.user_id = $1
         ORDER BY c.id, ai.id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}
