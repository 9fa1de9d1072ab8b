use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};

use super::repo_types::{Ingredient, IngredientSeed, Tag};

pub async fn list_tags(db: &PgPool) -> sqlx::Result<Vec<Tag>> {
    sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags ORDER BY id DESC")
        .fetch_all(db)
        .await
}

pub async fn get_tag(db: &PgPool, id: i64) -> sqlx::Result<Option<Tag>> {
    sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Ingredients ordered by name, optionally narrowed to a case-insensitive name prefix.
pub async fn list_ingredients(db: &PgPool, prefix: Option<&str>) -> sqlx::Result<Vec<Ingredient>> {
    let pattern = prefix.map(|p| format!("{}%", escape_like(&p.to_lowercase())));
    sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, name, measurement_unit
          FROM ingredients
         WHERE $1::text IS NULL OR lower(name) LIKE $1
         ORDER BY name, id
        "#,
    )
    .bind(pattern)
    .fetch_all(db)
    .await
}

pub async fn get_ingredient(db: &PgPool, id: i64) -> sqlx::Result<Option<Ingredient>> {
    sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Ids from `ids` that have a row in `tags`.
pub async fn existing_tag_ids_tx(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[i64],
) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
}

/// Ids from `ids` that have a row in `ingredients`.
pub async fn existing_ingredient_ids_tx(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[i64],
) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
}

/// Upsert the catalog in one transaction. Returns the number of new rows.
pub async fn import_ingredients(db: &PgPool, seeds: &[IngredientSeed]) -> anyhow::Result<u64> {
    let names: Vec<&str> = seeds.iter().map(|s| s.name.as_str()).collect();
    let units: Vec<&str> = seeds.iter().map(|s| s.measurement_unit.as_str()).collect();

    let mut tx = db.begin().await.context("begin tx")?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO ingredients (name, measurement_unit)
        SELECT * FROM UNNEST($1::text[], $2::text[])
        ON CONFLICT (name, measurement_unit) DO NOTHING
        "#,
    )
    .bind(&names)
    .bind(&units)
    .execute(&mut *tx)
    .await
    .context("insert ingredients")?
    .rows_affected();
    tx.commit().await.context("commit tx")?;
    Ok(inserted)
}

pub(crate) fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
