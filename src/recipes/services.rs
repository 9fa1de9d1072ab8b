use std::collections::{HashMap, HashSet};

use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{IngredientLine, RecipeDetails, RecipePayload, RecipeShort};
use super::repo;
use super::repo_types::{Collection, RecipeFields, RecipeRow, RecipeShortRow};
use super::shopping::{self, ShoppingList};
use crate::auth::repo_types::Role;
use crate::catalog::{self, repo_types::Tag};
use crate::error::{AppError, AppResult};
use crate::images::services::{decode_data_uri, discard_image, image_url, upload_recipe_image, DecodedImage};
use crate::state::AppState;
use crate::users;

const MAX_NAME_LEN: usize = 255;

/// A recipe payload that passed validation.
#[derive(Debug)]
pub struct RecipeInput {
    pub fields: RecipeFields,
    pub image: Option<DecodedImage>,
    pub tags: Vec<i64>,
    pub ingredients: Vec<(i64, i32)>,
}

/// Recipes may be changed by their author or an admin.
pub fn can_edit(user_id: Uuid, role: Role, author_id: Uuid) -> bool {
    role.is_admin() || user_id == author_id
}

async fn authorize_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    author_id: Uuid,
) -> AppResult<()> {
    if user_id == author_id {
        return Ok(());
    }
    let role = sqlx::query_scalar::<_, String>("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .map(|r| Role::parse(&r))
        .unwrap_or(Role::User);
    if !can_edit(user_id, role, author_id) {
        warn!(user_id = %user_id, author_id = %author_id, "recipe edit forbidden");
        return Err(AppError::Forbidden("only the author can change this recipe".into()));
    }
    Ok(())
}

fn required<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::validation(format!("field {field} is required")))
}

/// Check the payload before anything is written. `cooking_time`, `tags` and
/// `ingredients` are checked for presence first, in that order.
pub fn validate_payload(p: RecipePayload, require_image: bool) -> AppResult<RecipeInput> {
    let cooking_time = required(p.cooking_time, "cooking_time")?;
    let tags = required(p.tags.filter(|t| !t.is_empty()), "tags")?;
    let ingredients = required(p.ingredients.filter(|i| !i.is_empty()), "ingredients")?;

    let name = required(
        p.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        "name",
    )?;
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    let text = required(p.text.filter(|t| !t.trim().is_empty()), "text")?;

    if cooking_time < 1 {
        return Err(AppError::validation("cooking_time must be at least 1"));
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    let mut amounts = Vec::with_capacity(ingredients.len());
    for item in ingredients {
        if item.amount < 1 {
            return Err(AppError::validation(format!(
                "amount of ingredient {} must be at least 1",
                item.id
            )));
        }
        if !seen.insert(item.id) {
            return Err(AppError::validation(format!(
                "ingredient {} is listed more than once",
                item.id
            )));
        }
        amounts.push((item.id, item.amount));
    }

    // Tags are a set; repeats collapse.
    let mut seen_tags = HashSet::with_capacity(tags.len());
    let tags: Vec<i64> = tags.into_iter().filter(|t| seen_tags.insert(*t)).collect();

    let image = match p.image.filter(|i| !i.trim().is_empty()) {
        Some(uri) => Some(decode_data_uri(&uri)?),
        None if require_image => return Err(AppError::validation("field image is required")),
        None => None,
    };

    Ok(RecipeInput {
        fields: RecipeFields {
            name,
            text,
            cooking_time,
        },
        image,
        tags,
        ingredients: amounts,
    })
}

fn missing_ids(wanted: &[i64], found: &[i64]) -> Vec<i64> {
    let found: HashSet<i64> = found.iter().copied().collect();
    wanted.iter().copied().filter(|id| !found.contains(id)).collect()
}

async fn check_references_tx(
    tx: &mut Transaction<'_, Postgres>,
    input: &RecipeInput,
) -> AppResult<()> {
    let found = catalog::repo::existing_tag_ids_tx(tx, &input.tags).await?;
    let missing = missing_ids(&input.tags, &found);
    if !missing.is_empty() {
        return Err(AppError::validation(format!("unknown tags {missing:?}")));
    }

    let wanted: Vec<i64> = input.ingredients.iter().map(|(id, _)| *id).collect();
    let found = catalog::repo::existing_ingredient_ids_tx(tx, &wanted).await?;
    let missing = missing_ids(&wanted, &found);
    if !missing.is_empty() {
        return Err(AppError::validation(format!("unknown ingredients {missing:?}")));
    }
    Ok(())
}

async fn persist_new(st: &AppState, author_id: Uuid, input: &RecipeInput, image_key: &str) -> AppResult<i64> {
    let mut tx = st.db.begin().await.context("begin tx")?;
    check_references_tx(&mut tx, input).await?;
    let recipe_id = repo::insert_recipe_tx(&mut tx, author_id, &input.fields, image_key).await?;
    repo::insert_tags_tx(&mut tx, recipe_id, &input.tags).await?;
    repo::insert_amounts_tx(&mut tx, recipe_id, &input.ingredients).await?;
    tx.commit().await.context("commit tx")?;
    Ok(recipe_id)
}

/// Create a recipe with its tags and ingredient amounts as one unit.
pub async fn create_recipe(st: &AppState, author_id: Uuid, payload: RecipePayload) -> AppResult<i64> {
    let mut input = validate_payload(payload, true)?;
    let image = input
        .image
        .take()
        .ok_or_else(|| AppError::validation("field image is required"))?;
    let image_key = upload_recipe_image(st, author_id, image).await?;

    match persist_new(st, author_id, &input, &image_key).await {
        Ok(recipe_id) => {
            info!(recipe_id, author_id = %author_id, "recipe created");
            Ok(recipe_id)
        }
        Err(e) => {
            discard_image(st, &image_key).await;
            Err(e)
        }
    }
}

async fn persist_update(
    st: &AppState,
    user_id: Uuid,
    recipe_id: i64,
    input: &RecipeInput,
    new_image: Option<&str>,
) -> AppResult<String> {
    let mut tx = st.db.begin().await.context("begin tx")?;
    let (author_id, old_image) = repo::lock_recipe_tx(&mut tx, recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("recipe not found"))?;
    authorize_tx(&mut tx, user_id, author_id).await?;
    check_references_tx(&mut tx, input).await?;

    repo::update_recipe_tx(&mut tx, recipe_id, &input.fields, new_image).await?;
    repo::clear_tags_tx(&mut tx, recipe_id).await?;
    repo::insert_tags_tx(&mut tx, recipe_id, &input.tags).await?;
    repo::clear_amounts_tx(&mut tx, recipe_id).await?;
    repo::insert_amounts_tx(&mut tx, recipe_id, &input.ingredients).await?;
    tx.commit().await.context("commit tx")?;
    Ok(old_image)
}

/// Replace scalars, tag set and ingredient set of a recipe wholesale.
pub async fn update_recipe(
    st: &AppState,
    user_id: Uuid,
    recipe_id: i64,
    payload: RecipePayload,
) -> AppResult<()> {
    let mut input = validate_payload(payload, false)?;
    // images live under the author's prefix whoever edits the recipe
    let new_key = match input.image.take() {
        Some(image) => {
            let author_id = repo::get_recipe_short(&st.db, recipe_id)
                .await?
                .ok_or_else(|| AppError::not_found("recipe not found"))?
                .author_id;
            Some(upload_recipe_image(st, author_id, image).await?)
        }
        None => None,
    };

    match persist_update(st, user_id, recipe_id, &input, new_key.as_deref()).await {
        Ok(old_key) => {
            if new_key.is_some() {
                discard_image(st, &old_key).await;
            }
            info!(recipe_id, user_id = %user_id, "recipe updated");
            Ok(())
        }
        Err(e) => {
            if let Some(key) = &new_key {
                discard_image(st, key).await;
            }
            Err(e)
        }
    }
}

pub async fn delete_recipe(st: &AppState, user_id: Uuid, recipe_id: i64) -> AppResult<()> {
    let mut tx = st.db.begin().await.context("begin tx")?;
    let (author_id, image) = repo::lock_recipe_tx(&mut tx, recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("recipe not found"))?;
    authorize_tx(&mut tx, user_id, author_id).await?;
    repo::delete_recipe_tx(&mut tx, recipe_id).await?;
    tx.commit().await.context("commit tx")?;

    discard_image(st, &image).await;
    info!(recipe_id, user_id = %user_id, "recipe deleted");
    Ok(())
}

/// Add (`add = true`) or remove a recipe from one of the user's collections.
/// Returns the recipe that was toggled.
pub async fn toggle_membership(
    db: &PgPool,
    collection: Collection,
    user_id: Uuid,
    recipe_id: i64,
    add: bool,
) -> AppResult<RecipeShortRow> {
    let recipe = repo::get_recipe_short(db, recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("recipe not found"))?;

    if add {
        if repo::membership_exists(db, collection, user_id, recipe_id).await? {
            return Err(AppError::duplicate(format!(
                "recipe is already in {}",
                collection.label()
            )));
        }
        // the unique constraint settles concurrent adds
        repo::insert_membership(db, collection, user_id, recipe_id).await?;
    } else if repo::delete_membership(db, collection, user_id, recipe_id).await? == 0 {
        return Err(AppError::not_found(format!(
            "recipe is not in {}",
            collection.label()
        )));
    }

    info!(recipe_id, user_id = %user_id, add, collection = collection.table(), "collection toggled");
    Ok(recipe)
}

pub async fn toggle_favorite(db: &PgPool, user_id: Uuid, recipe_id: i64, add: bool) -> AppResult<RecipeShortRow> {
    toggle_membership(db, Collection::Favorites, user_id, recipe_id, add).await
}

pub async fn toggle_cart(db: &PgPool, user_id: Uuid, recipe_id: i64, add: bool) -> AppResult<RecipeShortRow> {
    toggle_membership(db, Collection::Cart, user_id, recipe_id, add).await
}

/// Consolidated ingredient list over every recipe in the user's cart.
/// A cart with nothing to buy is `Empty`, whether it holds no recipes or
/// only recipes without ingredient rows.
pub async fn build_shopping_list(db: &PgPool, user_id: Uuid) -> AppResult<ShoppingList> {
    let rows = repo::cart_ingredients(db, user_id).await?;
    if rows.is_empty() {
        return Ok(ShoppingList::Empty);
    }
    Ok(ShoppingList::Items(shopping::aggregate(rows)))
}

// ---- Read assembly ----

pub async fn short_cards(
    st: &AppState,
    rows: Vec<RecipeShortRow>,
) -> AppResult<Vec<(Uuid, RecipeShort)>> {
    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        let image = image_url(st, &r.image).await?;
        out.push((
            r.author_id,
            RecipeShort {
                id: r.id,
                name: r.name,
                image,
                cooking_time: r.cooking_time,
            },
        ));
    }
    Ok(out)
}

pub async fn short_card(st: &AppState, row: RecipeShortRow) -> AppResult<RecipeShort> {
    let image = image_url(st, &row.image).await?;
    Ok(RecipeShort {
        id: row.id,
        name: row.name,
        image,
        cooking_time: row.cooking_time,
    })
}

/// Load tags, ingredient lines and author profiles for `rows` in batch.
pub async fn recipe_details(
    st: &AppState,
    viewer: Option<Uuid>,
    rows: Vec<RecipeRow>,
) -> AppResult<Vec<RecipeDetails>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut author_ids: Vec<Uuid> = rows.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
    for t in repo::tags_for(&st.db, &ids).await? {
        tags.entry(t.recipe_id).or_default().push(Tag {
            id: t.id,
            name: t.name,
            color: t.color,
            slug: t.slug,
        });
    }

    let mut lines: HashMap<i64, Vec<IngredientLine>> = HashMap::new();
    for a in repo::amounts_for(&st.db, &ids).await? {
        lines.entry(a.recipe_id).or_default().push(IngredientLine {
            id: a.id,
            name: a.name,
            measurement_unit: a.measurement_unit,
            amount: a.amount,
        });
    }

    let authors: HashMap<Uuid, _> = users::repo::profiles_by_ids(&st.db, viewer, &author_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        let Some(author) = authors.get(&r.author_id).cloned() else {
            warn!(recipe_id = r.id, author_id = %r.author_id, "recipe author vanished");
            continue;
        };
        let image = image_url(st, &r.image).await?;
        out.push(RecipeDetails {
            id: r.id,
            author,
            name: r.name,
            image,
            text: r.text,
            cooking_time: r.cooking_time,
            tags: tags.remove(&r.id).unwrap_or_default(),
            ingredients: lines.remove(&r.id).unwrap_or_default(),
            is_favorited: r.is_favorited,
            is_in_cart: r.is_in_cart,
            pub_date: r.pub_date,
        });
    }
    Ok(out)
}

pub async fn get_recipe_details(
    st: &AppState,
    viewer: Option<Uuid>,
    recipe_id: i64,
) -> AppResult<RecipeDetails> {
    let row = repo::get_recipe(&st.db, recipe_id, viewer)
        .await?
        .ok_or_else(|| AppError::not_found("recipe not found"))?;
    recipe_details(st, viewer, vec![row])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("recipe not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::dto::IngredientAmountInput;

    fn payload() -> RecipePayload {
        RecipePayload {
            name: Some("Borscht".into()),
            text: Some("Boil everything.".into()),
            cooking_time: Some(90),
            image: Some("data:image/png;base64,aGVsbG8=".into()),
            tags: Some(vec![1, 2]),
            ingredients: Some(vec![
                IngredientAmountInput { id: 1, amount: 2 },
                IngredientAmountInput { id: 2, amount: 3 },
            ]),
        }
    }

    fn validation_message(p: RecipePayload, require_image: bool) -> String {
        match validate_payload(p, require_image) {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_payload_keeps_ingredient_pairs_in_order() {
        let input = validate_payload(payload(), true).unwrap();
        assert_eq!(input.ingredients, vec![(1, 2), (2, 3)]);
        assert_eq!(input.tags, vec![1, 2]);
        assert_eq!(input.fields.cooking_time, 90);
        assert!(input.image.is_some());
    }

    #[test]
    fn required_fields_are_checked_in_order() {
        let mut p = payload();
        p.cooking_time = None;
        p.tags = None;
        assert!(validation_message(p, true).contains("cooking_time"));

        let mut p = payload();
        p.tags = Some(vec![]);
        p.ingredients = None;
        assert!(validation_message(p, true).contains("tags"));

        let mut p = payload();
        p.ingredients = Some(vec![]);
        assert!(validation_message(p, true).contains("ingredients"));
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        let mut p = payload();
        p.cooking_time = Some(0);
        assert!(validation_message(p, true).contains("cooking_time"));

        let mut p = payload();
        p.ingredients = Some(vec![IngredientAmountInput { id: 1, amount: 0 }]);
        assert!(validation_message(p, true).contains("amount"));
    }

    #[test]
    fn rejects_duplicate_ingredients() {
        let mut p = payload();
        p.ingredients = Some(vec![
            IngredientAmountInput { id: 7, amount: 1 },
            IngredientAmountInput { id: 7, amount: 4 },
        ]);
        assert!(validation_message(p, true).contains("more than once"));
    }

    #[test]
    fn repeated_tags_collapse() {
        let mut p = payload();
        p.tags = Some(vec![3, 1, 3, 1]);
        assert_eq!(validate_payload(p, true).unwrap().tags, vec![3, 1]);
    }

    #[test]
    fn image_required_only_on_create() {
        let mut p = payload();
        p.image = None;
        assert!(validation_message(p.clone(), true).contains("image"));
        assert!(validate_payload(p, false).unwrap().image.is_none());
    }

    #[test]
    fn blank_name_is_missing() {
        let mut p = payload();
        p.name = Some("   ".into());
        assert!(validation_message(p, true).contains("name"));
    }

    #[test]
    fn missing_ids_reports_unknown_only() {
        assert_eq!(missing_ids(&[1, 2, 3], &[3, 1]), vec![2]);
        assert!(missing_ids(&[1], &[1]).is_empty());
    }

    #[test]
    fn only_author_or_admin_can_edit() {
        let author = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        assert!(!can_edit(stranger, Role::User, author));
        assert!(can_edit(stranger, Role::Admin, author));
        assert!(can_edit(author, Role::User, author));
    }

    // ---- Against a migrated database ----

    use crate::test_support;

    async fn stored_recipe(st: &AppState, author: Uuid, tags: Vec<i64>, ingredients: &[(i64, i32)]) -> i64 {
        let p = RecipePayload {
            tags: Some(tags),
            ingredients: Some(
                ingredients
                    .iter()
                    .map(|&(id, amount)| IngredientAmountInput { id, amount })
                    .collect(),
            ),
            ..payload()
        };
        create_recipe(st, author, p).await.unwrap()
    }

    async fn stored_amounts(db: &PgPool, recipe_id: i64) -> Vec<(i64, i32)> {
        repo::amounts_for(db, &[recipe_id])
            .await
            .unwrap()
            .into_iter()
            .map(|a| (a.id, a.amount))
            .collect()
    }

    async fn stored_tag_ids(db: &PgPool, recipe_id: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = repo::tags_for(db, &[recipe_id])
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    async fn row_count(db: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn ingredient_amounts_read_back_as_written(pool: PgPool) {
        let st = AppState::fake_with_db(pool);
        let author = test_support::user(&st.db, "cook").await;
        let tags = test_support::seeded_tags(&st.db).await;
        let beet = test_support::ingredient(&st.db, "Beet", "pcs").await;
        let water = test_support::ingredient(&st.db, "Water", "ml").await;

        let id = stored_recipe(&st, author, vec![tags[0]], &[(beet, 2), (water, 3)]).await;

        assert_eq!(stored_amounts(&st.db, id).await, vec![(beet, 2), (water, 3)]);
        let details = get_recipe_details(&st, Some(author), id).await.unwrap();
        assert_eq!(details.author.id, author);
        assert!(details.image.starts_with(&format!("https://fake.local/recipes/{author}/")));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn update_replaces_tag_and_ingredient_sets(pool: PgPool) {
        let st = AppState::fake_with_db(pool);
        let author = test_support::user(&st.db, "cook").await;
        let tags = test_support::seeded_tags(&st.db).await;
        let beet = test_support::ingredient(&st.db, "Beet", "pcs").await;
        let water = test_support::ingredient(&st.db, "Water", "ml").await;
        let salt = test_support::ingredient(&st.db, "Salt", "g").await;

        let id = stored_recipe(&st, author, vec![tags[0], tags[1]], &[(beet, 2), (water, 3)]).await;

        let p = RecipePayload {
            name: Some("Salted water".into()),
            image: None,
            tags: Some(vec![tags[2]]),
            ingredients: Some(vec![IngredientAmountInput { id: salt, amount: 7 }]),
            ..payload()
        };
        update_recipe(&st, author, id, p).await.unwrap();

        assert_eq!(stored_tag_ids(&st.db, id).await, vec![tags[2]]);
        assert_eq!(stored_amounts(&st.db, id).await, vec![(salt, 7)]);
        let details = get_recipe_details(&st, None, id).await.unwrap();
        assert_eq!(details.name, "Salted water");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn failed_assembly_leaves_nothing_behind(pool: PgPool) {
        let st = AppState::fake_with_db(pool);
        let author = test_support::user(&st.db, "cook").await;
        let tags = test_support::seeded_tags(&st.db).await;
        let beet = test_support::ingredient(&st.db, "Beet", "pcs").await;

        // the amount CHECK fails after the recipe and its tags were inserted
        let broken = RecipeInput {
            fields: RecipeFields {
                name: "Broken".into(),
                text: "Never stored.".into(),
                cooking_time: 5,
            },
            image: None,
            tags: vec![tags[0]],
            ingredients: vec![(beet, 0)],
        };
        assert!(persist_new(&st, author, &broken, "recipes/x.png").await.is_err());
        assert_eq!(row_count(&st.db, "recipes").await, 0);
        assert_eq!(row_count(&st.db, "recipe_tags").await, 0);
        assert_eq!(row_count(&st.db, "amount_ingredients").await, 0);

        let id = stored_recipe(&st, author, vec![tags[0]], &[(beet, 2)]).await;
        let broken = RecipeInput { tags: vec![tags[1]], ..broken };
        assert!(persist_update(&st, author, id, &broken, None).await.is_err());
        assert_eq!(stored_tag_ids(&st.db, id).await, vec![tags[0]]);
        assert_eq!(stored_amounts(&st.db, id).await, vec![(beet, 2)]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_author_or_admin_may_update(pool: PgPool) {
        let st = AppState::fake_with_db(pool);
        let author = test_support::user(&st.db, "cook").await;
        let stranger = test_support::user(&st.db, "stranger").await;
        let admin = test_support::user(&st.db, "boss").await;
        test_support::make_admin(&st.db, admin).await;
        let tags = test_support::seeded_tags(&st.db).await;
        let beet = test_support::ingredient(&st.db, "Beet", "pcs").await;
        let id = stored_recipe(&st, author, vec![tags[0]], &[(beet, 2)]).await;

        let err = update_recipe(&st, stranger, id, payload_for(tags[0], beet)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let mut p = payload_for(tags[0], beet);
        p.image = Some("data:image/png;base64,aGVsbG8=".into());
        update_recipe(&st, admin, id, p).await.unwrap();
        let row = repo::get_recipe_short(&st.db, id).await.unwrap().unwrap();
        assert!(row.image.starts_with(&format!("recipes/{author}/")));
    }

    fn payload_for(tag: i64, ingredient: i64) -> RecipePayload {
        RecipePayload {
            image: None,
            tags: Some(vec![tag]),
            ingredients: Some(vec![IngredientAmountInput { id: ingredient, amount: 1 }]),
            ..payload()
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn collections_reject_repeat_add_and_missing_remove(pool: PgPool) {
        let st = AppState::fake_with_db(pool);
        let author = test_support::user(&st.db, "cook").await;
        let reader = test_support::user(&st.db, "reader").await;
        let tags = test_support::seeded_tags(&st.db).await;
        let beet = test_support::ingredient(&st.db, "Beet", "pcs").await;
        let id = stored_recipe(&st, author, vec![tags[0]], &[(beet, 2)]).await;

        for collection in [Collection::Favorites, Collection::Cart] {
            let row = toggle_membership(&st.db, collection, reader, id, true).await.unwrap();
            assert_eq!(row.id, id);
            let again = toggle_membership(&st.db, collection, reader, id, true).await;
            assert!(matches!(again, Err(AppError::Duplicate(_))));

            toggle_membership(&st.db, collection, reader, id, false).await.unwrap();
            let gone = toggle_membership(&st.db, collection, reader, id, false).await;
            assert!(matches!(gone, Err(AppError::NotFound(_))));
        }

        let missing = toggle_favorite(&st.db, reader, id + 1000, true).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        toggle_favorite(&st.db, reader, id, true).await.unwrap();
        let seen = get_recipe_details(&st, Some(reader), id).await.unwrap();
        assert!(seen.is_favorited);
        assert!(!seen.is_in_cart);
        let anonymous = get_recipe_details(&st, None, id).await.unwrap();
        assert!(!anonymous.is_favorited);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn shopping_list_sums_cart_and_reports_empty(pool: PgPool) {
        let st = AppState::fake_with_db(pool);
        let author = test_support::user(&st.db, "cook").await;
        let buyer = test_support::user(&st.db, "buyer").await;
        let tags = test_support::seeded_tags(&st.db).await;
        let salt = test_support::ingredient(&st.db, "Salt", "g").await;
        let flour = test_support::ingredient(&st.db, "Flour", "g").await;
        let saffron = test_support::ingredient(&st.db, "Saffron", "g").await;

        assert_eq!(build_shopping_list(&st.db, buyer).await.unwrap(), ShoppingList::Empty);

        // a cart whose only recipe lost its ingredient rows has nothing to buy
        let rare = stored_recipe(&st, author, vec![tags[0]], &[(saffron, 1)]).await;
        toggle_cart(&st.db, buyer, rare, true).await.unwrap();
        sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(saffron)
            .execute(&st.db)
            .await
            .unwrap();
        assert_eq!(build_shopping_list(&st.db, buyer).await.unwrap(), ShoppingList::Empty);

        let bread = stored_recipe(&st, author, vec![tags[0]], &[(salt, 5), (flour, 500)]).await;
        let soup = stored_recipe(&st, author, vec![tags[1]], &[(salt, 3)]).await;
        toggle_cart(&st.db, buyer, bread, true).await.unwrap();
        toggle_cart(&st.db, buyer, soup, true).await.unwrap();

        let ShoppingList::Items(items) = build_shopping_list(&st.db, buyer).await.unwrap() else {
            panic!("expected items");
        };
        let lines: Vec<String> = items.iter().map(|i| i.line()).collect();
        assert_eq!(lines, vec!["Salt (g) - 8", "Flour (g) - 500"]);
    }
}
