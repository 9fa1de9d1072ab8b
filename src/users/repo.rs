use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::Profile;

// $1 is the viewer. A NULL viewer is never subscribed.
const PROFILE_COLUMNS: &str = r#"
    u.id, u.email, u.username, u.first_name, u.last_name,
    EXISTS (SELECT 1 FROM subscriptions s
             WHERE s.user_id = $1::uuid AND s.author_id = u.id) AS is_subscribed
"#;

pub async fn get_profile(db: &PgPool, viewer: Option<Uuid>, id: Uuid) -> sqlx::Result<Option<Profile>> {
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = $2"
    ))
    .bind(viewer)
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn profiles_by_ids(
    db: &PgPool,
    viewer: Option<Uuid>,
    ids: &[Uuid],
) -> sqlx::Result<Vec<Profile>> {
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = ANY($2)"
    ))
    .bind(viewer)
    .bind(ids)
    .fetch_all(db)
    .await
}

/// `search` is a lower-cased LIKE pattern matched against username and email.
pub async fn list_profiles(
    db: &PgPool,
    viewer: Option<Uuid>,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Profile>> {
    sqlx::query_as::<_, Profile>(&format!(
        r#"
        SELECT {PROFILE_COLUMNS}
          FROM users u
         WHERE $2::text IS NULL OR lower(u.username) LIKE $2 OR u.email LIKE $2
         ORDER BY u.created_at, u.id
         LIMIT $3 OFFSET $4
        "#
    ))
    .bind(viewer)
    .bind(search)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_profiles(db: &PgPool, search: Option<&str>) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
          FROM users u
         WHERE $1::text IS NULL OR lower(u.username) LIKE $1 OR u.email LIKE $1
        "#,
    )
    .bind(search)
    .fetch_one(db)
    .await
}

pub async fn user_exists(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(db)
        .await
}

pub async fn subscription_exists(db: &PgPool, user_id: Uuid, author_id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE user_id = $1 AND author_id = $2)",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(db)
    .await
}

pub async fn insert_subscription(db: &PgPool, user_id: Uuid, author_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(author_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Returns the number of rows removed (0 or 1).
pub async fn delete_subscription(db: &PgPool, user_id: Uuid, author_id: Uuid) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

/// Authors followed by `user_id`, most recent subscription first.
pub async fn list_subscribed_authors(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Profile>> {
    sqlx::query_as::<_, Profile>(&format!(
        r#"
        SELECT {PROFILE_COLUMNS}
          FROM subscriptions sub
          JOIN users u ON u.id = sub.author_id
         WHERE sub.user_id = $1
         ORDER BY sub.id DESC
         LIMIT $2 OFFSET $3
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_subscriptions(db: &PgPool, user_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await
}
