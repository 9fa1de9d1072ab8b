//! Row fixtures for `#[sqlx::test]` suites.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

pub async fn user(db: &PgPool, username: &str) -> Uuid {
    let email = format!("{username}@example.com");
    User::create(
        db,
        NewUser {
            email: &email,
            username,
            first_name: "Test",
            last_name: "User",
            password_hash: "not-a-real-hash",
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn make_admin(db: &PgPool, id: Uuid) {
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .unwrap();
}

pub async fn ingredient(db: &PgPool, name: &str, unit: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(unit)
    .fetch_one(db)
    .await
    .unwrap()
}

/// Ids of the tags seeded by the migrations, in slug order.
pub async fn seeded_tags(db: &PgPool) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM tags ORDER BY slug")
        .fetch_all(db)
        .await
        .unwrap()
}
