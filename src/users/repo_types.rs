use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Public profile as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}
