use crate::{db::schema, model};
use diesel::{pg::Pg, prelude::*};

/// A login session. Only the SHA-256 of the cookie value is stored.
#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = schema::user_session)]
#[diesel(check_for_backend(Pg))]
#[diesel(primary_key(token_hash))]
#[diesel(belongs_to(model::user::User, foreign_key = user_id))]
pub struct UserSession {
    pub token_hash: String,
    pub user_id: uuid::Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::user_session)]
pub struct NewUserSession {
    pub token_hash: String,
    pub user_id: uuid::Uuid,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}
