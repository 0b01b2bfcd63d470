use crate::db::schema;
use diesel::{pg::Pg, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable)]
#[diesel(table_name = schema::app_user)]
#[diesel(check_for_backend(Pg))]
pub struct User {
    pub id: uuid::Uuid,
    pub user_name: String,
    pub email: String,
    pub email_confirmed: bool,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<Vec<u8>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::app_user)]
pub struct NewUser {
    pub id: uuid::Uuid,
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Profile fields editable through the account endpoint.
///
/// `None` leaves a column untouched; `image: Some(None)` clears the image.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = schema::app_user)]
pub struct UserProfileChangeset {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
    pub image: Option<Option<Vec<u8>>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}
