use crate::{db::schema, model};
use diesel::{pg::Pg, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = schema::tag)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(model::user::User, foreign_key = user_id))]
pub struct Tag {
    pub id: i64,
    pub user_id: uuid::Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::tag)]
pub struct NewTag {
    pub user_id: uuid::Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Identifiable, Queryable, Selectable, Associations, Insertable)]
#[diesel(table_name = schema::contact_tag)]
#[diesel(check_for_backend(Pg))]
#[diesel(primary_key(contact_id, tag_id))]
#[diesel(belongs_to(model::contact::Contact, foreign_key = contact_id))]
#[diesel(belongs_to(model::tag::Tag, foreign_key = tag_id))]
pub struct ContactTag {
    pub contact_id: i64,
    pub tag_id: i64,
}
