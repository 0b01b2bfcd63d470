use crate::{
    db::schema,
    model::{
        self,
        address::{BillingAddress, DeliveryAddress},
        tag::Tag,
    },
};
use diesel::{pg::Pg, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = schema::contact)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(model::user::User, foreign_key = user_id))]
pub struct Contact {
    pub id: i64,
    pub user_id: uuid::Uuid,
    pub image: Option<Vec<u8>>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub is_favorite: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::contact)]
pub struct NewContact {
    pub user_id: uuid::Uuid,
    pub image: Option<Vec<u8>>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub is_favorite: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Full replacement of a contact's editable columns.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::contact)]
#[diesel(treat_none_as_null = true)]
pub struct ContactChangeset {
    pub image: Option<Vec<u8>>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub is_favorite: bool,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A contact together with its addresses and tags, as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDetails {
    pub contact: Contact,
    pub delivery_address: Option<DeliveryAddress>,
    pub billing_address: Option<BillingAddress>,
    pub tags: Vec<Tag>,
}
