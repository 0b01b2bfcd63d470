//! Delivery and billing addresses. Each table holds at most one row per contact.

use crate::{db::schema, model};
use diesel::{pg::Pg, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = schema::delivery_address)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(model::contact::Contact, foreign_key = contact_id))]
pub struct DeliveryAddress {
    pub id: i64,
    pub contact_id: i64,
    pub country: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = schema::billing_address)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(model::contact::Contact, foreign_key = contact_id))]
pub struct BillingAddress {
    pub id: i64,
    pub contact_id: i64,
    pub country: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
}

/// Address columns shared by both address tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFields {
    pub country: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
}

impl AddressFields {
    /// Returns true when no field carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.street.is_none()
            && self.city.is_none()
            && self.postal_code.is_none()
            && self.province.is_none()
    }
}

impl From<&DeliveryAddress> for AddressFields {
    fn from(address: &DeliveryAddress) -> Self {
        Self {
            country: address.country.clone(),
            street: address.street.clone(),
            city: address.city.clone(),
            postal_code: address.postal_code.clone(),
            province: address.province.clone(),
        }
    }
}

impl From<&BillingAddress> for AddressFields {
    fn from(address: &BillingAddress) -> Self {
        Self {
            country: address.country.clone(),
            street: address.street.clone(),
            city: address.city.clone(),
            postal_code: address.postal_code.clone(),
            province: address.province.clone(),
        }
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = schema::delivery_address)]
#[diesel(treat_none_as_null = true)]
pub struct NewDeliveryAddress {
    pub contact_id: i64,
    pub country: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
}

impl NewDeliveryAddress {
    #[must_use]
    pub fn new(contact_id: i64, fields: AddressFields) -> Self {
        Self {
            contact_id,
            country: fields.country,
            street: fields.street,
            city: fields.city,
            postal_code: fields.postal_code,
            province: fields.province,
        }
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = schema::billing_address)]
#[diesel(treat_none_as_null = true)]
pub struct NewBillingAddress {
    pub contact_id: i64,
    pub country: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
}

impl NewBillingAddress {
    #[must_use]
    pub fn new(contact_id: i64, fields: AddressFields) -> Self {
        Self {
            contact_id,
            country: fields.country,
            street: fields.street,
            city: fields.city,
            postal_code: fields.postal_code,
            province: fields.province,
        }
    }
}
