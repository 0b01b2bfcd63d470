//! JSON shapes of the contacts endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rolodex_db::db::query::contact_list::ContactPage;
use rolodex_db::model::address::AddressFields;
use rolodex_db::model::contact::ContactDetails;
use rolodex_service::contact::ContactInput;

use crate::app::api::support::{decode_image, encode_image};
use crate::app::api::tags::TagResponse;
use crate::error::AppResult;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressBody {
    pub country: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
}

impl From<AddressBody> for AddressFields {
    fn from(body: AddressBody) -> Self {
        Self {
            country: body.country,
            street: body.street,
            city: body.city,
            postal_code: body.postal_code,
            province: body.province,
        }
    }
}

/// Body of `POST /contacts` and `PUT /contacts/{id}`. `id` is only read on
/// edit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactRequest {
    pub id: i64,
    /// Base64.
    pub image: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub is_favorite: bool,
    pub delivery_address: Option<AddressBody>,
    pub billing_address: Option<AddressBody>,
    pub tag_ids: Vec<i64>,
}

impl ContactRequest {
    /// ## Summary
    /// Decodes the image and hands the rest to the contact store.
    ///
    /// ## Errors
    /// Returns a validation error when the image is not base64.
    pub fn into_input(self) -> AppResult<ContactInput> {
        Ok(ContactInput {
            image: decode_image(self.image)?,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            email: self.email,
            website: self.website,
            notes: self.notes,
            is_favorite: self.is_favorite,
            delivery_address: self.delivery_address.map(Into::into),
            billing_address: self.billing_address.map(Into::into),
            tag_ids: self.tag_ids,
        })
    }
}

/// Body of `PUT /contacts/tags`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactTagsRequest {
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressResponse {
    pub id: i64,
    pub country: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub id: i64,
    pub image: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub delivery_address: Option<AddressResponse>,
    pub billing_address: Option<AddressResponse>,
    pub tags: Vec<TagResponse>,
}

impl From<ContactDetails> for ContactResponse {
    fn from(details: ContactDetails) -> Self {
        let contact = details.contact;
        Self {
            id: contact.id,
            image: encode_image(contact.image.as_deref()),
            first_name: contact.first_name,
            last_name: contact.last_name,
            phone_number: contact.phone_number,
            email: contact.email,
            website: contact.website,
            notes: contact.notes,
            is_favorite: contact.is_favorite,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
            delivery_address: details.delivery_address.map(|a| AddressResponse {
                id: a.id,
                country: a.country,
                street: a.street,
                city: a.city,
                postal_code: a.postal_code,
                province: a.province,
            }),
            billing_address: details.billing_address.map(|a| AddressResponse {
                id: a.id,
                country: a.country,
                street: a.street,
                city: a.city,
                postal_code: a.postal_code,
                province: a.province,
            }),
            tags: details.tags.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPageResponse {
    pub data: Vec<ContactResponse>,
    pub total: i64,
    pub starting_index: i64,
    pub limit: i64,
}

impl From<ContactPage> for ContactPageResponse {
    fn from(page: ContactPage) -> Self {
        Self {
            data: page.data.into_iter().map(Into::into).collect(),
            total: page.total,
            starting_index: page.starting_index,
            limit: page.limit,
        }
    }
}
