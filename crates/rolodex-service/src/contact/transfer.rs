//! Contact export and import.
//!
//! The file format is a JSON array of contact objects with camelCase keys and
//! a base64 `image`. Ids and tags are left out: an import always creates new
//! contacts and never re-links tags. PascalCase keys are accepted on import
//! for files written by older exports.

use chrono::{DateTime, Utc};
use diesel_async::scoped_futures::ScopedFutureExt;
use serde::{Deserialize, Serialize};

use rolodex_core::constants::MAX_CONTACT_COUNT;
use rolodex_db::db::connection::DbConnection;
use rolodex_db::db::query::{contact, user as account};
use rolodex_db::db::transaction::with_transaction;
use rolodex_db::model::address::AddressFields;
use rolodex_db::model::contact::ContactDetails;

use super::{
    CONTACT_LIMIT_REACHED, CONTACT_NOT_FOUND, CONTACTS_NOT_FOUND, ContactInput, write_addresses,
};
use crate::auth::AuthenticatedUser;
use crate::error::{ServiceError, ServiceResult, ValidationErrors};

pub const SINGLE_EXPORT_FILE_NAME: &str = "contact-export.json";
pub const BULK_EXPORT_FILE_NAME: &str = "contacts-export.json";

const NO_FILE: &str = "No file was uploaded.";
const NO_CONTACTS_IN_FILE: &str = "The file does not contain any contacts.";
const MALFORMED_FILE: &str = "The file is not a valid contacts export.";

mod base64_image {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    #[expect(clippy::ref_option, reason = "serde `with` passes a reference to the field")]
    pub fn serialize<S: Serializer>(image: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match image {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let Some(encoded) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        STANDARD
            .decode(encoded.as_bytes())
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedAddress {
    #[serde(default, alias = "Country")]
    pub country: Option<String>,
    #[serde(default, alias = "Street")]
    pub street: Option<String>,
    #[serde(default, alias = "City")]
    pub city: Option<String>,
    #[serde(default, alias = "PostalCode")]
    pub postal_code: Option<String>,
    #[serde(default, alias = "Province")]
    pub province: Option<String>,
}

impl From<AddressFields> for ExportedAddress {
    fn from(fields: AddressFields) -> Self {
        Self {
            country: fields.country,
            street: fields.street,
            city: fields.city,
            postal_code: fields.postal_code,
            province: fields.province,
        }
    }
}

impl From<ExportedAddress> for AddressFields {
    fn from(address: ExportedAddress) -> Self {
        Self {
            country: address.country,
            street: address.street,
            city: address.city,
            postal_code: address.postal_code,
            province: address.province,
        }
    }
}

/// One element of an export file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedContact {
    #[serde(default, alias = "Image", with = "base64_image")]
    pub image: Option<Vec<u8>>,
    #[serde(default, alias = "FirstName")]
    pub first_name: String,
    #[serde(default, alias = "LastName")]
    pub last_name: Option<String>,
    #[serde(default, alias = "PhoneNumber")]
    pub phone_number: Option<String>,
    #[serde(default, alias = "Email")]
    pub email: Option<String>,
    #[serde(default, alias = "Website")]
    pub website: Option<String>,
    #[serde(default, alias = "Notes")]
    pub notes: Option<String>,
    #[serde(default, alias = "IsFavorite")]
    pub is_favorite: bool,
    #[serde(default, alias = "CreatedAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "UpdatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "DeliveryAddress")]
    pub delivery_address: Option<ExportedAddress>,
    #[serde(default, alias = "BillingAddress")]
    pub billing_address: Option<ExportedAddress>,
}

impl From<ContactDetails> for ExportedContact {
    fn from(details: ContactDetails) -> Self {
        let contact = details.contact;
        Self {
            image: contact.image,
            first_name: contact.first_name,
            last_name: contact.last_name,
            phone_number: contact.phone_number,
            email: contact.email,
            website: contact.website,
            notes: contact.notes,
            is_favorite: contact.is_favorite,
            created_at: Some(contact.created_at),
            updated_at: contact.updated_at,
            delivery_address: details
                .delivery_address
                .as_ref()
                .map(|address| AddressFields::from(address).into()),
            billing_address: details
                .billing_address
                .as_ref()
                .map(|address| AddressFields::from(address).into()),
        }
    }
}

impl ExportedContact {
    fn into_input(self) -> (ContactInput, Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let input = ContactInput {
            image: self.image,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            email: self.email,
            website: self.website,
            notes: self.notes,
            is_favorite: self.is_favorite,
            delivery_address: self.delivery_address.map(Into::into),
            billing_address: self.billing_address.map(Into::into),
            tag_ids: Vec::new(),
        };
        (input, self.created_at, self.updated_at)
    }
}

/// A rendered export, ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: &'static str,
    pub content: Vec<u8>,
}

fn render(file_name: &'static str, contacts: Vec<ContactDetails>) -> ServiceResult<ExportFile> {
    let exported: Vec<ExportedContact> = contacts.into_iter().map(Into::into).collect();
    let content = serde_json::to_vec_pretty(&exported)
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Failed to render export: {e}")))?;
    Ok(ExportFile { file_name, content })
}

/// ## Summary
/// Exports one of the caller's contacts as a one-element file.
///
/// ## Errors
/// Returns `NotFound` when the contact does not exist or belongs to someone
/// else.
#[tracing::instrument(skip(conn, user), fields(user_id = %user.id))]
pub async fn export_contact(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    id: i64,
) -> ServiceResult<ExportFile> {
    let contacts = contact::list_for_user(conn, user.id, Some(std::slice::from_ref(&id))).await?;
    if contacts.is_empty() {
        return Err(ServiceError::NotFound(CONTACT_NOT_FOUND.to_string()));
    }
    let details = contact::load_details(conn, contacts).await?;
    render(SINGLE_EXPORT_FILE_NAME, details)
}

/// ## Summary
/// Exports the listed contacts of the caller, or all of them when `ids` is
/// `None` or empty. Ids of other users' contacts are skipped.
///
/// ## Errors
/// Returns `NotFound` when nothing is left to export.
#[tracing::instrument(skip(conn, user, ids), fields(
    user_id = %user.id,
    id_count = ids.map_or(0, <[i64]>::len)
))]
pub async fn export_contacts(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    ids: Option<&[i64]>,
) -> ServiceResult<ExportFile> {
    let ids = ids.filter(|ids| !ids.is_empty());
    let contacts = contact::list_for_user(conn, user.id, ids).await?;
    if contacts.is_empty() {
        return Err(ServiceError::NotFound(CONTACTS_NOT_FOUND.to_string()));
    }

    let details = contact::load_details(conn, contacts).await?;
    tracing::info!(count = details.len(), "Contacts exported");
    render(BULK_EXPORT_FILE_NAME, details)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportDocument {
    Many(Vec<ExportedContact>),
    One(Box<ExportedContact>),
}

/// ## Summary
/// Parses an uploaded export file.
///
/// A bare object is accepted as a one-element file.
///
/// ## Errors
/// Returns `InvalidRequest` when the file is empty, is not an export, or
/// holds no contacts.
pub fn parse_import(content: &[u8]) -> ServiceResult<Vec<ExportedContact>> {
    if content.iter().all(u8::is_ascii_whitespace) {
        return Err(ServiceError::InvalidRequest(NO_FILE.to_string()));
    }

    let document: ImportDocument = serde_json::from_slice(content).map_err(|e| {
        tracing::debug!(error = %e, "Rejected import file");
        ServiceError::InvalidRequest(MALFORMED_FILE.to_string())
    })?;

    let contacts = match document {
        ImportDocument::Many(contacts) => contacts,
        ImportDocument::One(contact) => vec![*contact],
    };

    if contacts.is_empty() {
        return Err(ServiceError::InvalidRequest(NO_CONTACTS_IN_FILE.to_string()));
    }
    Ok(contacts)
}

/// ## Summary
/// Imports an export file as new contacts of the caller.
///
/// Every element becomes a fresh contact; nothing is matched against existing
/// contacts, so importing a file twice duplicates it. `createdAt` and
/// `updatedAt` are kept when present.
///
/// ## Side Effects
/// - Inserts all contacts and their addresses in one transaction; any failure
///   leaves the store untouched
///
/// ## Errors
/// Returns an error if:
/// - the file cannot be parsed (see [`parse_import`])
/// - any element fails validation (field names are prefixed with `[index].`)
/// - the import would take the caller past the contact limit
/// - database operations fail
#[tracing::instrument(skip(conn, user, content), fields(user_id = %user.id, size = content.len()))]
pub async fn import_contacts(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    content: &[u8],
) -> ServiceResult<Vec<ContactDetails>> {
    let parsed = parse_import(content)?;

    let mut errors = ValidationErrors::default();
    let rows: Vec<_> = parsed
        .into_iter()
        .enumerate()
        .map(|(index, exported)| {
            let (input, created_at, updated_at) = exported.into_input();
            let input = input.normalize_into(&mut errors, &format!("[{index}]."));
            (input, created_at, updated_at)
        })
        .collect();
    errors.into_result()?;

    let user_id = user.id;
    let incoming = i64::try_from(rows.len()).unwrap_or(i64::MAX);

    let inserted = with_transaction(conn, move |tx| {
        async move {
            account::lock_for_update(tx, user_id).await?;
            let existing = contact::count_for_user(tx, user_id).await?;
            if existing.saturating_add(incoming) > MAX_CONTACT_COUNT {
                tracing::debug!(existing, incoming, "Import would exceed contact limit");
                return Err(ServiceError::CapacityExceeded(
                    CONTACT_LIMIT_REACHED.to_string(),
                ));
            }

            let now = Utc::now();
            let mut inserted = Vec::with_capacity(rows.len());
            for (input, created_at, updated_at) in rows {
                let new_contact =
                    input.new_contact(user_id, created_at.unwrap_or(now), updated_at);
                let created = contact::insert(tx, &new_contact).await?;
                write_addresses(
                    tx,
                    created.id,
                    input.delivery_address,
                    input.billing_address,
                )
                .await?;
                inserted.push(created);
            }
            Ok::<_, ServiceError>(inserted)
        }
        .scope_boxed()
    })
    .await?;

    tracing::info!(count = inserted.len(), "Contacts imported");

    Ok(contact::load_details(conn, inserted).await?)
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
